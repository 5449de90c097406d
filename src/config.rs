//! Runtime configuration
//!
//! Everything is read from environment variables; unset or malformed values
//! fall back to defaults with a log line.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

pub const DATABASE_PATH_VAR: &str = "EXPORTDESK_DATABASE_PATH";
pub const POOL_SIZE_VAR: &str = "EXPORTDESK_POOL_SIZE";
pub const QUOTE_LIMIT_VAR: &str = "EXPORTDESK_QUOTE_LIMIT";
pub const QUOTE_WINDOW_VAR: &str = "EXPORTDESK_QUOTE_WINDOW_SECS";

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_QUOTE_LIMIT: u32 = 5;
const DEFAULT_QUOTE_WINDOW_SECS: u64 = 3600;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub pool_size: u32,
    /// Quote submissions allowed per client within one window
    pub quote_limit: u32,
    pub quote_window: Duration,
}

impl Config {
    /// Load configuration from the environment
    pub fn load() -> Self {
        let pool_size = try_load(POOL_SIZE_VAR, DEFAULT_POOL_SIZE).max(1);
        let quote_limit = try_load(QUOTE_LIMIT_VAR, DEFAULT_QUOTE_LIMIT);
        let window_secs = try_load(QUOTE_WINDOW_VAR, DEFAULT_QUOTE_WINDOW_SECS).max(1);

        Self {
            database_path: database_path(),
            pool_size,
            quote_limit,
            quote_window: Duration::from_secs(window_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: DEFAULT_POOL_SIZE,
            quote_limit: DEFAULT_QUOTE_LIMIT,
            quote_window: Duration::from_secs(DEFAULT_QUOTE_WINDOW_SECS),
        }
    }
}

/// Get the database path from environment or use `<project>/data/exportdesk.db`
pub fn database_path() -> PathBuf {
    env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_database_path())
}

fn default_database_path() -> PathBuf {
    let mut path = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("exportdesk.db");
    path
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_or_default(key, &raw, default),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_accepts_valid_value() {
        assert_eq!(parse_or_default::<u32>("X", " 12 ", 5), 12);
    }

    #[test]
    fn test_parse_or_default_falls_back() {
        assert_eq!(parse_or_default::<u32>("X", "twelve", 5), 5);
        assert_eq!(parse_or_default::<u64>("X", "-3", 60), 60);
    }

    #[test]
    fn test_default_path_ends_with_db_file() {
        let cfg = Config::default();
        assert!(cfg.database_path.ends_with("data/exportdesk.db"));
        assert_eq!(cfg.quote_limit, 5);
        assert_eq!(cfg.quote_window, Duration::from_secs(3600));
    }
}
