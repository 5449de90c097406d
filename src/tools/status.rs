//! ExportDesk Status Tool
//!
//! Runtime status information and usage guidance for the service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Pricing and catalog instructions for AI assistants
pub const PRICING_INSTRUCTIONS: &str = r#"
# ExportDesk Pricing Instructions

## Units of measure

Every measure belongs to exactly one family (weight, volume, count). Each
measure carries a factor to its family's base unit (g, ml, each).

Run `seed_standard_measures` once on a fresh database to load kg, g, lb, oz,
t, l, ml, gal, fl oz, each, dozen and gross, with conversion rows between
all measures of the same family.

## Conversion rows

`set_measure_compatibility(from, to, factor)` means one `from` unit holds
`factor` `to` units, so:

    price_in_to = price_in_from / factor

Example: kg -> lb factor 2.2046. A product at 10.00 per kg costs
10.00 / 2.2046 = 4.536 per lb.

Pass `bidirectional: true` to write the reciprocal row as well.

## Pricing a product

1. Give the product a `default_measure_id`; `available_measures` lists the
   active measures in that measure's family.
2. Set at least one price with `set_product_price`.
3. `price_for_unit` returns the exact price if one exists for that measure,
   otherwise the first price (oldest first) that has a conversion row to the
   requested measure, converted.
4. `available: false` means there is no way to price that unit. It is not an
   error and must never be shown as a price of zero.
5. `total_price` multiplies the unit price by the quantity. A quantity of 0
   gives a total of 0 when the unit can be priced.

## Quote requests

`submit_quote_request` accepts contact messages and quotations. Quotations
need a product; with a measure and quantity they get an `estimated_total`.
Each email address can submit a limited number of requests per window.
Statuses: new -> in_progress -> answered -> closed.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,

    pub quote_limit: u32,
    pub quote_window_seconds: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    quote_limit: u32,
    quote_window_seconds: u64,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, quote_limit: u32, quote_window_seconds: u64) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            quote_limit,
            quote_window_seconds,
        }
    }

    pub fn get_status(&self) -> ServiceStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            quote_limit: self.quote_limit,
            quote_window_seconds: self.quote_window_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_missing_database() {
        let tracker = StatusTracker::new(PathBuf::from("/nonexistent/exportdesk.db"), 5, 3600);
        let status = tracker.get_status();
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.process_id, std::process::id());
        assert_eq!(status.quote_limit, 5);
    }
}
