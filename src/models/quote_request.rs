//! Quote request model
//!
//! Contact and quotation submissions from prospective buyers.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Kind of submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
    #[default]
    Contact,
    Quote,
}

impl QuoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteKind::Contact => "contact",
            QuoteKind::Quote => "quote",
        }
    }

    /// Lenient read of the stored column
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Strict parse for user input; unknown kinds are rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "contact" => Some(QuoteKind::Contact),
            "quote" => Some(QuoteKind::Quote),
            _ => None,
        }
    }
}

/// Handling status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    New,
    InProgress,
    Answered,
    Closed,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::New => "new",
            QuoteStatus::InProgress => "in_progress",
            QuoteStatus::Answered => "answered",
            QuoteStatus::Closed => "closed",
        }
    }

    /// Strict parse; unknown statuses are rejected rather than defaulted
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(QuoteStatus::New),
            "in_progress" | "in-progress" => Some(QuoteStatus::InProgress),
            "answered" => Some(QuoteStatus::Answered),
            "closed" => Some(QuoteStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: i64,
    pub kind: QuoteKind,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub product_id: Option<i64>,
    pub measure_id: Option<i64>,
    pub quantity: Option<f64>,
    pub message: String,
    pub estimated_total: Option<f64>,
    pub status: QuoteStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for a new submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequestCreate {
    #[serde(default)]
    pub kind: QuoteKind,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub product_id: Option<i64>,
    pub measure_id: Option<i64>,
    pub quantity: Option<f64>,
    pub message: String,
}

impl QuoteRequest {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            kind: QuoteKind::from_str(row.get::<_, String>("kind")?.as_str()),
            name: row.get("name")?,
            email: row.get("email")?,
            company: row.get("company")?,
            phone: row.get("phone")?,
            country: row.get("country")?,
            product_id: row.get("product_id")?,
            measure_id: row.get("measure_id")?,
            quantity: row.get("quantity")?,
            message: row.get("message")?,
            estimated_total: row.get("estimated_total")?,
            status: QuoteStatus::parse(row.get::<_, String>("status")?.as_str()).unwrap_or_default(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a submission with its precomputed estimate
    pub fn create(conn: &Connection, data: &QuoteRequestCreate, estimated_total: Option<f64>) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO quote_requests (
                kind, name, email, company, phone, country,
                product_id, measure_id, quantity, message, estimated_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                data.kind.as_str(),
                data.name,
                data.email,
                data.company,
                data.phone,
                data.country,
                data.product_id,
                data.measure_id,
                data.quantity,
                data.message,
                estimated_total,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM quote_requests WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Newest first, optionally filtered by status
    pub fn list(conn: &Connection, status: Option<QuoteStatus>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM quote_requests
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let requests = stmt
            .query_map(params![status.map(|s| s.as_str()), limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    pub fn count(conn: &Connection, status: Option<QuoteStatus>) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM quote_requests WHERE (?1 IS NULL OR status = ?1)",
            params![status.map(|s| s.as_str())],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn set_status(conn: &Connection, id: i64, status: QuoteStatus) -> DbResult<Option<Self>> {
        let rows = conn.execute(
            "UPDATE quote_requests SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Self::get_by_id(conn, id)
    }

    /// Returns Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM quote_requests WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(QuoteStatus::parse("in_progress"), Some(QuoteStatus::InProgress));
        assert_eq!(QuoteStatus::parse(" Answered "), Some(QuoteStatus::Answered));
        assert_eq!(QuoteStatus::parse("archived"), None);
    }

    #[test]
    fn test_kind_round_trips_through_db_string() {
        assert_eq!(QuoteKind::from_str(QuoteKind::Quote.as_str()), QuoteKind::Quote);
        assert_eq!(QuoteKind::from_str("anything"), QuoteKind::Contact);
    }

    #[test]
    fn test_kind_parse_is_strict() {
        assert_eq!(QuoteKind::parse(" Quote "), Some(QuoteKind::Quote));
        assert_eq!(QuoteKind::parse("contact"), Some(QuoteKind::Contact));
        assert_eq!(QuoteKind::parse("quotation"), None);
        assert_eq!(QuoteKind::parse(""), None);
    }
}
