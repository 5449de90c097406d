//! Measure compatibility model
//!
//! Directed conversion factors between measures:
//! `price_in_to = price_in_from / factor`.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureCompatibility {
    pub id: i64,
    pub from_measure_id: i64,
    pub to_measure_id: i64,
    pub factor: f64,
    pub created_at: String,
}

impl MeasureCompatibility {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            from_measure_id: row.get("from_measure_id")?,
            to_measure_id: row.get("to_measure_id")?,
            factor: row.get("factor")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert or replace the factor for a directed pair
    pub fn upsert(conn: &Connection, from_measure_id: i64, to_measure_id: i64, factor: f64) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO measure_compatibility (from_measure_id, to_measure_id, factor)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(from_measure_id, to_measure_id) DO UPDATE SET
                factor = excluded.factor
            "#,
            params![from_measure_id, to_measure_id, factor],
        )?;

        Self::get(conn, from_measure_id, to_measure_id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get the row for a directed pair
    pub fn get(conn: &Connection, from_measure_id: i64, to_measure_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM measure_compatibility WHERE from_measure_id = ?1 AND to_measure_id = ?2",
        )?;
        match stmt.query_row([from_measure_id, to_measure_id], Self::from_row) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Conversion factor for a directed pair
    pub fn factor(conn: &Connection, from_measure_id: i64, to_measure_id: i64) -> DbResult<Option<f64>> {
        let result = conn.query_row(
            "SELECT factor FROM measure_compatibility WHERE from_measure_id = ?1 AND to_measure_id = ?2",
            [from_measure_id, to_measure_id],
            |row| row.get(0),
        );
        match result {
            Ok(factor) => Ok(Some(factor)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a row exists in either direction
    pub fn exists_either_direction(conn: &Connection, a: i64, b: i64) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM measure_compatibility
            WHERE (from_measure_id = ?1 AND to_measure_id = ?2)
               OR (from_measure_id = ?2 AND to_measure_id = ?1)
            "#,
            [a, b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All rows touching a measure, as source or target
    pub fn list_for_measure(conn: &Connection, measure_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM measure_compatibility
            WHERE from_measure_id = ?1 OR to_measure_id = ?1
            ORDER BY from_measure_id ASC, to_measure_id ASC
            "#,
        )?;
        let rows = stmt
            .query_map([measure_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Remove a directed pair. Returns Ok(false) if it did not exist
    pub fn delete(conn: &Connection, from_measure_id: i64, to_measure_id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM measure_compatibility WHERE from_measure_id = ?1 AND to_measure_id = ?2",
            [from_measure_id, to_measure_id],
        )?;
        Ok(rows > 0)
    }
}
