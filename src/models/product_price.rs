//! Product price model
//!
//! One price per (product, measure) pair, enforced by the schema.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub id: i64,
    pub product_id: i64,
    pub measure_id: i64,
    pub price: f64,
    pub currency: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for setting a product price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPriceSet {
    pub product_id: i64,
    pub measure_id: i64,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl ProductPrice {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            product_id: row.get("product_id")?,
            measure_id: row.get("measure_id")?,
            price: row.get("price")?,
            currency: row.get("currency")?,
            is_active: row.get::<_, i32>("is_active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert or replace the price for a (product, measure) pair.
    /// Re-setting a price reactivates the row.
    pub fn upsert(conn: &Connection, data: &ProductPriceSet) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO product_prices (product_id, measure_id, price, currency)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(product_id, measure_id) DO UPDATE SET
                price = excluded.price,
                currency = excluded.currency,
                is_active = 1,
                updated_at = datetime('now')
            "#,
            params![data.product_id, data.measure_id, data.price, data.currency],
        )?;

        Self::get(conn, data.product_id, data.measure_id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get the row for a pair regardless of its active flag
    pub fn get(conn: &Connection, product_id: i64, measure_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_prices WHERE product_id = ?1 AND measure_id = ?2",
        )?;
        match stmt.query_row([product_id, measure_id], Self::from_row) {
            Ok(price) => Ok(Some(price)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Active price row for an exact pair
    pub fn get_active(conn: &Connection, product_id: i64, measure_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_prices WHERE product_id = ?1 AND measure_id = ?2 AND is_active = 1",
        )?;
        match stmt.query_row([product_id, measure_id], Self::from_row) {
            Ok(price) => Ok(Some(price)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All active prices for a product in insertion order
    pub fn list_active_for_product(conn: &Connection, product_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_prices WHERE product_id = ?1 AND is_active = 1 ORDER BY id ASC",
        )?;
        let prices = stmt
            .query_map([product_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// All prices for a product, active or not
    pub fn list_for_product(conn: &Connection, product_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM product_prices WHERE product_id = ?1 ORDER BY id ASC",
        )?;
        let prices = stmt
            .query_map([product_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// Toggle the active flag. Returns Ok(false) if the pair has no row
    pub fn set_active(conn: &Connection, product_id: i64, measure_id: i64, active: bool) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE product_prices SET is_active = ?3, updated_at = datetime('now')
            WHERE product_id = ?1 AND measure_id = ?2
            "#,
            params![product_id, measure_id, active as i32],
        )?;
        Ok(rows > 0)
    }

    /// Returns Ok(false) if the pair has no row
    pub fn delete(conn: &Connection, product_id: i64, measure_id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM product_prices WHERE product_id = ?1 AND measure_id = ?2",
            [product_id, measure_id],
        )?;
        Ok(rows > 0)
    }
}
