//! Product model
//!
//! Catalog products. A product's default measure decides which family of
//! units it can be priced in.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub default_measure_id: Option<i64>,
    pub description: Option<String>,
    pub origin_country: Option<String>,
    pub hs_code: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub default_measure_id: Option<i64>,
    pub description: Option<String>,
    pub origin_country: Option<String>,
    pub hs_code: Option<String>,
}

/// Data for updating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    pub default_measure_id: Option<i64>,
    pub description: Option<String>,
    pub origin_country: Option<String>,
    pub hs_code: Option<String>,
    pub is_active: Option<bool>,
}

impl Product {
    /// Create a Product from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            category_id: row.get("category_id")?,
            default_measure_id: row.get("default_measure_id")?,
            description: row.get("description")?,
            origin_country: row.get("origin_country")?,
            hs_code: row.get("hs_code")?,
            is_active: row.get::<_, i32>("is_active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new product
    pub fn create(conn: &Connection, data: &ProductCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO products (
                name, slug, category_id, default_measure_id, description, origin_country, hs_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.name,
                data.slug,
                data.category_id,
                data.default_measure_id,
                data.description,
                data.origin_country,
                data.hs_code,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a product by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a product by its URL slug
    pub fn get_by_slug(conn: &Connection, slug: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products WHERE slug = ?1")?;
        match stmt.query_row([slug], Self::from_row) {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Default measure id of a product.
    ///
    /// Outer `None` means the product does not exist; inner `None` means it
    /// has no default measure.
    pub fn default_measure_of(conn: &Connection, id: i64) -> DbResult<Option<Option<i64>>> {
        let result = conn.query_row(
            "SELECT default_measure_id FROM products WHERE id = ?1",
            [id],
            |row| row.get::<_, Option<i64>>(0),
        );
        match result {
            Ok(measure) => Ok(Some(measure)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Search products by name or slug
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let search_pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM products
            WHERE name LIKE ?1 OR slug LIKE ?1
            ORDER BY name ASC
            LIMIT ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![search_pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List products with optional category filter and pagination
    pub fn list(
        conn: &Connection,
        category_id: Option<i64>,
        active_only: bool,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let active_clause = if active_only { "AND is_active = 1" } else { "" };
        let sql = format!(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR category_id = ?1) {}
            ORDER BY name ASC
            LIMIT ?2 OFFSET ?3
            "#,
            active_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![category_id, limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Count products matching the list filters
    pub fn count(conn: &Connection, category_id: Option<i64>, active_only: bool) -> DbResult<i64> {
        let active_clause = if active_only { "AND is_active = 1" } else { "" };
        let sql = format!(
            "SELECT COUNT(*) FROM products WHERE (?1 IS NULL OR category_id = ?1) {}",
            active_clause
        );
        let count: i64 = conn.query_row(&sql, params![category_id], |row| row.get(0))?;
        Ok(count)
    }

    /// Update a product
    pub fn update(conn: &Connection, id: i64, data: &ProductUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name, "name");
        add_update!(slug, "slug");
        add_update!(category_id, "category_id");
        add_update!(default_measure_id, "default_measure_id");
        add_update!(description, "description");
        add_update!(origin_country, "origin_country");
        add_update!(hs_code, "hs_code");

        if let Some(active) = data.is_active {
            updates.push(format!("is_active = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(active as i32));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE products SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Number of quote requests referencing this product
    pub fn quote_request_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM quote_requests WHERE product_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a product; its prices go with it.
    /// Returns Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
