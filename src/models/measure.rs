//! Measure models
//!
//! Units of measure and the families that group them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A family of mutually convertible measures (weight, volume, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureFamily {
    pub id: i64,
    pub name: String,
    pub base_unit: String,
    pub created_at: String,
}

impl MeasureFamily {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            base_unit: row.get("base_unit")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn create(conn: &Connection, name: &str, base_unit: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO measure_families (name, base_unit) VALUES (?1, ?2)",
            params![name, base_unit],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM measure_families WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(family) => Ok(Some(family)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM measure_families WHERE name = ?1")?;
        match stmt.query_row([name], Self::from_row) {
            Ok(family) => Ok(Some(family)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM measure_families ORDER BY name ASC")?;
        let families = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(families)
    }
}

/// A unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub symbol: String,
    pub family_id: i64,
    /// Multiplier to the family's base unit (always > 0)
    pub factor_to_base: f64,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new measure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureCreate {
    pub name: String,
    pub short_name: String,
    pub symbol: String,
    pub family_id: i64,
    pub factor_to_base: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

fn default_active() -> bool {
    true
}

/// Data for updating a measure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasureUpdate {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub symbol: Option<String>,
    pub factor_to_base: Option<f64>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

impl Measure {
    /// Create a Measure from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            short_name: row.get("short_name")?,
            symbol: row.get("symbol")?,
            family_id: row.get("family_id")?,
            factor_to_base: row.get("factor_to_base")?,
            is_active: row.get::<_, i32>("is_active")? != 0,
            sort_order: row.get("sort_order")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new measure
    pub fn create(conn: &Connection, data: &MeasureCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO measures (name, short_name, symbol, family_id, factor_to_base, is_active, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.name,
                data.short_name,
                data.symbol,
                data.family_id,
                data.factor_to_base,
                data.is_active as i32,
                data.sort_order,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a measure by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM measures WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(measure) => Ok(Some(measure)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Family id of a measure, if the measure exists
    pub fn family_of(conn: &Connection, id: i64) -> DbResult<Option<i64>> {
        let result = conn.query_row(
            "SELECT family_id FROM measures WHERE id = ?1",
            [id],
            |row| row.get(0),
        );
        match result {
            Ok(family_id) => Ok(Some(family_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All measures of a family, ordered by sort order then id
    pub fn list_for_family(conn: &Connection, family_id: i64, active_only: bool) -> DbResult<Vec<Self>> {
        let sql = if active_only {
            "SELECT * FROM measures WHERE family_id = ?1 AND is_active = 1 ORDER BY sort_order ASC, id ASC"
        } else {
            "SELECT * FROM measures WHERE family_id = ?1 ORDER BY sort_order ASC, id ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let measures = stmt
            .query_map([family_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(measures)
    }

    /// List measures, optionally restricted to active ones
    pub fn list(conn: &Connection, active_only: bool) -> DbResult<Vec<Self>> {
        let sql = if active_only {
            "SELECT * FROM measures WHERE is_active = 1 ORDER BY family_id ASC, sort_order ASC, id ASC"
        } else {
            "SELECT * FROM measures ORDER BY family_id ASC, sort_order ASC, id ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let measures = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(measures)
    }

    /// Update a measure
    pub fn update(conn: &Connection, id: i64, data: &MeasureUpdate) -> DbResult<Option<Self>> {
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
        add_update!(short_name, "short_name");
        add_update!(symbol, "symbol");
        add_update!(factor_to_base, "factor_to_base");
        add_update!(sort_order, "sort_order");

        if let Some(active) = data.is_active {
            updates.push(format!("is_active = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(active as i32));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE measures SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Number of products using this measure as their default
    pub fn default_for_product_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE default_measure_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn measure(family_id: i64, short: &str, factor: f64, sort_order: i64) -> MeasureCreate {
        MeasureCreate {
            name: short.to_uppercase(),
            short_name: short.to_string(),
            symbol: short.to_string(),
            family_id,
            factor_to_base: factor,
            is_active: true,
            sort_order,
        }
    }

    #[test]
    fn test_list_for_family_orders_by_sort_order() {
        let conn = setup();
        let weight = MeasureFamily::create(&conn, "weight", "g").unwrap();
        let volume = MeasureFamily::create(&conn, "volume", "ml").unwrap();

        let lb = Measure::create(&conn, &measure(weight.id, "lb", 453.592, 3)).unwrap();
        let kg = Measure::create(&conn, &measure(weight.id, "kg", 1000.0, 1)).unwrap();
        Measure::create(&conn, &measure(volume.id, "l", 1000.0, 0)).unwrap();

        let listed = Measure::list_for_family(&conn, weight.id, false).unwrap();
        let ids: Vec<i64> = listed.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![kg.id, lb.id]);
    }

    #[test]
    fn test_update_deactivates_measure() {
        let conn = setup();
        let weight = MeasureFamily::create(&conn, "weight", "g").unwrap();
        let kg = Measure::create(&conn, &measure(weight.id, "kg", 1000.0, 1)).unwrap();

        let update = MeasureUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = Measure::update(&conn, kg.id, &update).unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(Measure::list_for_family(&conn, weight.id, true).unwrap().is_empty());
    }

    #[test]
    fn test_non_positive_factor_rejected() {
        let conn = setup();
        let weight = MeasureFamily::create(&conn, "weight", "g").unwrap();
        assert!(Measure::create(&conn, &measure(weight.id, "zero", 0.0, 0)).is_err());
    }

    #[test]
    fn test_family_of_unknown_measure() {
        let conn = setup();
        assert_eq!(Measure::family_of(&conn, 404).unwrap(), None);
    }
}
