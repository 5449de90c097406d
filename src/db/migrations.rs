//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
        tracing::info!("Applied schema migration v2");
    }

    Ok(())
}

/// Migration v1: catalog and pricing schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- MEASURE FAMILIES
        -- Groups of mutually convertible units
        -- ============================================
        CREATE TABLE measure_families (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,           -- "weight", "volume", "count"
            base_unit TEXT NOT NULL,             -- "g", "ml", "each"
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- MEASURES
        -- Units of measure, each in exactly one family
        -- ============================================
        CREATE TABLE measures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            symbol TEXT NOT NULL,
            family_id INTEGER NOT NULL REFERENCES measure_families(id) ON DELETE RESTRICT,
            factor_to_base REAL NOT NULL CHECK(factor_to_base > 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_measures_family ON measures(family_id);
        CREATE UNIQUE INDEX idx_measures_family_short ON measures(family_id, short_name);

        -- ============================================
        -- CATEGORIES
        -- ============================================
        CREATE TABLE categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- PRODUCTS
        -- ============================================
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            category_id INTEGER REFERENCES categories(id) ON DELETE RESTRICT,
            default_measure_id INTEGER REFERENCES measures(id) ON DELETE SET NULL,
            description TEXT,
            origin_country TEXT,
            hs_code TEXT,                        -- customs tariff code
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_products_category ON products(category_id);
        CREATE INDEX idx_products_name ON products(name);

        -- ============================================
        -- PRODUCT PRICES
        -- One price per (product, measure)
        -- ============================================
        CREATE TABLE product_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            measure_id INTEGER NOT NULL REFERENCES measures(id) ON DELETE RESTRICT,
            price REAL NOT NULL CHECK(price >= 0),
            currency TEXT NOT NULL DEFAULT 'USD',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(product_id, measure_id)
        );

        CREATE INDEX idx_product_prices_product ON product_prices(product_id);

        -- ============================================
        -- MEASURE COMPATIBILITY
        -- price_in_to = price_in_from / factor
        -- ============================================
        CREATE TABLE measure_compatibility (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_measure_id INTEGER NOT NULL REFERENCES measures(id) ON DELETE CASCADE,
            to_measure_id INTEGER NOT NULL REFERENCES measures(id) ON DELETE CASCADE,
            factor REAL NOT NULL CHECK(factor > 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(from_measure_id, to_measure_id),
            CHECK(from_measure_id <> to_measure_id)
        );

        CREATE INDEX idx_measure_compat_to ON measure_compatibility(to_measure_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: contact and quote submissions
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE quote_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK(kind IN ('contact', 'quote')),
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            company TEXT,
            phone TEXT,
            country TEXT,
            product_id INTEGER REFERENCES products(id) ON DELETE RESTRICT,
            measure_id INTEGER REFERENCES measures(id) ON DELETE RESTRICT,
            quantity REAL CHECK(quantity IS NULL OR quantity >= 0),
            message TEXT NOT NULL,
            estimated_total REAL,                -- resolver total at submission time
            status TEXT NOT NULL DEFAULT 'new'
                CHECK(status IN ('new', 'in_progress', 'answered', 'closed')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_quote_requests_status ON quote_requests(status);
        CREATE INDEX idx_quote_requests_email ON quote_requests(email);
        CREATE INDEX idx_quote_requests_product ON quote_requests(product_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_fresh_database_needs_migration() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT)",
            [],
        )
        .unwrap();
        assert!(needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_duplicate_price_rows_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO measure_families (id, name, base_unit) VALUES (1, 'weight', 'g');
             INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base)
                 VALUES (1, 'Kilogram', 'kg', 'kg', 1, 1000.0);
             INSERT INTO products (id, name, slug, default_measure_id) VALUES (1, 'Rice', 'rice', 1);
             INSERT INTO product_prices (product_id, measure_id, price) VALUES (1, 1, 2.5);",
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO product_prices (product_id, measure_id, price) VALUES (1, 1, 3.0)",
            [],
        );
        assert!(dup.is_err());
    }
}
