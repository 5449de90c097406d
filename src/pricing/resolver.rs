//! Pricing resolver
//!
//! Prices a product in any unit compatible with the units it is actually
//! priced in. Lookup order for `price_for_unit`:
//!
//! 1. an active price row for the exact (product, measure) pair;
//! 2. the first active price row of the product (ascending row id) that has
//!    a compatibility factor towards the target, converted as
//!    `price / factor`;
//! 3. otherwise unavailable.
//!
//! The connection-level functions return `DbResult` so callers can tell a
//! storage failure from a missing price. [`PricingResolver`] wraps them for
//! callers that want the fail-soft contract: storage errors are logged and
//! degrade to empty/absent/false.

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::{Database, DbError, DbResult};
use crate::models::{Measure, MeasureCompatibility, Product, ProductPrice};

/// Errors surfaced by the `try_` resolver operations
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Pricing storage failure: {0}")]
    Storage(#[from] DbError),
}

pub type PricingResult<T> = Result<T, PricingError>;

/// How a unit price was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitPrice {
    pub price: f64,
    /// Measure of the price row the value came from
    pub source_measure_id: i64,
    /// Factor applied when the price was converted, `None` for a direct hit
    pub conversion_factor: Option<f64>,
}

impl UnitPrice {
    fn direct(row: &ProductPrice) -> Self {
        Self {
            price: row.price,
            source_measure_id: row.measure_id,
            conversion_factor: None,
        }
    }

    fn converted(row: &ProductPrice, factor: f64) -> Self {
        Self {
            price: row.price / factor,
            source_measure_id: row.measure_id,
            conversion_factor: Some(factor),
        }
    }

    pub fn is_converted(&self) -> bool {
        self.conversion_factor.is_some()
    }
}

/// A priced quantity of a product
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub product_id: i64,
    pub measure_id: i64,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
    pub source_measure_id: i64,
    pub conversion_factor: Option<f64>,
}

/// Measures in the family of the product's default measure.
///
/// Only active measures are listed, ordered by sort order then id. Unknown
/// products and products without a default measure yield an empty list.
pub fn available_measures(conn: &Connection, product_id: i64) -> DbResult<Vec<Measure>> {
    let default_measure_id = match Product::default_measure_of(conn, product_id)? {
        Some(Some(id)) => id,
        Some(None) => {
            tracing::debug!(product_id, "Product has no default measure");
            return Ok(Vec::new());
        }
        None => {
            tracing::debug!(product_id, "Unknown product");
            return Ok(Vec::new());
        }
    };

    match Measure::family_of(conn, default_measure_id)? {
        Some(family_id) => Measure::list_for_family(conn, family_id, true),
        None => {
            tracing::debug!(product_id, default_measure_id, "Default measure not found");
            Ok(Vec::new())
        }
    }
}

/// Resolve the unit price of a product in a measure
pub fn unit_price(conn: &Connection, product_id: i64, measure_id: i64) -> DbResult<Option<UnitPrice>> {
    if let Some(row) = ProductPrice::get_active(conn, product_id, measure_id)? {
        return Ok(Some(UnitPrice::direct(&row)));
    }

    for row in ProductPrice::list_active_for_product(conn, product_id)? {
        if row.measure_id == measure_id {
            return Ok(Some(UnitPrice::direct(&row)));
        }
        if let Some(factor) = MeasureCompatibility::factor(conn, row.measure_id, measure_id)? {
            return Ok(Some(UnitPrice::converted(&row, factor)));
        }
    }

    tracing::debug!(product_id, measure_id, "No price available for unit");
    Ok(None)
}

/// Unit price as a bare number
pub fn price_for_unit(conn: &Connection, product_id: i64, measure_id: i64) -> DbResult<Option<f64>> {
    Ok(unit_price(conn, product_id, measure_id)?.map(|u| u.price))
}

/// Unit price times quantity; absent when the unit price is absent
pub fn total_price(conn: &Connection, product_id: i64, measure_id: i64, quantity: f64) -> DbResult<Option<f64>> {
    Ok(price_for_unit(conn, product_id, measure_id)?.map(|price| price * quantity))
}

/// Fail-soft total for callers already holding a connection: storage
/// errors are logged and read as "no estimate".
pub fn estimate_total(conn: &Connection, product_id: i64, measure_id: i64, quantity: f64) -> Option<f64> {
    total_price(conn, product_id, measure_id, quantity).unwrap_or_else(|e| {
        tracing::error!(product_id, measure_id, quantity, error = %e, "total_price failed");
        None
    })
}

/// Full quote for a quantity, including how the unit price was derived
pub fn quote(conn: &Connection, product_id: i64, measure_id: i64, quantity: f64) -> DbResult<Option<PriceQuote>> {
    Ok(unit_price(conn, product_id, measure_id)?.map(|unit| PriceQuote {
        product_id,
        measure_id,
        quantity,
        unit_price: unit.price,
        total: unit.price * quantity,
        source_measure_id: unit.source_measure_id,
        conversion_factor: unit.conversion_factor,
    }))
}

/// Whether two measures can be converted between.
///
/// True when a compatibility row exists in either direction, or when both
/// measures exist and belong to the same family.
pub fn measures_compatible(conn: &Connection, from_measure_id: i64, to_measure_id: i64) -> DbResult<bool> {
    if MeasureCompatibility::exists_either_direction(conn, from_measure_id, to_measure_id)? {
        return Ok(true);
    }

    let from_family = Measure::family_of(conn, from_measure_id)?;
    let to_family = Measure::family_of(conn, to_measure_id)?;

    Ok(matches!((from_family, to_family), (Some(a), Some(b)) if a == b))
}

/// Pool-backed resolver with the fail-soft contract.
///
/// Library API for callers that hold a [`Database`] rather than a
/// connection; the MCP tools share one connection per call and use the
/// connection-level functions instead.
///
/// Stateless apart from the pool handle; clone freely across tasks.
#[derive(Clone)]
pub struct PricingResolver {
    database: Database,
}

impl PricingResolver {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn try_available_measures(&self, product_id: i64) -> PricingResult<Vec<Measure>> {
        Ok(self.database.with_conn(|conn| available_measures(conn, product_id))?)
    }

    pub fn try_price_for_unit(&self, product_id: i64, measure_id: i64) -> PricingResult<Option<f64>> {
        Ok(self.database.with_conn(|conn| price_for_unit(conn, product_id, measure_id))?)
    }

    pub fn try_total_price(&self, product_id: i64, measure_id: i64, quantity: f64) -> PricingResult<Option<f64>> {
        Ok(self.database.with_conn(|conn| total_price(conn, product_id, measure_id, quantity))?)
    }

    pub fn try_quote(&self, product_id: i64, measure_id: i64, quantity: f64) -> PricingResult<Option<PriceQuote>> {
        Ok(self.database.with_conn(|conn| quote(conn, product_id, measure_id, quantity))?)
    }

    pub fn try_measures_compatible(&self, from_measure_id: i64, to_measure_id: i64) -> PricingResult<bool> {
        Ok(self.database.with_conn(|conn| measures_compatible(conn, from_measure_id, to_measure_id))?)
    }

    /// Measures the product can be priced in; empty on any failure
    pub fn available_measures(&self, product_id: i64) -> Vec<Measure> {
        self.try_available_measures(product_id).unwrap_or_else(|e| {
            tracing::error!(product_id, error = %e, "available_measures failed");
            Vec::new()
        })
    }

    /// Unit price; `None` when unavailable or on storage failure
    pub fn price_for_unit(&self, product_id: i64, measure_id: i64) -> Option<f64> {
        self.try_price_for_unit(product_id, measure_id).unwrap_or_else(|e| {
            tracing::error!(product_id, measure_id, error = %e, "price_for_unit failed");
            None
        })
    }

    pub fn total_price(&self, product_id: i64, measure_id: i64, quantity: f64) -> Option<f64> {
        self.try_total_price(product_id, measure_id, quantity).unwrap_or_else(|e| {
            tracing::error!(product_id, measure_id, quantity, error = %e, "total_price failed");
            None
        })
    }

    pub fn quote(&self, product_id: i64, measure_id: i64, quantity: f64) -> Option<PriceQuote> {
        self.try_quote(product_id, measure_id, quantity).unwrap_or_else(|e| {
            tracing::error!(product_id, measure_id, quantity, error = %e, "quote failed");
            None
        })
    }

    /// `false` on storage failure
    pub fn measures_compatible(&self, from_measure_id: i64, to_measure_id: i64) -> bool {
        self.try_measures_compatible(from_measure_id, to_measure_id).unwrap_or_else(|e| {
            tracing::error!(from_measure_id, to_measure_id, error = %e, "measures_compatible failed");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    const KG: i64 = 3;
    const LB: i64 = 4;
    const LITRE: i64 = 5;
    const TONNE: i64 = 6;
    const UNRELATED: i64 = 99;

    /// Product 7 priced at 10.00 per kilogram; kg -> lb factor 2.2046.
    fn seed(conn: &Connection) {
        conn.execute_batch(
            r#"
            INSERT INTO measure_families (id, name, base_unit) VALUES (1, 'weight', 'g');
            INSERT INTO measure_families (id, name, base_unit) VALUES (2, 'volume', 'ml');
            INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base, sort_order)
                VALUES (3, 'Kilogram', 'kg', 'kg', 1, 1000.0, 1);
            INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base, sort_order)
                VALUES (4, 'Pound', 'lb', 'lb', 1, 453.592, 2);
            INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base, sort_order)
                VALUES (5, 'Litre', 'l', 'L', 2, 1000.0, 1);
            INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base, sort_order, is_active)
                VALUES (6, 'Tonne', 't', 't', 1, 1000000.0, 3, 0);
            INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base, sort_order)
                VALUES (99, 'Bushel', 'bu', 'bu', 2, 35239.1, 9);
            INSERT INTO measure_compatibility (from_measure_id, to_measure_id, factor) VALUES (3, 4, 2.2046);
            INSERT INTO products (id, name, slug, default_measure_id) VALUES (7, 'Basmati Rice', 'basmati-rice', 3);
            INSERT INTO products (id, name, slug, default_measure_id) VALUES (8, 'Saffron', 'saffron', NULL);
            INSERT INTO product_prices (product_id, measure_id, price) VALUES (7, 3, 10.0);
            "#,
        )
        .unwrap();
    }

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            seed(conn);
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_direct_price() {
        let resolver = PricingResolver::new(setup());
        assert_eq!(resolver.price_for_unit(7, KG), Some(10.0));
    }

    #[test]
    fn test_converted_price() {
        let resolver = PricingResolver::new(setup());
        let price = resolver.price_for_unit(7, LB).unwrap();
        assert!((price - 10.0 / 2.2046).abs() < 1e-9);
        assert!((price - 4.536).abs() < 0.001);
    }

    #[test]
    fn test_unrelated_measure_is_absent() {
        let resolver = PricingResolver::new(setup());
        assert_eq!(resolver.price_for_unit(7, UNRELATED), None);
        assert_eq!(resolver.total_price(7, UNRELATED, 0.0), None);
        assert_eq!(resolver.total_price(7, UNRELATED, 12.0), None);
    }

    #[test]
    fn test_unknown_product_is_absent() {
        let resolver = PricingResolver::new(setup());
        assert_eq!(resolver.price_for_unit(404, KG), None);
    }

    #[test]
    fn test_total_price_multiplies_quantity() {
        let resolver = PricingResolver::new(setup());
        assert_eq!(resolver.total_price(7, KG, 25.0), Some(250.0));
        assert_eq!(resolver.total_price(7, KG, 0.0), Some(0.0));

        let lb_total = resolver.total_price(7, LB, 3.0).unwrap();
        assert!((lb_total - 3.0 * 10.0 / 2.2046).abs() < 1e-9);
    }

    #[test]
    fn test_inactive_price_is_ignored() {
        let db = setup();
        db.with_conn(|conn| {
            ProductPrice::set_active(conn, 7, KG, false)?;
            Ok(())
        })
        .unwrap();
        let resolver = PricingResolver::new(db);
        assert_eq!(resolver.price_for_unit(7, KG), None);
        assert_eq!(resolver.price_for_unit(7, LB), None);
    }

    #[test]
    fn test_direct_price_preferred_over_conversion() {
        let db = setup();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO product_prices (product_id, measure_id, price) VALUES (7, 4, 5.25)",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let resolver = PricingResolver::new(db);
        assert_eq!(resolver.price_for_unit(7, LB), Some(5.25));
    }

    #[test]
    fn test_first_convertible_row_wins() {
        let db = setup();
        db.with_conn(|conn| {
            // A second source (litre) that also converts to bushel, inserted after kg
            conn.execute_batch(
                "INSERT INTO product_prices (product_id, measure_id, price) VALUES (7, 5, 8.0);
                 INSERT INTO measure_compatibility (from_measure_id, to_measure_id, factor) VALUES (3, 99, 0.5);
                 INSERT INTO measure_compatibility (from_measure_id, to_measure_id, factor) VALUES (5, 99, 0.02838);",
            )?;
            Ok(())
        })
        .unwrap();

        let resolver = PricingResolver::new(db);
        let quote = resolver.quote(7, UNRELATED, 1.0).unwrap();
        assert_eq!(quote.source_measure_id, KG);
        assert_eq!(quote.conversion_factor, Some(0.5));
        assert!((quote.unit_price - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_quote_reports_derivation() {
        let resolver = PricingResolver::new(setup());

        let direct = resolver.quote(7, KG, 2.0).unwrap();
        assert_eq!(direct.conversion_factor, None);
        assert_eq!(direct.total, 20.0);

        let converted = resolver.quote(7, LB, 2.0).unwrap();
        assert_eq!(converted.source_measure_id, KG);
        assert_eq!(converted.conversion_factor, Some(2.2046));
    }

    #[test]
    fn test_available_measures_lists_active_family_members() {
        let resolver = PricingResolver::new(setup());
        let ids: Vec<i64> = resolver.available_measures(7).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![KG, LB]);
        assert!(!ids.contains(&TONNE));
    }

    #[test]
    fn test_available_measures_empty_without_default_measure() {
        let resolver = PricingResolver::new(setup());
        assert!(resolver.available_measures(8).is_empty());
        assert!(resolver.available_measures(404).is_empty());
    }

    #[test]
    fn test_measures_compatible() {
        let resolver = PricingResolver::new(setup());
        // direct row, either direction
        assert!(resolver.measures_compatible(KG, LB));
        assert!(resolver.measures_compatible(LB, KG));
        // same family, no row
        assert!(resolver.measures_compatible(LB, TONNE));
        // different families
        assert!(!resolver.measures_compatible(KG, LITRE));
        // unknown measure
        assert!(!resolver.measures_compatible(KG, 12345));
    }

    #[test]
    fn test_storage_failure_is_distinguishable() {
        let db = setup();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE product_prices;")?;
            Ok(())
        })
        .unwrap();
        let resolver = PricingResolver::new(db);

        assert!(matches!(
            resolver.try_price_for_unit(7, KG),
            Err(PricingError::Storage(_))
        ));
        // fail-soft wrapper degrades to absent
        assert_eq!(resolver.price_for_unit(7, KG), None);
    }

    #[test]
    fn test_storage_failure_degrades_every_operation() {
        let db = setup();
        db.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = OFF;
                 DROP TABLE product_prices;
                 DROP TABLE measure_compatibility;
                 DROP TABLE measures;",
            )?;
            Ok(())
        })
        .unwrap();

        db.with_conn(|conn| {
            assert_eq!(estimate_total(conn, 7, KG, 3.0), None);
            Ok(())
        })
        .unwrap();

        let resolver = PricingResolver::new(db);
        assert!(matches!(resolver.try_available_measures(7), Err(PricingError::Storage(_))));
        assert!(resolver.available_measures(7).is_empty());
        assert!(matches!(resolver.try_measures_compatible(KG, LB), Err(PricingError::Storage(_))));
        assert!(!resolver.measures_compatible(KG, LB));
        assert_eq!(resolver.total_price(7, KG, 3.0), None);
        assert!(resolver.quote(7, KG, 3.0).is_none());
    }
}
