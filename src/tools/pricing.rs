//! Pricing MCP Tools
//!
//! Product prices and the unit-of-measure price queries. Storage failures
//! come back as errors; a missing price is a normal response with
//! `available: false`.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Measure, Product, ProductPrice, ProductPriceSet};
use crate::pricing::{self, PriceQuote};
use crate::tools::validation;

#[derive(Debug, Serialize)]
pub struct SetPriceResponse {
    pub product_id: i64,
    pub measure_id: i64,
    pub price: f64,
    pub currency: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct PriceRow {
    pub measure_id: i64,
    pub measure_name: Option<String>,
    pub symbol: Option<String>,
    pub price: f64,
    pub currency: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct ListPricesResponse {
    pub product_id: i64,
    pub prices: Vec<PriceRow>,
}

#[derive(Debug, Serialize)]
pub struct SimpleSuccess {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct AvailableMeasuresResponse {
    pub product_id: i64,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Serialize)]
pub struct UnitPriceResponse {
    pub product_id: i64,
    pub measure_id: i64,
    pub available: bool,
    pub price: Option<f64>,
    pub converted: bool,
}

#[derive(Debug, Serialize)]
pub struct TotalPriceResponse {
    pub product_id: i64,
    pub measure_id: i64,
    pub quantity: f64,
    pub available: bool,
    pub total: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompatibleResponse {
    pub from_measure_id: i64,
    pub to_measure_id: i64,
    pub compatible: bool,
}

#[derive(Debug, Serialize)]
pub struct QuotePriceResponse {
    pub available: bool,
    pub quote: Option<PriceQuote>,
}

/// Set (or replace) the price of a product in a measure
pub fn set_product_price(db: &Database, mut data: ProductPriceSet) -> Result<SetPriceResponse, String> {
    data.price = validation::non_negative(data.price, "price")?;
    data.currency = validation::currency(&data.currency)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Product::get_by_id(&conn, data.product_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Product not found with id: {}", data.product_id));
    }
    if Measure::get_by_id(&conn, data.measure_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Measure not found with id: {}", data.measure_id));
    }

    let row = ProductPrice::upsert(&conn, &data).map_err(|e| format!("Failed to set price: {}", e))?;
    tracing::info!(
        product_id = row.product_id,
        measure_id = row.measure_id,
        price = row.price,
        "Product price set"
    );

    Ok(SetPriceResponse {
        product_id: row.product_id,
        measure_id: row.measure_id,
        price: row.price,
        currency: row.currency,
        updated_at: row.updated_at,
    })
}

pub fn list_product_prices(db: &Database, product_id: i64) -> Result<ListPricesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let rows = ProductPrice::list_for_product(&conn, product_id)
        .map_err(|e| format!("Failed to list prices: {}", e))?;

    let mut prices = Vec::with_capacity(rows.len());
    for row in rows {
        let measure = Measure::get_by_id(&conn, row.measure_id)
            .map_err(|e| format!("Failed to get measure: {}", e))?;
        prices.push(PriceRow {
            measure_id: row.measure_id,
            measure_name: measure.as_ref().map(|m| m.name.clone()),
            symbol: measure.map(|m| m.symbol),
            price: row.price,
            currency: row.currency,
            is_active: row.is_active,
        });
    }

    Ok(ListPricesResponse { product_id, prices })
}

pub fn set_product_price_active(db: &Database, product_id: i64, measure_id: i64, active: bool) -> Result<SimpleSuccess, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let found = ProductPrice::set_active(&conn, product_id, measure_id, active)
        .map_err(|e| format!("Failed to update price: {}", e))?;
    if !found {
        return Err(format!("No price for product {} in measure {}", product_id, measure_id));
    }
    Ok(SimpleSuccess { success: true })
}

pub fn remove_product_price(db: &Database, product_id: i64, measure_id: i64) -> Result<SimpleSuccess, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let found = ProductPrice::delete(&conn, product_id, measure_id)
        .map_err(|e| format!("Failed to remove price: {}", e))?;
    if !found {
        return Err(format!("No price for product {} in measure {}", product_id, measure_id));
    }
    Ok(SimpleSuccess { success: true })
}

pub fn available_measures(db: &Database, product_id: i64) -> Result<AvailableMeasuresResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let measures = pricing::available_measures(&conn, product_id)
        .map_err(|e| format!("Failed to resolve measures: {}", e))?;
    Ok(AvailableMeasuresResponse { product_id, measures })
}

pub fn price_for_unit(db: &Database, product_id: i64, measure_id: i64) -> Result<UnitPriceResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let unit = pricing::unit_price(&conn, product_id, measure_id)
        .map_err(|e| format!("Failed to resolve price: {}", e))?;

    Ok(UnitPriceResponse {
        product_id,
        measure_id,
        available: unit.is_some(),
        price: unit.map(|u| u.price),
        converted: unit.is_some_and(|u| u.is_converted()),
    })
}

pub fn total_price(db: &Database, product_id: i64, measure_id: i64, quantity: f64) -> Result<TotalPriceResponse, String> {
    let quantity = validation::non_negative(quantity, "quantity")?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let total = pricing::total_price(&conn, product_id, measure_id, quantity)
        .map_err(|e| format!("Failed to resolve price: {}", e))?;

    Ok(TotalPriceResponse {
        product_id,
        measure_id,
        quantity,
        available: total.is_some(),
        total,
    })
}

pub fn measures_compatible(db: &Database, from_measure_id: i64, to_measure_id: i64) -> Result<CompatibleResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let compatible = pricing::measures_compatible(&conn, from_measure_id, to_measure_id)
        .map_err(|e| format!("Failed to check compatibility: {}", e))?;

    Ok(CompatibleResponse {
        from_measure_id,
        to_measure_id,
        compatible,
    })
}

pub fn quote_price(db: &Database, product_id: i64, measure_id: i64, quantity: f64) -> Result<QuotePriceResponse, String> {
    let quantity = validation::non_negative(quantity, "quantity")?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let quote = pricing::quote(&conn, product_id, measure_id, quantity)
        .map_err(|e| format!("Failed to resolve price: {}", e))?;

    Ok(QuotePriceResponse {
        available: quote.is_some(),
        quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::pricing::seed_standard_measures;

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::in_memory().unwrap();
        let ids = db
            .with_conn(|conn| {
                run_migrations(conn)?;
                seed_standard_measures(conn)?;
                let id_of = |short: &str| -> rusqlite::Result<i64> {
                    conn.query_row("SELECT id FROM measures WHERE short_name = ?1", [short], |r| r.get(0))
                };
                let kg = id_of("kg")?;
                let lb = id_of("lb")?;
                conn.execute(
                    "INSERT INTO products (name, slug, default_measure_id) VALUES ('Cashew W240', 'cashew-w240', ?1)",
                    [kg],
                )?;
                Ok((conn.last_insert_rowid(), kg, lb))
            })
            .unwrap();
        (db, ids.0, ids.1, ids.2)
    }

    fn set(db: &Database, product_id: i64, measure_id: i64, price: f64) -> Result<SetPriceResponse, String> {
        set_product_price(
            db,
            ProductPriceSet {
                product_id,
                measure_id,
                price,
                currency: "usd".to_string(),
            },
        )
    }

    #[test]
    fn test_set_price_normalizes_currency() {
        let (db, product, kg, _) = setup();
        let resp = set(&db, product, kg, 9.5).unwrap();
        assert_eq!(resp.currency, "USD");
    }

    #[test]
    fn test_set_price_validates() {
        let (db, product, kg, _) = setup();
        assert!(set(&db, product, kg, -1.0).is_err());
        assert!(set(&db, 404, kg, 1.0).is_err());
        assert!(set(&db, product, 404, 1.0).is_err());
    }

    #[test]
    fn test_price_replaced_not_duplicated() {
        let (db, product, kg, _) = setup();
        set(&db, product, kg, 9.5).unwrap();
        set(&db, product, kg, 11.0).unwrap();
        let listed = list_product_prices(&db, product).unwrap();
        assert_eq!(listed.prices.len(), 1);
        assert_eq!(listed.prices[0].price, 11.0);
        assert_eq!(listed.prices[0].symbol.as_deref(), Some("kg"));
    }

    #[test]
    fn test_price_queries_with_seeded_units() {
        let (db, product, kg, lb) = setup();
        set(&db, product, kg, 10.0).unwrap();

        let direct = price_for_unit(&db, product, kg).unwrap();
        assert_eq!(direct.price, Some(10.0));
        assert!(!direct.converted);

        let converted = price_for_unit(&db, product, lb).unwrap();
        assert!(converted.converted);
        assert!((converted.price.unwrap() - 4.5359).abs() < 0.001);

        let total = total_price(&db, product, kg, 0.0).unwrap();
        assert_eq!(total.total, Some(0.0));
        assert!(total_price(&db, product, kg, -2.0).is_err());

        let measures = available_measures(&db, product).unwrap();
        assert_eq!(measures.measures.len(), 5);
    }

    #[test]
    fn test_unavailable_price_is_not_an_error() {
        let (db, product, _, _) = setup();
        let litre: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT id FROM measures WHERE short_name = 'l'", [], |r| r.get(0))?))
            .unwrap();

        let resp = price_for_unit(&db, product, litre).unwrap();
        assert!(!resp.available);
        assert_eq!(resp.price, None);

        let quote = quote_price(&db, product, litre, 5.0).unwrap();
        assert!(!quote.available);
    }

    #[test]
    fn test_deactivate_and_remove_price() {
        let (db, product, kg, _) = setup();
        set(&db, product, kg, 10.0).unwrap();

        set_product_price_active(&db, product, kg, false).unwrap();
        assert!(!price_for_unit(&db, product, kg).unwrap().available);

        remove_product_price(&db, product, kg).unwrap();
        assert!(remove_product_price(&db, product, kg).is_err());
    }
}
