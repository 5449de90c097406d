//! Catalog MCP Tools
//!
//! Categories and products.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    Category, CategoryCreate, CategoryUpdate, Measure, Product, ProductCreate, ProductPrice,
    ProductUpdate,
};
use crate::tools::validation;

/// Response for add_category / add_product
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ListCategoriesResponse {
    pub categories: Vec<CategorySummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub product_count: i64,
}

/// Summary of a product for list/search results
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub default_measure_id: Option<i64>,
    pub is_active: bool,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            slug: p.slug.clone(),
            category_id: p.category_id,
            default_measure_id: p.default_measure_id,
            is_active: p.is_active,
        }
    }
}

/// Full product detail
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub default_measure: Option<Measure>,
    pub prices: Vec<ProductPrice>,
}

#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub items: Vec<ProductSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchProductsResponse {
    pub items: Vec<ProductSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub success: bool,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted_id: i64,
}

// ============================================================================
// Categories
// ============================================================================

pub fn add_category(
    db: &Database,
    name: &str,
    slug: Option<&str>,
    description: Option<String>,
    sort_order: i64,
) -> Result<CreatedResponse, String> {
    let name = validation::required_text(name, "Category name")?;
    let slug = match slug {
        Some(s) => validation::slug(s)?,
        None => validation::slug(&validation::slugify(&name))?,
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let data = CategoryCreate {
        name,
        slug,
        description: validation::optional_text(description),
        sort_order,
    };
    let category = Category::create(&conn, &data)
        .map_err(|e| format!("Failed to create category: {}", e))?;

    tracing::info!(id = category.id, slug = %category.slug, "Category created");

    Ok(CreatedResponse {
        id: category.id,
        name: category.name,
        slug: category.slug,
        created_at: category.created_at,
    })
}

pub fn get_category(db: &Database, id: i64) -> Result<Option<Category>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Category::get_by_id(&conn, id).map_err(|e| format!("Failed to get category: {}", e))
}

pub fn list_categories(db: &Database, active_only: bool) -> Result<ListCategoriesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let categories = Category::list(&conn, active_only)
        .map_err(|e| format!("Failed to list categories: {}", e))?;

    let mut summaries = Vec::with_capacity(categories.len());
    for c in categories {
        let product_count = Category::product_count(&conn, c.id)
            .map_err(|e| format!("Failed to count products: {}", e))?;
        summaries.push(CategorySummary {
            id: c.id,
            name: c.name,
            slug: c.slug,
            is_active: c.is_active,
            product_count,
        });
    }

    let total = summaries.len();
    Ok(ListCategoriesResponse { categories: summaries, total })
}

pub fn update_category(db: &Database, id: i64, mut data: CategoryUpdate) -> Result<UpdatedResponse, String> {
    if let Some(ref name) = data.name {
        data.name = Some(validation::required_text(name, "Category name")?);
    }
    if let Some(ref slug) = data.slug {
        data.slug = Some(validation::slug(slug)?);
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    match Category::update(&conn, id, &data).map_err(|e| format!("Failed to update category: {}", e))? {
        Some(c) => Ok(UpdatedResponse { success: true, updated_at: c.updated_at }),
        None => Err(format!("Category not found with id: {}", id)),
    }
}

/// Delete a category (blocked while products reference it)
pub fn delete_category(db: &Database, id: i64) -> Result<DeletedResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Category::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))?.is_none() {
        return Err(format!("Category not found with id: {}", id));
    }

    let product_count = Category::product_count(&conn, id)
        .map_err(|e| format!("Failed to check usage: {}", e))?;
    if product_count > 0 {
        return Err(format!("Cannot delete category: {} product(s) still filed under it", product_count));
    }

    Category::delete(&conn, id).map_err(|e| format!("Failed to delete category: {}", e))?;
    Ok(DeletedResponse { success: true, deleted_id: id })
}

// ============================================================================
// Products
// ============================================================================

/// Reject default measures that do not exist or are inactive
fn check_default_measure(conn: &rusqlite::Connection, measure_id: i64) -> Result<(), String> {
    match Measure::get_by_id(conn, measure_id).map_err(|e| format!("Database error: {}", e))? {
        Some(m) if m.is_active => Ok(()),
        Some(_) => Err(format!("Measure {} is inactive and cannot be a default measure", measure_id)),
        None => Err(format!("Measure not found with id: {}", measure_id)),
    }
}

fn check_category(conn: &rusqlite::Connection, category_id: i64) -> Result<(), String> {
    match Category::get_by_id(conn, category_id).map_err(|e| format!("Database error: {}", e))? {
        Some(_) => Ok(()),
        None => Err(format!("Category not found with id: {}", category_id)),
    }
}

pub fn add_product(db: &Database, mut data: ProductCreate) -> Result<CreatedResponse, String> {
    data.name = validation::required_text(&data.name, "Product name")?;
    data.slug = if data.slug.trim().is_empty() {
        validation::slug(&validation::slugify(&data.name))?
    } else {
        validation::slug(&data.slug)?
    };
    data.description = validation::optional_text(data.description);
    data.origin_country = validation::optional_text(data.origin_country);
    data.hs_code = validation::optional_text(data.hs_code);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(category_id) = data.category_id {
        check_category(&conn, category_id)?;
    }
    if let Some(measure_id) = data.default_measure_id {
        check_default_measure(&conn, measure_id)?;
    }

    let product = Product::create(&conn, &data)
        .map_err(|e| format!("Failed to create product: {}", e))?;

    tracing::info!(id = product.id, slug = %product.slug, "Product created");

    Ok(CreatedResponse {
        id: product.id,
        name: product.name,
        slug: product.slug,
        created_at: product.created_at,
    })
}

/// Get a product with its category, default measure and prices
pub fn get_product(db: &Database, id: i64) -> Result<Option<ProductDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(product) = Product::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get product: {}", e))?
    else {
        return Ok(None);
    };

    let category = match product.category_id {
        Some(cid) => Category::get_by_id(&conn, cid).map_err(|e| format!("Failed to get category: {}", e))?,
        None => None,
    };
    let default_measure = match product.default_measure_id {
        Some(mid) => Measure::get_by_id(&conn, mid).map_err(|e| format!("Failed to get measure: {}", e))?,
        None => None,
    };
    let prices = ProductPrice::list_for_product(&conn, id)
        .map_err(|e| format!("Failed to get prices: {}", e))?;

    Ok(Some(ProductDetail {
        product,
        category,
        default_measure,
        prices,
    }))
}

pub fn list_products(
    db: &Database,
    category_id: Option<i64>,
    active_only: bool,
    limit: i64,
    offset: i64,
) -> Result<ListProductsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Product::list(&conn, category_id, active_only, limit, offset)
        .map_err(|e| format!("Failed to list products: {}", e))?;
    let total = Product::count(&conn, category_id, active_only)
        .map_err(|e| format!("Failed to count products: {}", e))?;

    Ok(ListProductsResponse {
        items: items.iter().map(ProductSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

pub fn search_products(db: &Database, query: &str, limit: i64) -> Result<SearchProductsResponse, String> {
    let limit = limit.clamp(1, 100);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Product::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Search failed: {}", e))?;

    let summaries: Vec<ProductSummary> = items.iter().map(ProductSummary::from).collect();
    let total = summaries.len();
    Ok(SearchProductsResponse { items: summaries, total })
}

pub fn update_product(db: &Database, id: i64, mut data: ProductUpdate) -> Result<UpdatedResponse, String> {
    if let Some(ref name) = data.name {
        data.name = Some(validation::required_text(name, "Product name")?);
    }
    if let Some(ref slug) = data.slug {
        data.slug = Some(validation::slug(slug)?);
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(category_id) = data.category_id {
        check_category(&conn, category_id)?;
    }
    if let Some(measure_id) = data.default_measure_id {
        check_default_measure(&conn, measure_id)?;
    }

    match Product::update(&conn, id, &data).map_err(|e| format!("Failed to update product: {}", e))? {
        Some(p) => Ok(UpdatedResponse { success: true, updated_at: p.updated_at }),
        None => Err(format!("Product not found with id: {}", id)),
    }
}

/// Delete a product and its prices (blocked while quote requests reference it)
pub fn delete_product(db: &Database, id: i64) -> Result<DeletedResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Product::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))?.is_none() {
        return Err(format!("Product not found with id: {}", id));
    }

    let quote_count = Product::quote_request_count(&conn, id)
        .map_err(|e| format!("Failed to check usage: {}", e))?;
    if quote_count > 0 {
        return Err(format!(
            "Cannot delete product: referenced by {} quote request(s); deactivate it instead",
            quote_count
        ));
    }

    Product::delete(&conn, id).map_err(|e| format!("Failed to delete product: {}", e))?;
    tracing::info!(id, "Product deleted");
    Ok(DeletedResponse { success: true, deleted_id: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{MeasureCreate, MeasureFamily, ProductPriceSet};

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    fn product(name: &str) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            slug: String::new(),
            category_id: None,
            default_measure_id: None,
            description: None,
            origin_country: Some("IN".to_string()),
            hs_code: None,
        }
    }

    #[test]
    fn test_add_product_derives_slug() {
        let db = setup();
        let created = add_product(&db, product("Basmati Rice 1121")).unwrap();
        assert_eq!(created.slug, "basmati-rice-1121");
    }

    #[test]
    fn test_add_product_rejects_unknown_category() {
        let db = setup();
        let mut data = product("Cumin Seeds");
        data.category_id = Some(42);
        assert!(add_product(&db, data).is_err());
    }

    #[test]
    fn test_add_product_rejects_inactive_default_measure() {
        let db = setup();
        let measure_id = db
            .with_conn(|conn| {
                let family = MeasureFamily::create(conn, "weight", "g")?;
                let m = Measure::create(
                    conn,
                    &MeasureCreate {
                        name: "Quintal".to_string(),
                        short_name: "q".to_string(),
                        symbol: "q".to_string(),
                        family_id: family.id,
                        factor_to_base: 100_000.0,
                        is_active: false,
                        sort_order: 0,
                    },
                )?;
                Ok(m.id)
            })
            .unwrap();

        let mut data = product("Turmeric");
        data.default_measure_id = Some(measure_id);
        let err = add_product(&db, data).unwrap_err();
        assert!(err.contains("inactive"));
    }

    #[test]
    fn test_delete_category_blocked_by_products() {
        let db = setup();
        let cat = add_category(&db, "Spices", None, None, 0).unwrap();
        assert_eq!(cat.slug, "spices");

        let mut data = product("Black Pepper");
        data.category_id = Some(cat.id);
        add_product(&db, data).unwrap();

        assert!(delete_category(&db, cat.id).is_err());
        let listed = list_categories(&db, false).unwrap();
        assert_eq!(listed.categories[0].product_count, 1);
    }

    #[test]
    fn test_delete_product_cascades_prices() {
        let db = setup();
        let created = add_product(&db, product("Cardamom")).unwrap();
        db.with_conn(|conn| {
            let family = MeasureFamily::create(conn, "weight", "g")?;
            let kg = Measure::create(
                conn,
                &MeasureCreate {
                    name: "Kilogram".to_string(),
                    short_name: "kg".to_string(),
                    symbol: "kg".to_string(),
                    family_id: family.id,
                    factor_to_base: 1000.0,
                    is_active: true,
                    sort_order: 0,
                },
            )?;
            ProductPrice::upsert(
                conn,
                &ProductPriceSet {
                    product_id: created.id,
                    measure_id: kg.id,
                    price: 30.0,
                    currency: "USD".to_string(),
                },
            )?;
            Ok(())
        })
        .unwrap();

        delete_product(&db, created.id).unwrap();
        let remaining: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM product_prices", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_list_and_search_products() {
        let db = setup();
        add_product(&db, product("Basmati Rice")).unwrap();
        add_product(&db, product("Jasmine Rice")).unwrap();
        add_product(&db, product("Cashew")).unwrap();

        let page = list_products(&db, None, true, 2, 0).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);

        let found = search_products(&db, "rice", 10).unwrap();
        assert_eq!(found.total, 2);
    }
}
