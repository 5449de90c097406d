//! ExportDesk MCP Server Implementation
//!
//! Implements the MCP server with all catalog, pricing and quote tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::models::{
    CategoryUpdate, MeasureCreate, MeasureUpdate, ProductCreate, ProductPriceSet, ProductUpdate,
    QuoteRequestCreate, DEFAULT_CURRENCY,
};
use crate::ratelimit::SubmissionLimiter;
use crate::tools::status::StatusTracker;
use crate::tools::{catalog, measures, pricing, quotes};

/// ExportDesk MCP Service
#[derive(Clone)]
pub struct ExportDeskService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    limiter: Arc<SubmissionLimiter>,
    tool_router: ToolRouter<ExportDeskService>,
}

impl ExportDeskService {
    pub fn new(config: &Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                config.database_path.clone(),
                config.quote_limit,
                config.quote_window.as_secs(),
            ))),
            database,
            limiter: Arc::new(SubmissionLimiter::new(config.quote_limit, config.quote_window)),
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: i64) -> Result<CallToolResult, McpError> {
    json_result(&serde_json::json!({ "error": format!("{} not found", what), "id": id }))
}

fn internal(e: String) -> McpError {
    McpError::internal_error(e, None)
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddCategoryParams {
    pub name: String,
    /// URL slug; derived from the name when omitted
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListCategoriesParams {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateCategoryParams {
    pub id: i64,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddProductParams {
    pub name: String,
    /// URL slug; derived from the name when omitted
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    /// Measure whose family the product is priced in
    pub default_measure_id: Option<i64>,
    pub description: Option<String>,
    /// ISO country code of origin
    pub origin_country: Option<String>,
    /// Harmonized System customs code
    pub hs_code: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListProductsParams {
    pub category_id: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchProductsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductParams {
    pub id: i64,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    pub default_measure_id: Option<i64>,
    pub description: Option<String>,
    pub origin_country: Option<String>,
    pub hs_code: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMeasureFamilyParams {
    /// Family name, e.g. "weight"
    pub name: String,
    /// Base unit the factors refer to, e.g. "g"
    pub base_unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMeasureParams {
    pub name: String,
    pub short_name: String,
    pub symbol: String,
    pub family_id: i64,
    /// How many base units one of this measure holds (> 0)
    pub factor_to_base: f64,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMeasuresParams {
    pub family_id: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMeasureParams {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub symbol: Option<String>,
    pub factor_to_base: Option<f64>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetCompatibilityParams {
    pub from_measure_id: i64,
    pub to_measure_id: i64,
    /// price_in_to = price_in_from / factor
    pub factor: f64,
    /// Also write the reciprocal row (default false)
    #[serde(default)]
    pub bidirectional: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveCompatibilityParams {
    pub from_measure_id: i64,
    pub to_measure_id: i64,
    #[serde(default)]
    pub bidirectional: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MeasureIdParams {
    pub measure_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPriceParams {
    pub product_id: i64,
    pub measure_id: i64,
    pub price: f64,
    /// Three-letter currency code (default USD)
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProductIdParams {
    pub product_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProductMeasureParams {
    pub product_id: i64,
    pub measure_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPriceActiveParams {
    pub product_id: i64,
    pub measure_id: i64,
    pub active: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TotalPriceParams {
    pub product_id: i64,
    pub measure_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CompatibleParams {
    pub from_measure_id: i64,
    pub to_measure_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubmitQuoteParams {
    /// "contact" or "quote" (default contact)
    pub kind: Option<String>,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    /// Required for quotes
    pub product_id: Option<i64>,
    pub measure_id: Option<i64>,
    pub quantity: Option<f64>,
    pub message: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListQuoteRequestsParams {
    /// new, in_progress, answered, closed
    pub status: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateQuoteStatusParams {
    pub id: i64,
    /// new, in_progress, answered, closed
    pub status: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl ExportDeskService {
    // --- Status ---

    #[tool(description = "Get the current status of the ExportDesk service including build info, database status, and process information")]
    async fn exportdesk_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        json_result(&tracker.get_status())
    }

    #[tool(description = "Get instructions for units of measure, conversion rows, product pricing and quote requests. Call this before setting up prices.")]
    fn pricing_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::PRICING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(PRICING_INSTRUCTIONS)]))
    }

    // --- Categories ---

    #[tool(description = "Create a product category")]
    fn add_category(&self, Parameters(p): Parameters<AddCategoryParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::add_category(&self.database, &p.name, p.slug.as_deref(), p.description, p.sort_order)
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Get a category by ID")]
    fn get_category(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match catalog::get_category(&self.database, p.id).map_err(internal)? {
            Some(category) => json_result(&category),
            None => not_found("Category", p.id),
        }
    }

    #[tool(description = "List categories with their product counts")]
    fn list_categories(&self, Parameters(p): Parameters<ListCategoriesParams>) -> Result<CallToolResult, McpError> {
        json_result(&catalog::list_categories(&self.database, p.active_only).map_err(internal)?)
    }

    #[tool(description = "Update a category")]
    fn update_category(&self, Parameters(p): Parameters<UpdateCategoryParams>) -> Result<CallToolResult, McpError> {
        let data = CategoryUpdate {
            name: p.name, slug: p.slug, description: p.description,
            is_active: p.is_active, sort_order: p.sort_order,
        };
        json_result(&catalog::update_category(&self.database, p.id, data).map_err(internal)?)
    }

    #[tool(description = "Delete a category (only allowed when no products are filed under it)")]
    fn delete_category(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        json_result(&catalog::delete_category(&self.database, p.id).map_err(internal)?)
    }

    // --- Products ---

    #[tool(description = "Create a product. Set default_measure_id to decide which unit family it is priced in.")]
    fn add_product(&self, Parameters(p): Parameters<AddProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductCreate {
            name: p.name, slug: p.slug.unwrap_or_default(), category_id: p.category_id,
            default_measure_id: p.default_measure_id, description: p.description,
            origin_country: p.origin_country, hs_code: p.hs_code,
        };
        json_result(&catalog::add_product(&self.database, data).map_err(internal)?)
    }

    #[tool(description = "Get full product details including category, default measure and prices")]
    fn get_product(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match catalog::get_product(&self.database, p.id).map_err(internal)? {
            Some(detail) => json_result(&detail),
            None => not_found("Product", p.id),
        }
    }

    #[tool(description = "List products with optional category filter and pagination")]
    fn list_products(&self, Parameters(p): Parameters<ListProductsParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::list_products(&self.database, p.category_id, p.active_only, p.limit, p.offset)
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Search products by name or slug")]
    fn search_products(&self, Parameters(p): Parameters<SearchProductsParams>) -> Result<CallToolResult, McpError> {
        json_result(&catalog::search_products(&self.database, &p.query, p.limit).map_err(internal)?)
    }

    #[tool(description = "Update a product")]
    fn update_product(&self, Parameters(p): Parameters<UpdateProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductUpdate {
            name: p.name, slug: p.slug, category_id: p.category_id,
            default_measure_id: p.default_measure_id, description: p.description,
            origin_country: p.origin_country, hs_code: p.hs_code, is_active: p.is_active,
        };
        json_result(&catalog::update_product(&self.database, p.id, data).map_err(internal)?)
    }

    #[tool(description = "Delete a product and its prices (blocked while quote requests reference it)")]
    fn delete_product(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        json_result(&catalog::delete_product(&self.database, p.id).map_err(internal)?)
    }

    // --- Measures ---

    #[tool(description = "Create a measure family such as weight or volume")]
    fn add_measure_family(&self, Parameters(p): Parameters<AddMeasureFamilyParams>) -> Result<CallToolResult, McpError> {
        json_result(&measures::add_measure_family(&self.database, &p.name, &p.base_unit).map_err(internal)?)
    }

    #[tool(description = "List measure families")]
    fn list_measure_families(&self) -> Result<CallToolResult, McpError> {
        json_result(&measures::list_measure_families(&self.database).map_err(internal)?)
    }

    #[tool(description = "Create a unit of measure in a family")]
    fn add_measure(&self, Parameters(p): Parameters<AddMeasureParams>) -> Result<CallToolResult, McpError> {
        let data = MeasureCreate {
            name: p.name, short_name: p.short_name, symbol: p.symbol, family_id: p.family_id,
            factor_to_base: p.factor_to_base, is_active: true, sort_order: p.sort_order,
        };
        json_result(&measures::add_measure(&self.database, data).map_err(internal)?)
    }

    #[tool(description = "Get a measure with its family and conversion rows")]
    fn get_measure(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match measures::get_measure(&self.database, p.id).map_err(internal)? {
            Some(detail) => json_result(&detail),
            None => not_found("Measure", p.id),
        }
    }

    #[tool(description = "List measures, optionally for one family")]
    fn list_measures(&self, Parameters(p): Parameters<ListMeasuresParams>) -> Result<CallToolResult, McpError> {
        json_result(&measures::list_measures(&self.database, p.family_id, p.active_only).map_err(internal)?)
    }

    #[tool(description = "Update a measure")]
    fn update_measure(&self, Parameters(p): Parameters<UpdateMeasureParams>) -> Result<CallToolResult, McpError> {
        let data = MeasureUpdate {
            name: p.name, short_name: p.short_name, symbol: p.symbol,
            factor_to_base: p.factor_to_base, is_active: p.is_active, sort_order: p.sort_order,
        };
        json_result(&measures::update_measure(&self.database, p.id, data).map_err(internal)?)
    }

    #[tool(description = "Deactivate a measure so it is no longer offered for pricing")]
    fn deactivate_measure(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        json_result(&measures::deactivate_measure(&self.database, p.id).map_err(internal)?)
    }

    #[tool(description = "Set the conversion factor between two measures (price_in_to = price_in_from / factor)")]
    fn set_measure_compatibility(&self, Parameters(p): Parameters<SetCompatibilityParams>) -> Result<CallToolResult, McpError> {
        let result = measures::set_measure_compatibility(
            &self.database, p.from_measure_id, p.to_measure_id, p.factor, p.bidirectional,
        ).map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "List conversion rows touching a measure")]
    fn list_measure_compatibility(&self, Parameters(p): Parameters<MeasureIdParams>) -> Result<CallToolResult, McpError> {
        json_result(&measures::list_measure_compatibility(&self.database, p.measure_id).map_err(internal)?)
    }

    #[tool(description = "Remove a conversion row between two measures")]
    fn remove_measure_compatibility(&self, Parameters(p): Parameters<RemoveCompatibilityParams>) -> Result<CallToolResult, McpError> {
        let result = measures::remove_measure_compatibility(
            &self.database, p.from_measure_id, p.to_measure_id, p.bidirectional,
        ).map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Load the standard weight, volume and count measures with conversion rows. Safe to run more than once.")]
    fn seed_standard_measures(&self) -> Result<CallToolResult, McpError> {
        json_result(&measures::seed_standard_measures(&self.database).map_err(internal)?)
    }

    // --- Prices ---

    #[tool(description = "Set the price of a product in a measure (replaces any existing price for that measure)")]
    fn set_product_price(&self, Parameters(p): Parameters<SetPriceParams>) -> Result<CallToolResult, McpError> {
        let data = ProductPriceSet {
            product_id: p.product_id, measure_id: p.measure_id, price: p.price,
            currency: p.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        };
        json_result(&pricing::set_product_price(&self.database, data).map_err(internal)?)
    }

    #[tool(description = "List all prices of a product")]
    fn list_product_prices(&self, Parameters(p): Parameters<ProductIdParams>) -> Result<CallToolResult, McpError> {
        json_result(&pricing::list_product_prices(&self.database, p.product_id).map_err(internal)?)
    }

    #[tool(description = "Activate or deactivate a product price without deleting it")]
    fn set_product_price_active(&self, Parameters(p): Parameters<SetPriceActiveParams>) -> Result<CallToolResult, McpError> {
        let result = pricing::set_product_price_active(&self.database, p.product_id, p.measure_id, p.active)
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Remove a product price")]
    fn remove_product_price(&self, Parameters(p): Parameters<ProductMeasureParams>) -> Result<CallToolResult, McpError> {
        json_result(&pricing::remove_product_price(&self.database, p.product_id, p.measure_id).map_err(internal)?)
    }

    // --- Pricing queries ---

    #[tool(description = "List the measures a product can be priced in (the family of its default measure)")]
    fn available_measures(&self, Parameters(p): Parameters<ProductIdParams>) -> Result<CallToolResult, McpError> {
        json_result(&pricing::available_measures(&self.database, p.product_id).map_err(internal)?)
    }

    #[tool(description = "Price of one unit of a product in a measure, converting from another priced measure when needed")]
    fn price_for_unit(&self, Parameters(p): Parameters<ProductMeasureParams>) -> Result<CallToolResult, McpError> {
        json_result(&pricing::price_for_unit(&self.database, p.product_id, p.measure_id).map_err(internal)?)
    }

    #[tool(description = "Total price for a quantity of a product in a measure")]
    fn total_price(&self, Parameters(p): Parameters<TotalPriceParams>) -> Result<CallToolResult, McpError> {
        let result = pricing::total_price(&self.database, p.product_id, p.measure_id, p.quantity).map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Check whether two measures can be converted between")]
    fn measures_compatible(&self, Parameters(p): Parameters<CompatibleParams>) -> Result<CallToolResult, McpError> {
        let result = pricing::measures_compatible(&self.database, p.from_measure_id, p.to_measure_id).map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Price a quantity and show how the unit price was derived (direct or converted)")]
    fn quote_price(&self, Parameters(p): Parameters<TotalPriceParams>) -> Result<CallToolResult, McpError> {
        let result = pricing::quote_price(&self.database, p.product_id, p.measure_id, p.quantity).map_err(internal)?;
        json_result(&result)
    }

    // --- Quote requests ---

    #[tool(description = "Submit a contact message or quote request. Quotes need a product; with measure and quantity they get an estimated total.")]
    fn submit_quote_request(&self, Parameters(p): Parameters<SubmitQuoteParams>) -> Result<CallToolResult, McpError> {
        let kind = quotes::parse_kind(p.kind.as_deref()).map_err(|e| McpError::invalid_params(e, None))?;
        let data = QuoteRequestCreate {
            kind,
            name: p.name, email: p.email, company: p.company, phone: p.phone, country: p.country,
            product_id: p.product_id, measure_id: p.measure_id, quantity: p.quantity, message: p.message,
        };
        let result = quotes::submit_quote_request(&self.database, &self.limiter, data).map_err(|e| {
            if e.is_client_error() {
                McpError::invalid_params(e.to_string(), None)
            } else {
                McpError::internal_error(e.to_string(), None)
            }
        })?;
        json_result(&result)
    }

    #[tool(description = "Get a quote request by ID")]
    fn get_quote_request(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match quotes::get_quote_request(&self.database, p.id).map_err(internal)? {
            Some(request) => json_result(&request),
            None => not_found("Quote request", p.id),
        }
    }

    #[tool(description = "List quote requests, newest first, optionally filtered by status")]
    fn list_quote_requests(&self, Parameters(p): Parameters<ListQuoteRequestsParams>) -> Result<CallToolResult, McpError> {
        let result = quotes::list_quote_requests(&self.database, p.status.as_deref(), p.limit, p.offset)
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Move a quote request to a new status (new, in_progress, answered, closed)")]
    fn update_quote_status(&self, Parameters(p): Parameters<UpdateQuoteStatusParams>) -> Result<CallToolResult, McpError> {
        json_result(&quotes::update_quote_status(&self.database, p.id, &p.status).map_err(internal)?)
    }

    #[tool(description = "Delete a quote request")]
    fn delete_quote_request(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        json_result(&quotes::delete_quote_request(&self.database, p.id).map_err(internal)?)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for ExportDeskService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "exportdesk".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("ExportDesk".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "ExportDesk - export catalog, unit-of-measure pricing and quote requests. \
                 IMPORTANT: Call pricing_instructions before setting up measures or prices. \
                 Categories: add/get/list/update/delete_category. \
                 Products: add/get/list/search/update/delete_product. \
                 Measures: add_measure_family, list_measure_families, add/get/list/update/deactivate_measure, \
                 set/list/remove_measure_compatibility, seed_standard_measures. \
                 Prices: set_product_price, list_product_prices, set_product_price_active, remove_product_price. \
                 Pricing: available_measures, price_for_unit, total_price, measures_compatible, quote_price. \
                 Quotes: submit_quote_request, get/list_quote_requests, update_quote_status, delete_quote_request."
                    .into(),
            ),
        }
    }
}
