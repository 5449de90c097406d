//! Data models
//!
//! Rust structs representing database entities.

mod category;
mod measure;
mod measure_compatibility;
mod product;
mod product_price;
mod quote_request;

pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use measure::{Measure, MeasureCreate, MeasureFamily, MeasureUpdate};
pub use measure_compatibility::MeasureCompatibility;
pub use product::{Product, ProductCreate, ProductUpdate};
pub use product_price::{ProductPrice, ProductPriceSet, DEFAULT_CURRENCY};
pub use quote_request::{QuoteKind, QuoteRequest, QuoteRequestCreate, QuoteStatus};
