//! Pricing module
//!
//! Unit-of-measure price resolution and the standard unit catalog.

pub mod resolver;
pub mod units;

pub use resolver::{
    available_measures, estimate_total, measures_compatible, price_for_unit, quote, total_price,
    unit_price,
    PriceQuote, PricingError, PricingResolver, PricingResult, UnitPrice,
};
pub use units::{compatibility_factor, seed_standard_measures, SeedSummary, STANDARD_FAMILIES};
