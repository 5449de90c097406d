//! ExportDesk Library
//!
//! Product catalog, unit-of-measure pricing and quote requests for an
//! export company.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod pricing;
pub mod ratelimit;
pub mod tools;
