//! ExportDesk Tools module
//!
//! MCP tool implementations for the catalog, pricing and quote desk.

pub mod catalog;
pub mod measures;
pub mod pricing;
pub mod quotes;
pub mod status;
pub mod validation;
