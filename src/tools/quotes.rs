//! Quote Request MCP Tools
//!
//! Contact and quotation submissions, throttled per submitter.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{Measure, Product, QuoteKind, QuoteRequest, QuoteRequestCreate, QuoteStatus};
use crate::pricing;
use crate::ratelimit::{RateLimitError, SubmissionLimiter};
use crate::tools::validation;

pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Serialize)]
pub struct SubmitQuoteResponse {
    pub id: i64,
    pub kind: QuoteKind,
    pub status: QuoteStatus,
    /// Resolver total for the requested quantity, when it could be priced
    pub estimated_total: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteRequestSummary {
    pub id: i64,
    pub kind: QuoteKind,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub product_id: Option<i64>,
    pub status: QuoteStatus,
    pub created_at: String,
}

impl From<&QuoteRequest> for QuoteRequestSummary {
    fn from(q: &QuoteRequest) -> Self {
        Self {
            id: q.id,
            kind: q.kind,
            name: q.name.clone(),
            email: q.email.clone(),
            company: q.company.clone(),
            product_id: q.product_id,
            status: q.status,
            created_at: q.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListQuoteRequestsResponse {
    pub items: Vec<QuoteRequestSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdateQuoteStatusResponse {
    pub id: i64,
    pub status: QuoteStatus,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteQuoteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

fn validate(mut data: QuoteRequestCreate) -> Result<QuoteRequestCreate, String> {
    data.name = validation::required_text(&data.name, "name")?;
    data.email = validation::email(&data.email)?;
    data.message = validation::required_text(&data.message, "message")?;
    if data.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(format!("message cannot exceed {} characters", MAX_MESSAGE_CHARS));
    }
    if let Some(q) = data.quantity {
        data.quantity = Some(validation::non_negative(q, "quantity")?);
    }
    data.company = validation::optional_text(data.company);
    data.phone = validation::optional_text(data.phone);
    data.country = validation::optional_text(data.country);

    if data.kind == QuoteKind::Quote && data.product_id.is_none() {
        return Err("A quote request needs a product_id".to_string());
    }
    Ok(data)
}

/// Why a submission was refused
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("Database error: {0}")]
    Storage(#[from] DbError),
}

impl SubmitError {
    /// True when the caller's input, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SubmitError::Storage(_))
    }
}

/// Read the submitted kind; absent means a contact message
pub fn parse_kind(kind: Option<&str>) -> Result<QuoteKind, String> {
    match kind {
        None => Ok(QuoteKind::Contact),
        Some(k) => QuoteKind::parse(k)
            .ok_or_else(|| format!("Unknown kind: '{}' (expected contact or quote)", k)),
    }
}

/// Submit a contact or quote request.
///
/// Everything that can reject the submission is checked before the
/// submitter's allowance is charged.
pub fn submit_quote_request(
    db: &Database,
    limiter: &SubmissionLimiter,
    data: QuoteRequestCreate,
) -> Result<SubmitQuoteResponse, SubmitError> {
    let data = validate(data).map_err(SubmitError::Invalid)?;

    let conn = db.get_conn()?;

    if let Some(product_id) = data.product_id {
        if Product::get_by_id(&conn, product_id)?.is_none() {
            return Err(SubmitError::Invalid(format!("Product not found with id: {}", product_id)));
        }
    }
    if let Some(measure_id) = data.measure_id {
        if Measure::get_by_id(&conn, measure_id)?.is_none() {
            return Err(SubmitError::Invalid(format!("Measure not found with id: {}", measure_id)));
        }
    }

    limiter.check(&data.email)?;

    // Failing to price never blocks the submission
    let estimated_total = match (data.product_id, data.measure_id, data.quantity) {
        (Some(p), Some(m), Some(q)) => pricing::estimate_total(&conn, p, m, q),
        _ => None,
    };

    let request = QuoteRequest::create(&conn, &data, estimated_total)?;

    tracing::info!(
        id = request.id,
        kind = request.kind.as_str(),
        estimated = request.estimated_total.is_some(),
        "Quote request received"
    );

    Ok(SubmitQuoteResponse {
        id: request.id,
        kind: request.kind,
        status: request.status,
        estimated_total: request.estimated_total,
        created_at: request.created_at,
    })
}

pub fn get_quote_request(db: &Database, id: i64) -> Result<Option<QuoteRequest>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    QuoteRequest::get_by_id(&conn, id).map_err(|e| format!("Failed to get quote request: {}", e))
}

pub fn list_quote_requests(
    db: &Database,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListQuoteRequestsResponse, String> {
    let status = match status {
        Some(s) => Some(QuoteStatus::parse(s).ok_or_else(|| format!("Unknown status: '{}'", s))?),
        None => None,
    };
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = QuoteRequest::list(&conn, status, limit, offset)
        .map_err(|e| format!("Failed to list quote requests: {}", e))?;
    let total = QuoteRequest::count(&conn, status)
        .map_err(|e| format!("Failed to count quote requests: {}", e))?;

    Ok(ListQuoteRequestsResponse {
        items: items.iter().map(QuoteRequestSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

pub fn update_quote_status(db: &Database, id: i64, status: &str) -> Result<UpdateQuoteStatusResponse, String> {
    let status = QuoteStatus::parse(status).ok_or_else(|| format!("Unknown status: '{}'", status))?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let updated = QuoteRequest::set_status(&conn, id, status)
        .map_err(|e| format!("Failed to update status: {}", e))?
        .ok_or_else(|| format!("Quote request not found with id: {}", id))?;

    Ok(UpdateQuoteStatusResponse {
        id: updated.id,
        status: updated.status,
        updated_at: updated.updated_at,
    })
}

pub fn delete_quote_request(db: &Database, id: i64) -> Result<DeleteQuoteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if !QuoteRequest::delete(&conn, id).map_err(|e| format!("Failed to delete quote request: {}", e))? {
        return Err(format!("Quote request not found with id: {}", id));
    }
    Ok(DeleteQuoteResponse { success: true, deleted_id: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::db::migrations::run_migrations;

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            conn.execute_batch(
                r#"
                INSERT INTO measure_families (id, name, base_unit) VALUES (1, 'weight', 'g');
                INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base)
                    VALUES (3, 'Kilogram', 'kg', 'kg', 1, 1000.0);
                INSERT INTO measures (id, name, short_name, symbol, family_id, factor_to_base)
                    VALUES (4, 'Pound', 'lb', 'lb', 1, 453.592);
                INSERT INTO measure_compatibility (from_measure_id, to_measure_id, factor) VALUES (3, 4, 2.2046);
                INSERT INTO products (id, name, slug, default_measure_id) VALUES (7, 'Basmati Rice', 'basmati-rice', 3);
                INSERT INTO product_prices (product_id, measure_id, price) VALUES (7, 3, 10.0);
                "#,
            )?;
            Ok(())
        })
        .unwrap();
        db
    }

    fn request(kind: QuoteKind, email: &str) -> QuoteRequestCreate {
        QuoteRequestCreate {
            kind,
            name: "Amina Okafor".to_string(),
            email: email.to_string(),
            company: Some("Lagos Foods Ltd".to_string()),
            phone: None,
            country: Some("NG".to_string()),
            product_id: None,
            measure_id: None,
            quantity: None,
            message: "Please send your export price list.".to_string(),
        }
    }

    #[test]
    fn test_quote_gets_estimate() {
        let db = setup();
        let limiter = SubmissionLimiter::new(5, Duration::from_secs(3600));

        let mut data = request(QuoteKind::Quote, "buyer@lagosfoods.ng");
        data.product_id = Some(7);
        data.measure_id = Some(3);
        data.quantity = Some(1000.0);

        let resp = submit_quote_request(&db, &limiter, data).unwrap();
        assert_eq!(resp.estimated_total, Some(10_000.0));
        assert_eq!(resp.status, QuoteStatus::New);
    }

    #[test]
    fn test_unpriceable_quote_still_saved() {
        let db = setup();
        let limiter = SubmissionLimiter::new(5, Duration::from_secs(3600));

        let mut data = request(QuoteKind::Quote, "buyer@lagosfoods.ng");
        data.product_id = Some(7);
        data.quantity = Some(50.0);

        let resp = submit_quote_request(&db, &limiter, data).unwrap();
        assert_eq!(resp.estimated_total, None);
        assert!(get_quote_request(&db, resp.id).unwrap().is_some());
    }

    #[test]
    fn test_quote_without_product_rejected() {
        let db = setup();
        let limiter = SubmissionLimiter::new(5, Duration::from_secs(3600));
        assert!(submit_quote_request(&db, &limiter, request(QuoteKind::Quote, "a@b.com")).is_err());
    }

    #[test]
    fn test_submissions_are_rate_limited() {
        let db = setup();
        let limiter = SubmissionLimiter::new(2, Duration::from_secs(3600));

        for _ in 0..2 {
            submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "spam@example.com")).unwrap();
        }
        let err = submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "SPAM@example.com")).unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited(_)));
        assert!(err.to_string().contains("Too many submissions"));
        assert!(err.is_client_error());

        // other submitters unaffected
        submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "other@example.com")).unwrap();
        assert_eq!(list_quote_requests(&db, None, 50, 0).unwrap().total, 3);
    }

    #[test]
    fn test_invalid_submission_does_not_consume_allowance() {
        let db = setup();
        let limiter = SubmissionLimiter::new(1, Duration::from_secs(3600));

        let mut bad = request(QuoteKind::Contact, "buyer@example.com");
        bad.message = "   ".to_string();
        assert!(submit_quote_request(&db, &limiter, bad).is_err());

        assert!(submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "buyer@example.com")).is_ok());
    }

    #[test]
    fn test_unknown_product_does_not_consume_allowance() {
        let db = setup();
        let limiter = SubmissionLimiter::new(1, Duration::from_secs(3600));

        let mut bad = request(QuoteKind::Quote, "buyer@example.com");
        bad.product_id = Some(404);
        let err = submit_quote_request(&db, &limiter, bad).unwrap_err();
        assert_eq!(err.to_string(), "Product not found with id: 404");

        let mut bad = request(QuoteKind::Quote, "buyer@example.com");
        bad.product_id = Some(7);
        bad.measure_id = Some(99);
        assert!(matches!(submit_quote_request(&db, &limiter, bad), Err(SubmitError::Invalid(_))));

        assert!(submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "buyer@example.com")).is_ok());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind(None).unwrap(), QuoteKind::Contact);
        assert_eq!(parse_kind(Some("Quote ")).unwrap(), QuoteKind::Quote);
        assert!(parse_kind(Some("quotation")).is_err());
    }

    #[test]
    fn test_storage_failure_is_not_a_client_error() {
        let db = setup();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE quote_requests;")?;
            Ok(())
        })
        .unwrap();
        let limiter = SubmissionLimiter::new(5, Duration::from_secs(3600));

        let err = submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "buyer@example.com")).unwrap_err();
        assert!(matches!(err, SubmitError::Storage(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_status_lifecycle() {
        let db = setup();
        let limiter = SubmissionLimiter::new(0, Duration::from_secs(60));
        let resp = submit_quote_request(&db, &limiter, request(QuoteKind::Contact, "buyer@example.com")).unwrap();

        let updated = update_quote_status(&db, resp.id, "answered").unwrap();
        assert_eq!(updated.status, QuoteStatus::Answered);
        assert!(update_quote_status(&db, resp.id, "archived").is_err());

        assert_eq!(list_quote_requests(&db, Some("answered"), 10, 0).unwrap().total, 1);
        assert_eq!(list_quote_requests(&db, Some("new"), 10, 0).unwrap().total, 0);

        delete_quote_request(&db, resp.id).unwrap();
        assert!(delete_quote_request(&db, resp.id).is_err());
    }
}
