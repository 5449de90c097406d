//! Measure MCP Tools
//!
//! Measure families, measures and the compatibility table.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Measure, MeasureCompatibility, MeasureCreate, MeasureFamily, MeasureUpdate};
use crate::pricing::{self, SeedSummary};
use crate::tools::validation;

#[derive(Debug, Serialize)]
pub struct ListFamiliesResponse {
    pub families: Vec<MeasureFamily>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ListMeasuresResponse {
    pub measures: Vec<Measure>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MeasureDetail {
    #[serde(flatten)]
    pub measure: Measure,
    pub family: Option<MeasureFamily>,
    pub compatibilities: Vec<MeasureCompatibility>,
    pub default_for_products: i64,
}

#[derive(Debug, Serialize)]
pub struct CompatibilityResponse {
    pub from_measure_id: i64,
    pub to_measure_id: i64,
    pub factor: f64,
    /// Reverse row written alongside, if requested
    pub reverse_factor: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RemoveCompatibilityResponse {
    pub success: bool,
    pub removed: usize,
}

pub fn add_measure_family(db: &Database, name: &str, base_unit: &str) -> Result<MeasureFamily, String> {
    let name = validation::required_text(name, "Family name")?.to_lowercase();
    let base_unit = validation::required_text(base_unit, "base_unit")?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if MeasureFamily::get_by_name(&conn, &name)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("Measure family '{}' already exists", name));
    }

    MeasureFamily::create(&conn, &name, &base_unit)
        .map_err(|e| format!("Failed to create measure family: {}", e))
}

pub fn list_measure_families(db: &Database) -> Result<ListFamiliesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let families = MeasureFamily::list(&conn).map_err(|e| format!("Failed to list families: {}", e))?;
    let total = families.len();
    Ok(ListFamiliesResponse { families, total })
}

pub fn add_measure(db: &Database, mut data: MeasureCreate) -> Result<Measure, String> {
    data.name = validation::required_text(&data.name, "Measure name")?;
    data.short_name = validation::required_text(&data.short_name, "short_name")?;
    data.symbol = validation::required_text(&data.symbol, "symbol")?;
    data.factor_to_base = validation::positive_factor(data.factor_to_base, "factor_to_base")?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if MeasureFamily::get_by_id(&conn, data.family_id)
        .map_err(|e| format!("Database error: {}", e))?
        .is_none()
    {
        return Err(format!("Measure family not found with id: {}", data.family_id));
    }

    let measure = Measure::create(&conn, &data).map_err(|e| format!("Failed to create measure: {}", e))?;
    tracing::info!(id = measure.id, short_name = %measure.short_name, "Measure created");
    Ok(measure)
}

pub fn get_measure(db: &Database, id: i64) -> Result<Option<MeasureDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(measure) = Measure::get_by_id(&conn, id).map_err(|e| format!("Failed to get measure: {}", e))? else {
        return Ok(None);
    };

    let family = MeasureFamily::get_by_id(&conn, measure.family_id)
        .map_err(|e| format!("Failed to get family: {}", e))?;
    let compatibilities = MeasureCompatibility::list_for_measure(&conn, id)
        .map_err(|e| format!("Failed to get compatibilities: {}", e))?;
    let default_for_products = Measure::default_for_product_count(&conn, id)
        .map_err(|e| format!("Failed to count products: {}", e))?;

    Ok(Some(MeasureDetail {
        measure,
        family,
        compatibilities,
        default_for_products,
    }))
}

pub fn list_measures(db: &Database, family_id: Option<i64>, active_only: bool) -> Result<ListMeasuresResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let measures = match family_id {
        Some(fid) => Measure::list_for_family(&conn, fid, active_only),
        None => Measure::list(&conn, active_only),
    }
    .map_err(|e| format!("Failed to list measures: {}", e))?;

    let total = measures.len();
    Ok(ListMeasuresResponse { measures, total })
}

pub fn update_measure(db: &Database, id: i64, mut data: MeasureUpdate) -> Result<Measure, String> {
    if let Some(factor) = data.factor_to_base {
        data.factor_to_base = Some(validation::positive_factor(factor, "factor_to_base")?);
    }
    if let Some(ref name) = data.name {
        data.name = Some(validation::required_text(name, "Measure name")?);
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Measure::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update measure: {}", e))?
        .ok_or_else(|| format!("Measure not found with id: {}", id))
}

/// Deactivate a measure. Existing prices and products keep referencing it.
pub fn deactivate_measure(db: &Database, id: i64) -> Result<Measure, String> {
    let update = MeasureUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    let measure = update_measure(db, id, update)?;
    tracing::info!(id, "Measure deactivated");
    Ok(measure)
}

/// Set the factor for `from -> to`; optionally write the reciprocal row too
pub fn set_measure_compatibility(
    db: &Database,
    from_measure_id: i64,
    to_measure_id: i64,
    factor: f64,
    bidirectional: bool,
) -> Result<CompatibilityResponse, String> {
    let factor = validation::positive_factor(factor, "factor")?;
    if from_measure_id == to_measure_id {
        return Err("A measure cannot be made compatible with itself".to_string());
    }

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    for id in [from_measure_id, to_measure_id] {
        if Measure::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))?.is_none() {
            return Err(format!("Measure not found with id: {}", id));
        }
    }

    let tx = conn.transaction().map_err(|e| format!("Database error: {}", e))?;
    let row = MeasureCompatibility::upsert(&tx, from_measure_id, to_measure_id, factor)
        .map_err(|e| format!("Failed to set compatibility: {}", e))?;
    let reverse_factor = if bidirectional {
        let reverse = MeasureCompatibility::upsert(&tx, to_measure_id, from_measure_id, 1.0 / factor)
            .map_err(|e| format!("Failed to set reverse compatibility: {}", e))?;
        Some(reverse.factor)
    } else {
        None
    };
    tx.commit().map_err(|e| format!("Failed to commit: {}", e))?;

    Ok(CompatibilityResponse {
        from_measure_id: row.from_measure_id,
        to_measure_id: row.to_measure_id,
        factor: row.factor,
        reverse_factor,
    })
}

pub fn list_measure_compatibility(db: &Database, measure_id: i64) -> Result<Vec<MeasureCompatibility>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    MeasureCompatibility::list_for_measure(&conn, measure_id)
        .map_err(|e| format!("Failed to list compatibilities: {}", e))
}

pub fn remove_measure_compatibility(
    db: &Database,
    from_measure_id: i64,
    to_measure_id: i64,
    bidirectional: bool,
) -> Result<RemoveCompatibilityResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let mut removed = 0;
    if MeasureCompatibility::delete(&conn, from_measure_id, to_measure_id)
        .map_err(|e| format!("Failed to remove compatibility: {}", e))?
    {
        removed += 1;
    }
    if bidirectional
        && MeasureCompatibility::delete(&conn, to_measure_id, from_measure_id)
            .map_err(|e| format!("Failed to remove compatibility: {}", e))?
    {
        removed += 1;
    }

    if removed == 0 {
        return Err(format!(
            "No compatibility between measures {} and {}",
            from_measure_id, to_measure_id
        ));
    }
    Ok(RemoveCompatibilityResponse { success: true, removed })
}

/// Load the standard weight/volume/count catalog
pub fn seed_standard_measures(db: &Database) -> Result<SeedSummary, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    pricing::seed_standard_measures(&conn).map_err(|e| format!("Failed to seed measures: {}", e))
}
