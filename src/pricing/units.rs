//! Standard units of measure
//!
//! The families and measures an export catalog needs out of the box, and the
//! seeding routine that loads them together with their compatibility rows.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::DbResult;
use crate::models::{Measure, MeasureCompatibility, MeasureFamily};

// ============================================================================
// Weight Conversion Constants (to grams)
// ============================================================================

pub const G_PER_KG: f64 = 1000.0;
pub const G_PER_LB: f64 = 453.592;
pub const G_PER_OZ: f64 = 28.3495;
pub const G_PER_TONNE: f64 = 1_000_000.0;

// ============================================================================
// Volume Conversion Constants (to milliliters)
// ============================================================================

pub const ML_PER_LITER: f64 = 1000.0;
pub const ML_PER_GALLON: f64 = 3785.41;
pub const ML_PER_FL_OZ: f64 = 29.5735;

/// A measure definition used for seeding
#[derive(Debug, Clone, Copy)]
pub struct StandardMeasure {
    pub name: &'static str,
    pub short_name: &'static str,
    pub symbol: &'static str,
    pub factor_to_base: f64,
}

/// A family definition with its measures in display order
#[derive(Debug, Clone, Copy)]
pub struct StandardFamily {
    pub name: &'static str,
    pub base_unit: &'static str,
    pub measures: &'static [StandardMeasure],
}

const fn m(name: &'static str, short_name: &'static str, symbol: &'static str, factor_to_base: f64) -> StandardMeasure {
    StandardMeasure { name, short_name, symbol, factor_to_base }
}

pub const STANDARD_FAMILIES: &[StandardFamily] = &[
    StandardFamily {
        name: "weight",
        base_unit: "g",
        measures: &[
            m("Kilogram", "kg", "kg", G_PER_KG),
            m("Gram", "g", "g", 1.0),
            m("Pound", "lb", "lb", G_PER_LB),
            m("Ounce", "oz", "oz", G_PER_OZ),
            m("Metric ton", "t", "t", G_PER_TONNE),
        ],
    },
    StandardFamily {
        name: "volume",
        base_unit: "ml",
        measures: &[
            m("Liter", "l", "L", ML_PER_LITER),
            m("Milliliter", "ml", "mL", 1.0),
            m("Gallon (US)", "gal", "gal", ML_PER_GALLON),
            m("Fluid ounce", "fl oz", "fl oz", ML_PER_FL_OZ),
        ],
    },
    StandardFamily {
        name: "count",
        base_unit: "each",
        measures: &[
            m("Each", "each", "ea", 1.0),
            m("Dozen", "dz", "dz", 12.0),
            m("Gross", "gr", "gr", 144.0),
        ],
    },
];

/// Compatibility factor between two measures of the same family.
///
/// Follows `price_in_to = price_in_from / factor`: one `from` unit holds
/// `factor` `to` units. `None` when the families differ.
pub fn compatibility_factor(from: &Measure, to: &Measure) -> Option<f64> {
    if from.family_id != to.family_id || to.factor_to_base <= 0.0 {
        return None;
    }
    Some(from.factor_to_base / to.factor_to_base)
}

/// What a seeding run added
#[derive(Debug, Default, Clone, Serialize)]
pub struct SeedSummary {
    pub families_created: usize,
    pub measures_created: usize,
    pub compatibilities_written: usize,
}

/// Load the standard families, measures and pairwise compatibility rows.
///
/// Existing families and measures (matched by name / short name) are left
/// alone, so running it twice adds nothing.
pub fn seed_standard_measures(conn: &Connection) -> DbResult<SeedSummary> {
    let tx = conn.unchecked_transaction()?;
    let mut summary = SeedSummary::default();

    for family_def in STANDARD_FAMILIES {
        let family = match MeasureFamily::get_by_name(&tx, family_def.name)? {
            Some(existing) => existing,
            None => {
                summary.families_created += 1;
                MeasureFamily::create(&tx, family_def.name, family_def.base_unit)?
            }
        };

        for (index, def) in family_def.measures.iter().enumerate() {
            let inserted = tx.execute(
                r#"
                INSERT OR IGNORE INTO measures (name, short_name, symbol, family_id, factor_to_base, sort_order)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![def.name, def.short_name, def.symbol, family.id, def.factor_to_base, index as i64],
            )?;
            summary.measures_created += inserted;
        }

        let measures = Measure::list_for_family(&tx, family.id, false)?;
        for from in &measures {
            for to in &measures {
                if from.id == to.id || MeasureCompatibility::get(&tx, from.id, to.id)?.is_some() {
                    continue;
                }
                if let Some(factor) = compatibility_factor(from, to) {
                    MeasureCompatibility::upsert(&tx, from.id, to.id, factor)?;
                    summary.compatibilities_written += 1;
                }
            }
        }
    }

    tx.commit()?;

    tracing::info!(
        families = summary.families_created,
        measures = summary.measures_created,
        compatibilities = summary.compatibilities_written,
        "Seeded standard measures"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn measure_by_short(conn: &Connection, short: &str) -> Measure {
        let id: i64 = conn
            .query_row("SELECT id FROM measures WHERE short_name = ?1", [short], |row| row.get(0))
            .unwrap();
        Measure::get_by_id(conn, id).unwrap().unwrap()
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = setup();
        let first = seed_standard_measures(&conn).unwrap();
        assert_eq!(first.families_created, 3);
        assert_eq!(first.measures_created, 12);
        // n * (n - 1) directed pairs per family
        assert_eq!(first.compatibilities_written, 5 * 4 + 4 * 3 + 3 * 2);

        let second = seed_standard_measures(&conn).unwrap();
        assert_eq!(second.families_created, 0);
        assert_eq!(second.measures_created, 0);
        assert_eq!(second.compatibilities_written, 0);
    }

    #[test]
    fn test_kg_to_lb_factor() {
        let conn = setup();
        seed_standard_measures(&conn).unwrap();
        let kg = measure_by_short(&conn, "kg");
        let lb = measure_by_short(&conn, "lb");

        let factor = MeasureCompatibility::factor(&conn, kg.id, lb.id).unwrap().unwrap();
        assert!((factor - 2.2046).abs() < 0.0001);

        let back = MeasureCompatibility::factor(&conn, lb.id, kg.id).unwrap().unwrap();
        assert!((factor * back - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compatibility_factor_rejects_other_family() {
        let conn = setup();
        seed_standard_measures(&conn).unwrap();
        let kg = measure_by_short(&conn, "kg");
        let litre = measure_by_short(&conn, "l");
        assert_eq!(compatibility_factor(&kg, &litre), None);
    }

    #[test]
    fn test_seed_keeps_manual_factor() {
        let conn = setup();
        seed_standard_measures(&conn).unwrap();
        let kg = measure_by_short(&conn, "kg");
        let lb = measure_by_short(&conn, "lb");
        MeasureCompatibility::upsert(&conn, kg.id, lb.id, 2.2).unwrap();

        seed_standard_measures(&conn).unwrap();
        assert_eq!(MeasureCompatibility::factor(&conn, kg.id, lb.id).unwrap(), Some(2.2));
    }
}
