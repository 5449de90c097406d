//! Utility to load the standard units of measure into the database

use exportdesk::config;
use exportdesk::db::{migrations, Database};
use exportdesk::pricing::{seed_standard_measures, STANDARD_FAMILIES};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config::database_path();
    println!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&db_path)?;

    database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let summary = database.with_conn(|conn| seed_standard_measures(conn))?;

    println!("Standard measures loaded:");
    for family in STANDARD_FAMILIES {
        let units: Vec<&str> = family.measures.iter().map(|m| m.short_name).collect();
        println!("  {} ({}): {}", family.name, family.base_unit, units.join(", "));
    }
    println!("  Families created: {}", summary.families_created);
    println!("  Measures created: {}", summary.measures_created);
    println!("  Conversion rows written: {}", summary.compatibilities_written);

    Ok(())
}
