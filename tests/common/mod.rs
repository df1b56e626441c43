//! Shared fixtures: a model run folder laid out like `gdx2sqlite` exports.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROPERTIES: &str = "technologies,Name,colour1,colour2,Rank\n\
                              wind,Wind,tab:green,#2ca02c,1\n\
                              ocgt_extg,Existing OCGT,#d62728,#d62728,4\n\
                              ccgt,CCGT,tab:orange,#ff7f0e,2\n";

/// Writes the results database of one case. `scale` varies values per case.
pub fn write_results_db(path: &Path, scale: f64) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE capacity_factor (technologies TEXT, value REAL);
         CREATE TABLE generator_life (technologies TEXT, value REAL);
         CREATE TABLE generator_capex (technologies TEXT, value REAL);
         CREATE TABLE operating_profit_per_MW (technologies TEXT, value REAL);
         CREATE TABLE energy_provided_by_technology_percentage (technologies TEXT, value REAL);
         CREATE TABLE cost_vom (technologies TEXT, value REAL);
         CREATE TABLE units_built (technologies TEXT, value REAL);
         CREATE TABLE scalars (name TEXT, value REAL);",
    )
    .unwrap();

    let rows: [(&str, &str, Option<f64>); 15] = [
        ("capacity_factor", "ccgt", Some(0.5)),
        ("capacity_factor", "ocgt_extg", Some(0.05)),
        ("capacity_factor", "wind", Some(0.38)),
        ("capacity_factor", "solar", Some(0.22)),
        ("generator_life", "ccgt", Some(10.)),
        ("generator_life", "wind", Some(25.)),
        ("generator_capex", "ccgt", Some(100.)),
        ("generator_capex", "wind", Some(1500. * scale)),
        ("operating_profit_per_MW", "ccgt", Some(15.)),
        ("operating_profit_per_MW", "wind", Some(120.)),
        ("energy_provided_by_technology_percentage", "ccgt", Some(0.55)),
        ("energy_provided_by_technology_percentage", "wind", Some(0.45)),
        ("cost_vom", "ocgt_extg", Some(12.5)),
        ("units_built", "ccgt", Some(2.)),
        ("units_built", "ocgt_extg", Some(1.)),
    ];
    for (table, tech, value) in rows {
        conn.execute(
            &format!("INSERT INTO {table} (technologies, value) VALUES (?1, ?2)"),
            rusqlite::params![tech, value],
        )
        .unwrap();
    }
    conn.execute_batch("INSERT INTO units_built VALUES ('wind', 3), ('solar', NULL);")
        .unwrap();
    conn.execute(
        "INSERT INTO scalars VALUES ('volume_weighted_energy_price', ?1), ('hours_of_unserved', ?2)",
        rusqlite::params![80. * scale, 3. * scale],
    )
    .unwrap();
}

/// Hours in the dispatch fixture, longer than the default chart window.
pub const DISPATCH_HOURS: i64 = 200;

/// Writes the dispatch database of one case: hourly prices with a single
/// scarcity hour, and per-technology dispatch and committed capacity.
pub fn write_dispatch_db(path: &Path, technologies: &[&str]) {
    let mut conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE post_energy_price (hours TEXT, value REAL);
         CREATE TABLE post_power_from_technology (hours TEXT, technologies TEXT, value REAL);
         CREATE TABLE post_committed_capacity_in_scenario (hours TEXT, technologies TEXT, value REAL);",
    )
    .unwrap();

    let tx = conn.transaction().unwrap();
    for hour in 1..=DISPATCH_HOURS {
        let price = if hour == 100 { 14000. } else { 40. + (hour % 24) as f64 * 3. - 30. };
        tx.execute(
            "INSERT INTO post_energy_price VALUES (?1, ?2)",
            rusqlite::params![hour.to_string(), price],
        )
        .unwrap();
        for (idx, tech) in technologies.iter().enumerate() {
            let power = 100. * (idx + 1) as f64 + (hour % 12) as f64 * 5.;
            tx.execute(
                "INSERT INTO post_power_from_technology VALUES (?1, ?2, ?3)",
                rusqlite::params![hour.to_string(), tech, power],
            )
            .unwrap();
            tx.execute(
                "INSERT INTO post_committed_capacity_in_scenario VALUES (?1, ?2, ?3)",
                rusqlite::params![hour.to_string(), tech, power * 1.2],
            )
            .unwrap();
        }
    }
    tx.commit().unwrap();
}

/// Creates a run folder with the given cases and a properties file next to it.
/// Returns `(run folder, properties path)`.
pub fn run_folder(root: &Path, cases: &[&str]) -> (PathBuf, PathBuf) {
    let folder = root.join("2020-04-12");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("list_of_cases.csv"), cases.join("\n") + "\n").unwrap();
    for (idx, case) in cases.iter().enumerate() {
        let case_dir = folder.join(case);
        fs::create_dir_all(&case_dir).unwrap();
        write_results_db(&case_dir.join("output_results.db"), 1. + idx as f64);
        write_dispatch_db(&case_dir.join("output_dispatch.db"), &["wind", "ccgt", "ocgt_extg"]);
    }

    let properties = root.join("generator_properties.csv");
    fs::write(&properties, PROPERTIES).unwrap();
    (folder, properties)
}
