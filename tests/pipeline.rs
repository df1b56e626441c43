mod common;

use case_charts::config::{ChartToggles, RunConfig};
use case_charts::runner::{generator_table_file_name, Chart, Runner};
use std::fs;

fn table_config(properties: std::path::PathBuf) -> RunConfig {
    RunConfig {
        properties,
        charts: ChartToggles::all(false),
        ..RunConfig::default()
    }
}

fn read_rows(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|rec| rec.unwrap().iter().map(String::from).collect())
        .collect()
}

#[test]
fn writes_enriched_generator_table_per_case() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base", "high_capex"]);
    let config = table_config(properties);

    Runner::new(&folder, &config).run().unwrap();
    assert!(folder.join("outputs").is_dir());

    let rows = read_rows(&folder.join(generator_table_file_name("base")));
    assert_eq!(
        rows[0],
        vec![
            "technologies",
            "capacity_factor",
            "generator_life",
            "generator_capex",
            "operating_profit_per_MW",
            "energy_provided_by_technology_percentage",
            "cost_vom",
            "units_built",
            "New Build",
            "IRR",
            "Name",
            "colour1",
            "colour2",
            "Rank",
        ]
    );

    // solar has no units built; rows follow rank
    let techs: Vec<&str> = rows[1..].iter().map(|row| row[0].as_str()).collect();
    assert_eq!(techs, vec!["wind", "ccgt", "ocgt_extg"]);

    let ccgt = &rows[2];
    assert_eq!(ccgt[1], "50.0");
    assert_eq!(ccgt[6], "0.0");
    assert_eq!(ccgt[8], "True");
    assert_eq!(ccgt[9], "8.14");
    assert_eq!(ccgt[10], "CCGT");
    assert_eq!(ccgt[13], "2.0");

    let ocgt = &rows[3];
    assert_eq!(ocgt[6], "12.5");
    assert_eq!(ocgt[8], "False");
    assert_eq!(ocgt[9], "", "IRR without capex is undefined");

    assert!(folder.join(generator_table_file_name("high_capex")).is_file());
}

#[test]
fn rerun_overwrites_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    let config = table_config(properties);
    let runner = Runner::new(&folder, &config);

    runner.run().unwrap();
    let first = fs::read_to_string(folder.join(generator_table_file_name("base"))).unwrap();
    runner.run().unwrap();
    let second = fs::read_to_string(folder.join(generator_table_file_name("base"))).unwrap();
    assert_eq!(first, second);

    let entries = fs::read_dir(&folder)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("generator_df_")
        })
        .count();
    assert_eq!(entries, 1);
}

#[test]
fn unknown_technology_keeps_empty_presentation() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    fs::write(
        &properties,
        "technologies,Name,colour1,colour2,Rank\nccgt,CCGT,red,red,1\n",
    )
    .unwrap();
    let config = table_config(properties);

    Runner::new(&folder, &config).run().unwrap();
    let rows = read_rows(&folder.join(generator_table_file_name("base")));
    assert_eq!(rows[1][0], "ccgt");
    assert!(rows[2..].iter().all(|row| row[10..].iter().all(String::is_empty)));
}

#[test]
fn missing_case_results_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    fs::write(folder.join("list_of_cases.csv"), "base\nghost\n").unwrap();
    let config = table_config(properties);

    let err = Runner::new(&folder, &config).run().unwrap_err();
    assert!(format!("{err:#}").contains("ghost"), "{err:#}");
}

#[test]
fn missing_metric_table_aborts_the_case() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    let mut config = table_config(properties);
    config.symbols.push("capacity_credit".to_string());

    let err = Runner::new(&folder, &config).run().unwrap_err();
    assert!(format!("{err:#}").contains("capacity_credit"), "{err:#}");
}

fn chart_files(outputs: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(outputs)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn renders_every_chart() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    let config = RunConfig {
        properties,
        charts: ChartToggles::all(true),
        ..RunConfig::default()
    };
    let runner = Runner::new(&folder, &config);

    runner.run().unwrap();
    let charts = chart_files(runner.outputs());
    assert_eq!(
        charts,
        vec![
            "average_price_central.png",
            "capacity_factor_base.png",
            "dispatch_base.png",
            "energy_percentage_base.png",
            "irr_base.png",
            "operating_profit_base.png",
            "price_duration_curve_base.png",
            "units_committed_base.png",
            "unserved_central.png",
        ]
    );
    for chart in &charts {
        assert!(fs::metadata(runner.outputs().join(chart)).unwrap().len() > 0, "{chart}");
    }

    runner.run().unwrap();
    assert_eq!(chart_files(runner.outputs()).len(), charts.len());
}

#[test]
fn dispatch_technology_without_properties_aborts_the_chart() {
    let dir = tempfile::tempdir().unwrap();
    let (folder, properties) = common::run_folder(dir.path(), &["base"]);
    fs::write(
        &properties,
        "technologies,Name,colour1,colour2,Rank
wind,Wind,green,green,1
ccgt,CCGT,red,red,2
",
    )
    .unwrap();
    let mut config = table_config(properties);
    config.charts.dispatch = true;
    let runner = Runner::new(&folder, &config);

    let err = runner.run().unwrap_err();
    assert!(format!("{err:#}").contains("ocgt_extg"), "{err:#}");
    assert!(!runner.outputs().join(Chart::Dispatch.file_name("base")).exists());
}
