//! ### Runner
//! Drives a whole model run folder: cross-case comparisons first, then
//! every case in manifest order. Cases share nothing but the generator
//! properties lookup.

use crate::compute::{self, symbols, Generator, StackedSeries};
use crate::config::{RunConfig, ScenarioGroup};
use crate::convert::{self, Properties};
use crate::graph::Graphing;
use crate::results::ResultsDb;
use anyhow::Context;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Charts rendered per case or per scenario, by file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    PriceDurationCurve,
    OperatingProfit,
    Irr,
    CapacityFactor,
    EnergyPercentage,
    Dispatch,
    CommittedCapacity,
    AveragePrice,
    UnservedHours,
}

impl Chart {
    pub fn prefix(self) -> &'static str {
        match self {
            Chart::PriceDurationCurve => "price_duration_curve",
            Chart::OperatingProfit => "operating_profit",
            Chart::Irr => "irr",
            Chart::CapacityFactor => "capacity_factor",
            Chart::EnergyPercentage => "energy_percentage",
            Chart::Dispatch => "dispatch",
            Chart::CommittedCapacity => "units_committed",
            Chart::AveragePrice => "average_price",
            Chart::UnservedHours => "unserved",
        }
    }

    /// `<chart>_<case>.png`, or `<chart>_<scenario>.png` for comparisons.
    pub fn file_name(self, name: &str) -> String {
        format!("{}_{name}.png", self.prefix())
    }
}

pub fn generator_table_file_name(case: &str) -> String {
    format!("generator_df_{case}.csv")
}

/// Creates the output directory if needed. Returns whether it was created.
pub fn ensure_output_dir(path: &Path) -> anyhow::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory {}", path.display()))?;
    info!("Created output directory {}", path.display());
    Ok(true)
}

pub struct Runner<'a> {
    folder: &'a Path,
    config: &'a RunConfig,
    outputs: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(folder: &'a Path, config: &'a RunConfig) -> Self {
        Self {
            folder,
            config,
            outputs: folder.join(&config.outputs_dir),
        }
    }

    pub fn outputs(&self) -> &Path {
        &self.outputs
    }

    fn case_file(&self, case: &str, file: &str) -> PathBuf {
        self.folder.join(case).join(file)
    }

    fn chart_path(&self, chart: Chart, name: &str) -> PathBuf {
        self.outputs.join(chart.file_name(name))
    }

    pub fn run(&self) -> anyhow::Result<()> {
        ensure_output_dir(&self.outputs)?;
        let cases = convert::read_case_list(&self.folder.join(&self.config.case_list))?;
        info!("Found {} cases in {}", cases.len(), self.folder.display());
        let properties = convert::read_properties(&self.config.properties)?;

        for group in &self.config.scenarios {
            let members = scenario_cases(&cases, group);
            if members.is_empty() {
                warn!("Scenario `{}` has no cases, skipping", group.name);
                continue;
            }
            self.compare_cases(&group.name, members)?;
        }

        for case in &cases {
            self.run_case(case, &properties)?;
        }
        Ok(())
    }

    /// Cross-case bar charts for one scenario group.
    pub fn compare_cases(&self, name: &str, cases: &[String]) -> anyhow::Result<()> {
        let charts = &self.config.charts;
        if !charts.average_price && !charts.unserved_hours {
            return Ok(());
        }
        ensure_output_dir(&self.outputs)?;

        let mut prices = Vec::with_capacity(cases.len());
        let mut unserved = Vec::with_capacity(cases.len());
        for case in cases {
            let db = ResultsDb::open(&self.case_file(case, &self.config.results_file))?;
            if charts.average_price {
                prices.push((case.clone(), db.scalar(symbols::AVERAGE_PRICE)?));
            }
            if charts.unserved_hours {
                unserved.push((case.clone(), db.scalar(symbols::UNSERVED_HOURS)?));
            }
        }

        if charts.average_price {
            Graphing::new(&self.chart_path(Chart::AveragePrice, name)).average_price(&prices)?;
            info!("Plotted average price for {name}");
        }
        if charts.unserved_hours {
            Graphing::new(&self.chart_path(Chart::UnservedHours, name)).unserved_hours(&unserved)?;
            info!("Plotted hours of LOR for {name}");
        }
        Ok(())
    }

    pub fn run_case(&self, case: &str, properties: &Properties) -> anyhow::Result<()> {
        info!("Processing case {case}");
        let results = ResultsDb::open(&self.case_file(case, &self.config.results_file))?;
        let generators = compute::build_generators(&results, &self.config.symbols, properties)
            .with_context(|| format!("Failed to build generator table for {case}"))?;

        convert::write_generator_table(
            &self.folder.join(generator_table_file_name(case)),
            &self.config.symbols,
            &generators,
        )?;

        let charts = &self.config.charts;
        if charts.dispatch || charts.committed_capacity || charts.price_duration_curve {
            let dispatch = ResultsDb::open(&self.case_file(case, &self.config.dispatch_file))?;
            if charts.dispatch {
                self.stacked_chart(&dispatch, case, &generators, Chart::Dispatch)?;
            }
            if charts.committed_capacity {
                self.stacked_chart(&dispatch, case, &generators, Chart::CommittedCapacity)?;
            }
            if charts.price_duration_curve {
                let curve = compute::duration_curve(&dispatch.hourly_values(symbols::ENERGY_PRICE)?);
                Graphing::new(&self.chart_path(Chart::PriceDurationCurve, case))
                    .price_duration_curve(&curve, &self.config.duration_curve)?;
                info!("Plotted price duration curve for {case}");
            }
        }

        if charts.operating_profit {
            Graphing::new(&self.chart_path(Chart::OperatingProfit, case)).operating_profit(&generators)?;
            info!("Plotted operating profit per MW for {case}");
        }
        if charts.irr {
            Graphing::new(&self.chart_path(Chart::Irr, case)).irr(&generators)?;
            info!("Plotted IRR for {case}");
        }
        if charts.capacity_factor {
            Graphing::new(&self.chart_path(Chart::CapacityFactor, case)).capacity_factor(&generators)?;
            info!("Plotted capacity factor for {case}");
        }
        if charts.energy_percentage {
            Graphing::new(&self.chart_path(Chart::EnergyPercentage, case))
                .energy_percentage(&generators)?;
            info!("Plotted energy percentage for {case}");
        }
        Ok(())
    }

    fn stacked_chart(
        &self,
        dispatch: &ResultsDb,
        case: &str,
        generators: &[Generator],
        chart: Chart,
    ) -> anyhow::Result<()> {
        let (symbol, y_desc) = match chart {
            Chart::Dispatch => (symbols::DISPATCH, "Dispatch (MW)"),
            _ => (symbols::COMMITTED_CAPACITY, "Committed Capacity (MW)"),
        };
        let window = self.config.dispatch_window;
        let stack = StackedSeries::pivot(&dispatch.hourly_technology_values(symbol)?, window, generators)
            .with_context(|| format!("Failed to arrange `{symbol}` for {case}"))?;
        let price = compute::windowed_series(&dispatch.hourly_values(symbols::ENERGY_PRICE)?, window);

        Graphing::new(&self.chart_path(chart, case)).stacked_with_price(&stack, &price, window, y_desc)?;
        info!("Plotted {} for {case}", chart.prefix().replace('_', " "));
        Ok(())
    }
}

/// The `[start, end)` slice of `cases`, shortened to what exists.
pub fn scenario_cases<'c>(cases: &'c [String], group: &ScenarioGroup) -> &'c [String] {
    let end = group.end.min(cases.len());
    let start = group.start.min(end);
    if (start, end) != (group.start, group.end) {
        warn!(
            "Scenario `{}` asks for cases {}..{} but only {} exist",
            group.name,
            group.start,
            group.end,
            cases.len()
        );
    }
    &cases[start..end]
}
