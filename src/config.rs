//! TOML run configuration. Every field defaults to the layout of a
//! standard model run folder, so an empty file is a valid configuration.

use crate::compute::{symbols, HourWindow};
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Case manifest, relative to the run folder.
    pub case_list: PathBuf,
    /// Chart directory, relative to the run folder.
    pub outputs_dir: PathBuf,
    /// Generator properties lookup, relative to the working directory.
    pub properties: PathBuf,
    /// Dispatch database name inside each case folder.
    pub dispatch_file: String,
    /// Results database name inside each case folder.
    pub results_file: String,
    /// Per-technology result symbols, joined onto the first.
    pub symbols: Vec<String>,
    pub dispatch_window: HourWindow,
    pub duration_curve: DurationCurveConfig,
    pub scenarios: Vec<ScenarioGroup>,
    pub charts: ChartToggles,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            case_list: PathBuf::from("list_of_cases.csv"),
            outputs_dir: PathBuf::from("outputs"),
            properties: PathBuf::from("other_files").join("generator_properties.csv"),
            dispatch_file: "output_dispatch.db".to_string(),
            results_file: "output_results.db".to_string(),
            symbols: [
                symbols::CAPACITY_FACTOR,
                symbols::GENERATOR_LIFE,
                symbols::GENERATOR_CAPEX,
                symbols::OPERATING_PROFIT,
                symbols::ENERGY_PERCENTAGE,
                symbols::COST_VOM,
                symbols::UNITS_BUILT,
            ]
            .map(String::from)
            .to_vec(),
            dispatch_window: HourWindow { start: 1, end: 120 },
            duration_curve: DurationCurveConfig::default(),
            scenarios: vec![
                ScenarioGroup {
                    name: "central".to_string(),
                    start: 0,
                    end: 4,
                },
                ScenarioGroup {
                    name: "step_change".to_string(),
                    start: 4,
                    end: 8,
                },
            ],
            charts: ChartToggles::default(),
        }
    }
}

/// Axes of the two-panel price duration curve.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DurationCurveConfig {
    pub hours: usize,
    /// Zoomed panel for scarcity prices.
    pub upper: [f64; 2],
    /// Panel for the normal price range.
    pub lower: [f64; 2],
}

impl Default for DurationCurveConfig {
    fn default() -> Self {
        Self {
            hours: 8760,
            upper: [13000., 15000.],
            lower: [-275., 275.],
        }
    }
}

/// Cases compared side by side: the `[start, end)` slice of the case list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioGroup {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartToggles {
    pub price_duration_curve: bool,
    pub operating_profit: bool,
    pub irr: bool,
    pub capacity_factor: bool,
    pub energy_percentage: bool,
    pub dispatch: bool,
    pub committed_capacity: bool,
    pub average_price: bool,
    pub unserved_hours: bool,
}

impl Default for ChartToggles {
    fn default() -> Self {
        Self::all(true)
    }
}

impl ChartToggles {
    pub fn all(enabled: bool) -> Self {
        Self {
            price_duration_curve: enabled,
            operating_profit: enabled,
            irr: enabled,
            capacity_factor: enabled,
            energy_percentage: enabled,
            dispatch: enabled,
            committed_capacity: enabled,
            average_price: enabled,
            unserved_hours: enabled,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.symbols.is_empty(), "symbols must not be empty");
        ensure!(
            self.dispatch_window.start <= self.dispatch_window.end,
            "dispatch_window start {} is after end {}",
            self.dispatch_window.start,
            self.dispatch_window.end
        );
        let curve = &self.duration_curve;
        ensure!(curve.hours > 0, "duration_curve.hours must be > 0");
        for (label, [lo, hi]) in [("upper", curve.upper), ("lower", curve.lower)] {
            ensure!(lo < hi, "duration_curve.{label} must be ascending, got [{lo}, {hi}]");
        }
        for group in &self.scenarios {
            ensure!(
                group.start <= group.end,
                "scenario `{}` start {} is after end {}",
                group.name,
                group.start,
                group.end
            );
        }
        Ok(())
    }
}
