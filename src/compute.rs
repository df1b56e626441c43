//! ### Compute
//! Builds the per-technology generator table of a case from its results
//! database and shapes dispatch and price series for charting.

use crate::convert::{Presentation, Properties};
use crate::finance;
use crate::results::ResultsDb;
use anyhow::{anyhow, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::cmp::Ordering;

/// Result symbols read per technology.
pub mod symbols {
    pub const CAPACITY_FACTOR: &str = "capacity_factor";
    pub const GENERATOR_LIFE: &str = "generator_life";
    pub const GENERATOR_CAPEX: &str = "generator_capex";
    pub const OPERATING_PROFIT: &str = "operating_profit_per_MW";
    pub const ENERGY_PERCENTAGE: &str = "energy_provided_by_technology_percentage";
    pub const COST_VOM: &str = "cost_vom";
    pub const UNITS_BUILT: &str = "units_built";

    pub const DISPATCH: &str = "post_power_from_technology";
    pub const COMMITTED_CAPACITY: &str = "post_committed_capacity_in_scenario";
    pub const ENERGY_PRICE: &str = "post_energy_price";
    pub const AVERAGE_PRICE: &str = "volume_weighted_energy_price";
    pub const UNSERVED_HOURS: &str = "hours_of_unserved";

    /// Fractions reported as percentages once enriched.
    pub const PERCENTAGES: [&str; 2] = [CAPACITY_FACTOR, ENERGY_PERCENTAGE];
}

/// Substring marking a technology as an existing unit.
pub const EXISTING_MARKER: &str = "extg";

/// Requested metrics joined per technology, before any enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorTable {
    pub metrics: Vec<String>,
    pub rows: IndexMap<String, IndexMap<String, Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub technology: String,
    values: IndexMap<String, f64>,
    pub new_build: bool,
    /// Percent, NaN when the cash flows have no rate of return.
    pub irr: f64,
    pub presentation: Option<Presentation>,
}

impl Generator {
    pub fn value(&self, metric: &str) -> anyhow::Result<f64> {
        self.values
            .get(metric)
            .copied()
            .ok_or_else(|| anyhow!("Metric `{metric}` was not read for `{}`", self.technology))
    }

    pub fn presentation(&self) -> anyhow::Result<&Presentation> {
        self.presentation
            .as_ref()
            .ok_or_else(|| anyhow!("No generator properties for technology `{}`", self.technology))
    }
}

/// Left-joins the tables of `metrics` onto the first one by technology and
/// keeps only technologies with a value for units built.
pub fn combine_generator_data(
    db: &ResultsDb,
    metrics: &[impl AsRef<str>],
) -> anyhow::Result<GeneratorTable> {
    let metrics: Vec<String> = metrics.iter().map(|m| m.as_ref().to_string()).collect();
    let Some((base, rest)) = metrics.split_first() else {
        bail!("No metrics requested");
    };
    ensure!(
        metrics.iter().any(|m| m == symbols::UNITS_BUILT),
        "Metric list must include `{}`",
        symbols::UNITS_BUILT
    );

    let mut rows: IndexMap<String, IndexMap<String, Option<f64>>> = db
        .technology_values(base)?
        .into_iter()
        .map(|(tech, value)| (tech, IndexMap::from([(base.clone(), value)])))
        .collect();

    for metric in rest {
        let table = db.technology_values(metric)?;
        for (tech, row) in rows.iter_mut() {
            row.insert(metric.clone(), table.get(tech).copied().flatten());
        }
    }

    rows.retain(|_, row| row.get(symbols::UNITS_BUILT).copied().flatten().is_some());
    Ok(GeneratorTable { metrics, rows })
}

pub fn is_new_build(technology: &str) -> bool {
    !technology.contains(EXISTING_MARKER)
}

impl GeneratorTable {
    /// Fills missing values with zero, then tags new builds and computes IRR.
    pub fn into_generators(self) -> anyhow::Result<Vec<Generator>> {
        for required in [
            symbols::GENERATOR_CAPEX,
            symbols::OPERATING_PROFIT,
            symbols::GENERATOR_LIFE,
        ] {
            ensure!(
                self.metrics.iter().any(|m| m == required),
                "IRR needs metric `{required}`"
            );
        }

        let mut generators = Vec::with_capacity(self.rows.len());
        for (technology, row) in self.rows {
            let values: IndexMap<String, f64> = row
                .into_iter()
                .map(|(metric, value)| (metric, value.unwrap_or(0.)))
                .collect();
            let life = values[symbols::GENERATOR_LIFE];
            ensure!(
                life <= finance::MAX_LIFE_YEARS,
                "Generator life {life} of `{technology}` exceeds {} years",
                finance::MAX_LIFE_YEARS
            );
            let irr = finance::irr_percent(
                values[symbols::GENERATOR_CAPEX],
                values[symbols::OPERATING_PROFIT],
                life,
            );
            debug!("{technology} IRR {irr}");
            generators.push(Generator {
                new_build: is_new_build(&technology),
                technology,
                values,
                irr,
                presentation: None,
            });
        }
        Ok(generators)
    }
}

/// Left-joins presentation metadata by technology.
pub fn attach_properties(generators: &mut [Generator], properties: &Properties) {
    for gen in generators {
        gen.presentation = properties.get(&gen.technology).cloned();
    }
}

/// Expresses fractional metrics as percentages.
pub fn scale_percentages(generators: &mut [Generator]) {
    for gen in generators {
        for metric in symbols::PERCENTAGES {
            if let Some(value) = gen.values.get_mut(metric) {
                *value *= 100.;
            }
        }
    }
}

/// Ascending rank, missing ranks last.
fn rank_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders by presentation rank. Generators without a presentation or a
/// rank go last.
pub fn sort_by_rank(generators: &mut [Generator]) {
    generators.sort_by(|a, b| {
        rank_order(
            a.presentation.as_ref().and_then(|p| p.rank),
            b.presentation.as_ref().and_then(|p| p.rank),
        )
    });
}

/// The full enriched generator table of one case.
pub fn build_generators(
    db: &ResultsDb,
    metrics: &[impl AsRef<str>],
    properties: &Properties,
) -> anyhow::Result<Vec<Generator>> {
    let mut generators = combine_generator_data(db, metrics)?.into_generators()?;
    attach_properties(&mut generators, properties);
    scale_percentages(&mut generators);
    sort_by_rank(&mut generators);
    Ok(generators)
}

/// Inclusive range of model hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourWindow {
    pub start: i64,
    pub end: i64,
}

impl HourWindow {
    pub fn contains(&self, hour: i64) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

pub struct StackColumn {
    pub technology: String,
    pub name: String,
    pub colour: String,
    pub values: Vec<f64>,
}

/// Hour-by-technology matrix with columns in stacking order.
pub struct StackedSeries {
    pub hours: Vec<i64>,
    pub columns: Vec<StackColumn>,
}

impl StackedSeries {
    /// Pivots `(hour, technology, value)` rows inside `window`. Empty cells
    /// are zero and columns follow presentation rank, ties by technology and
    /// unranked technologies on top.
    pub fn pivot(
        rows: &[(i64, String, Option<f64>)],
        window: HourWindow,
        generators: &[Generator],
    ) -> anyhow::Result<Self> {
        let in_window: Vec<_> = rows.iter().filter(|(hour, _, _)| window.contains(*hour)).collect();

        let mut hours: Vec<i64> = in_window.iter().map(|(hour, _, _)| *hour).collect();
        hours.sort_unstable();
        hours.dedup();
        let mut techs: Vec<&str> = in_window
            .iter()
            .map(|(_, tech, _)| tech.as_str())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        techs.sort_unstable();

        let mut cells: IndexMap<(i64, &str), f64> = IndexMap::with_capacity(in_window.len());
        for (hour, tech, value) in &in_window {
            if cells.insert((*hour, tech.as_str()), value.unwrap_or(0.)).is_some() {
                bail!("Duplicate entry for technology `{tech}` at hour {hour}");
            }
        }

        let mut columns = Vec::with_capacity(techs.len());
        for tech in techs {
            let presentation = generators
                .iter()
                .find(|gen| gen.technology == tech)
                .ok_or_else(|| anyhow!("Technology `{tech}` has no generator record"))?
                .presentation()?;
            let values = hours
                .iter()
                .map(|hour| cells.get(&(*hour, tech)).copied().unwrap_or(0.))
                .collect();
            columns.push((
                presentation.rank,
                StackColumn {
                    technology: tech.to_string(),
                    name: presentation.name.clone(),
                    colour: presentation.colour1.clone(),
                    values,
                },
            ));
        }
        columns.sort_by(|(a, _), (b, _)| rank_order(*a, *b));

        Ok(Self {
            hours,
            columns: columns.into_iter().map(|(_, col)| col).collect(),
        })
    }

    /// Upper edge of every band, bottom band first.
    pub fn cumulative(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.; self.hours.len()];
        self.columns
            .iter()
            .map(|col| {
                for (acc, val) in running.iter_mut().zip(&col.values) {
                    *acc += val;
                }
                running.clone()
            })
            .collect()
    }
}

/// Hourly values inside `window`, ordered by hour. Missing values are kept
/// out of the series.
pub fn windowed_series(rows: &[(i64, Option<f64>)], window: HourWindow) -> Vec<(i64, f64)> {
    let mut series: Vec<(i64, f64)> = rows
        .iter()
        .filter(|(hour, _)| window.contains(*hour))
        .filter_map(|(hour, value)| value.map(|v| (*hour, v)))
        .collect();
    series.sort_by_key(|(hour, _)| *hour);
    series
}

/// Prices sorted from highest to lowest, missing prices counted as zero.
pub fn duration_curve(prices: &[(i64, Option<f64>)]) -> Vec<f64> {
    let mut curve: Vec<f64> = prices.iter().map(|(_, p)| p.unwrap_or(0.)).collect();
    curve.sort_by(|a, b| b.total_cmp(a));
    curve
}
