//! ### Convert
//! CSV inputs and outputs around the per-case processing: the case
//! manifest, the generator properties lookup, and the enriched generator
//! table dump.

use crate::compute::Generator;
use anyhow::{bail, Context};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Presentation metadata for one technology, shared by every chart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Presentation {
    #[serde(rename = "technologies")]
    pub technology: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Colour for stacked area charts.
    pub colour1: String,
    /// Colour for bar charts.
    pub colour2: String,
    /// Stacking and sort order. May be blank or fractional.
    #[serde(rename = "Rank")]
    pub rank: Option<f64>,
}

pub type Properties = IndexMap<String, Presentation>;

/// Reads the case identifiers listed one per row in the first column.
pub fn read_case_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open case list {}", path.display()))?;

    let mut cases = Vec::new();
    for line in reader.records() {
        let line = line?;
        match line.get(0).map(str::trim) {
            Some(case) if !case.is_empty() => cases.push(case.to_string()),
            _ => continue,
        }
    }
    Ok(cases)
}

pub fn read_properties(path: &Path) -> anyhow::Result<Properties> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open generator properties {}", path.display()))?;
    read_properties_from(reader)
}

fn read_properties_from<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Properties> {
    let mut properties = Properties::new();
    for line in reader.deserialize() {
        let line: Presentation = line?;
        if properties.contains_key(&line.technology) {
            bail!("Technology `{}` listed twice in generator properties", line.technology);
        }
        properties.insert(line.technology.clone(), line);
    }
    Ok(properties)
}

pub fn write_generator_table(path: &Path, metrics: &[String], generators: &[Generator]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_generator_table_to(std::io::BufWriter::new(file), metrics, generators)
}

/// Writes one row per generator. Missing and NaN values are empty cells.
pub fn write_generator_table_to(
    writer: impl Write,
    metrics: &[String],
    generators: &[Generator],
) -> anyhow::Result<()> {
    let mut out_csv = csv::Writer::from_writer(writer);

    let header = std::iter::once("technologies")
        .chain(metrics.iter().map(String::as_str))
        .chain(["New Build", "IRR", "Name", "colour1", "colour2", "Rank"]);
    out_csv.write_record(header)?;

    for gen in generators {
        let mut record = Vec::with_capacity(metrics.len() + 7);
        record.push(gen.technology.clone());
        for metric in metrics {
            record.push(number_cell(gen.value(metric)?));
        }
        record.push(bool_cell(gen.new_build).to_string());
        record.push(number_cell(gen.irr));
        match &gen.presentation {
            Some(p) => {
                record.push(p.name.clone());
                record.push(p.colour1.clone());
                record.push(p.colour2.clone());
                record.push(p.rank.map_or_else(String::new, number_cell));
            }
            None => record.extend(std::iter::repeat(String::new()).take(4)),
        }
        out_csv.write_record(&record)?;
    }
    out_csv.flush()?;
    Ok(())
}

/// Numbers always carry a decimal point (`50.0`), NaN is an empty cell.
fn number_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:?}")
    }
}

fn bool_cell(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn case_list_keeps_order_and_first_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_2030,comment\nhigh_gas\n\nlow_wind").unwrap();
        let cases = read_case_list(file.path()).unwrap();
        assert_eq!(cases, vec!["base_2030", "high_gas", "low_wind"]);
    }

    #[test]
    fn missing_case_list_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_case_list(&dir.path().join("list_of_cases.csv")).unwrap_err();
        assert!(err.to_string().contains("list_of_cases.csv"), "{err}");
    }

    #[test]
    fn reads_properties_by_technology() {
        let data = "technologies,Name,colour1,colour2,Rank\n\
                    ccgt,Combined Cycle,#ff7f0e,#ff7f0e,3\n\
                    wind, Wind ,tab:green,green,1\n";
        let props = read_properties_from(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(data.as_bytes()),
        )
        .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["wind"].name, "Wind");
        assert_eq!(props["ccgt"].rank, Some(3.));
    }

    #[test]
    fn blank_and_fractional_ranks_are_read() {
        let data = "technologies,Name,colour1,colour2,Rank
                    ccgt,Combined Cycle,red,red,2.5
                    wind,Wind,green,green,
";
        let props = read_properties_from(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(props["ccgt"].rank, Some(2.5));
        assert_eq!(props["wind"].rank, None);
    }

    #[test]
    fn cells_are_formatted_like_float_frames() {
        assert_eq!(number_cell(50.), "50.0");
        assert_eq!(number_cell(8.14), "8.14");
        assert_eq!(number_cell(-0.5), "-0.5");
        assert_eq!(number_cell(f64::NAN), "");
        assert_eq!(bool_cell(true), "True");
        assert_eq!(bool_cell(false), "False");
    }

    #[test]
    fn duplicate_property_rows_are_rejected() {
        let data = "technologies,Name,colour1,colour2,Rank\nccgt,A,red,red,1\nccgt,B,red,red,2\n";
        assert!(read_properties_from(csv::Reader::from_reader(data.as_bytes())).is_err());
    }
}
