use anyhow::Context;
use case_charts::{
    compute, config::RunConfig, convert, results::ResultsDb, runner::Runner,
};
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
enum Args {
    /// Processes a model run folder: scenario comparison charts, then the
    /// generator table and charts of every case in its case list.
    /// Case results are expected as `gdx2sqlite` exports of the GDX files.
    // cargo run run 2020-04-12 --config plots.toml
    Run {
        /// Folder holding `list_of_cases.csv` and one subfolder per case.
        folder: PathBuf,

        /// TOML run configuration. Defaults apply when omitted.
        #[clap(short, long)]
        config: Option<PathBuf>,
    },

    /// Writes the enriched generator table of a single results database.
    /*
    cargo run generator-table \
        2020-04-12/base/output_results.db \
        other_files/generator_properties.csv \
        results/generator_df_base.csv
    */
    GeneratorTable {
        /// A `gdx2sqlite` export of a case's results GDX.
        results_db: PathBuf,

        /// Generator properties CSV (technologies,Name,colour1,colour2,Rank).
        properties: PathBuf,

        /// Where the output csv will be written
        csv_out: PathBuf,

        /// Symbols joined per technology. Must include `units_built`.
        #[clap(short, long, num_args = 1.., value_delimiter = ' ')]
        symbols: Option<Vec<String>>,
    },

    /// Renders the average price and unserved hours charts for an
    /// explicit list of cases.
    // cargo run compare-cases 2020-04-12 central --cases base high_gas low_wind
    CompareCases {
        folder: PathBuf,

        /// Scenario name used in the output file names.
        name: String,

        #[clap(short = 'n', long, num_args = 1.., value_delimiter = ' ')]
        cases: Vec<String>,

        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_toml_file(path),
        None => Ok(RunConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse() {
        Args::Run { folder, config } => {
            let config = load_config(config.as_ref())?;
            Runner::new(&folder, &config).run()?;
            info!("Finished {}", folder.display());
        }
        Args::GeneratorTable {
            results_db,
            properties,
            csv_out,
            symbols,
        } => {
            let symbols = symbols.unwrap_or_else(|| RunConfig::default().symbols);
            let db = ResultsDb::open(&results_db)?;
            let properties = convert::read_properties(&properties)?;
            let generators = compute::build_generators(&db, &symbols, &properties)
                .with_context(|| format!("Failed to build generator table from {}", results_db.display()))?;
            convert::write_generator_table(&csv_out, &symbols, &generators)?;
            info!("Wrote {} generators to {}", generators.len(), csv_out.display());
        }
        Args::CompareCases {
            folder,
            name,
            cases,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            Runner::new(&folder, &config).compare_cases(&name, &cases)?;
        }
    }
    Ok(())
}
