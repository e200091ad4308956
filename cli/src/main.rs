use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tickerkit::prelude::*;
use tickerkit::{init_logger, Logger, Timer};

#[derive(Parser)]
#[command(name = "tickerkit")]
#[command(about = "Sequence transformations, column ratios and presence matrices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the derived sequences (ranges, evens, filtered names, 5x5 grid)
    Sequences {
        /// Print as JSON instead of debug output
        #[arg(long)]
        json: bool,
    },
    /// Compute per-column max/min ratios with both implementations
    Ratio {
        /// Use the fixed 3x2 sample instead of a random matrix
        #[arg(long)]
        sample: bool,
        /// Rows of the random matrix
        #[arg(long, default_value_t = 5)]
        rows: usize,
        /// Columns of the random matrix
        #[arg(long, default_value_t = 3)]
        cols: usize,
        /// Smallest value drawn (inclusive)
        #[arg(long, default_value_t = 1)]
        low: i64,
        /// Largest value drawn (inclusive)
        #[arg(long, default_value_t = 10)]
        high: i64,
        /// Seed for a reproducible matrix
        #[arg(long)]
        seed: Option<u64>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the city/company table and its presence matrix
    Presence {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct RatioOutput<'a> {
    matrix: &'a Matrix<i64>,
    max_by_min: Vec<f64>,
    max_by_min_apply: Vec<f64>,
}

#[derive(Serialize)]
struct PresenceOutput<'a> {
    table: &'a CityCompanyTable,
    presence: &'a PresenceMatrix,
}

fn main() -> anyhow::Result<()> {
    init_logger()?;

    let cli = Cli::parse();
    let logger = Logger::new("TICKERKIT");
    logger.debug(&format!(
        "started at {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    match cli.command {
        Commands::Sequences { json } => {
            let report = SequenceReport::build();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{:?}", report.first_ten);
                println!("{:?}", report.evens);
                println!("{:?}", report.filtered_names);
                println!("{:#?}", report.grid);
                println!("{:?}", report.flattened);
            }
        }
        Commands::Ratio {
            sample,
            rows,
            cols,
            low,
            high,
            seed,
            json,
        } => {
            let matrix = if sample {
                sample_matrix()
            } else if let Some(seed) = seed {
                random_matrix(rows, cols, low, high, &mut StdRng::seed_from_u64(seed))?
            } else {
                random_matrix(rows, cols, low, high, &mut rand::rng())?
            };

            let timer = Timer::start("column ratios");
            let output = RatioOutput {
                matrix: &matrix,
                max_by_min: max_by_min(&matrix)?,
                max_by_min_apply: max_by_min_apply(&matrix)?,
            };
            timer.log_elapsed();

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", matrix);
                println!("{:?}", output.max_by_min);
                println!("{:?}", output.max_by_min_apply);
            }
        }
        Commands::Presence { json } => {
            let table = CityCompanyTable::sample();
            let presence = presence_matrix(&table);
            logger.info_with_data("presence matrix built", presence.counts.len());

            if json {
                let output = PresenceOutput {
                    table: &table,
                    presence: &presence,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", table);
                println!("{}", presence);
            }
        }
    }

    Ok(())
}
