use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

mod aggregate;
mod cluster;
mod config;
mod error;
mod features;
mod loader;
mod metrics;
mod models;
mod pipeline;
mod preprocess;
mod report;
mod stats;

use config::{AnalyticsConfig, ClusterConfig, InitStrategy, NumericPolicy};
use models::AnalyticsResult;

#[derive(Parser)]
#[command(name = "fitness-cohort-analytics")]
#[command(about = "Clustering and engagement analytics for team fitness records", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and emit the result as JSON
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
        /// Write JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Write a text summary and a CSV dump of enriched records
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "summary.txt")]
        summary_out: PathBuf,
        #[arg(long, default_value = "records.csv")]
        records_out: PathBuf,
    },
    /// Print the engagement leaderboard
    Top {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Input CSV with username, team, email, balance, stepcount, pushup, squat columns (`-` for stdin)
    #[arg(long, env = "FITNESS_DATA_CSV")]
    csv: PathBuf,
    #[arg(long, env = "FITNESS_CLUSTERS", default_value_t = config::DEFAULT_CLUSTERS)]
    clusters: usize,
    /// Seed for centroid initialisation; random when omitted
    #[arg(long, env = "FITNESS_SEED")]
    seed: Option<u64>,
    #[arg(long, default_value_t = config::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    #[arg(long, default_value_t = config::DEFAULT_TOLERANCE)]
    tolerance: f64,
    #[arg(long, value_enum, default_value_t = InitStrategy::KmeansPlusPlus)]
    init: InitStrategy,
    #[arg(long, default_value_t = config::DEFAULT_TOP_N)]
    top_n: usize,
    #[arg(long)]
    no_challenges: bool,
    #[arg(long, value_enum, default_value_t = NumericPolicy::Strict)]
    numeric_policy: NumericPolicy,
}

impl SourceArgs {
    fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            clustering: ClusterConfig {
                k: self.clusters,
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
                init: self.init,
                seed: self.seed,
            },
            numeric_policy: self.numeric_policy,
            top_n: self.top_n,
            assign_challenges: !self.no_challenges,
        }
    }

    fn run(&self) -> anyhow::Result<AnalyticsResult> {
        let rows = if self.csv == Path::new("-") {
            loader::load_from_reader(std::io::stdin().lock())?
        } else {
            loader::load_csv(&self.csv)?
        };
        let result = pipeline::run(&rows, &self.analytics_config(), Utc::now().date_naive())
            .with_context(|| format!("analytics failed for {}", self.csv.display()))?;
        Ok(result)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match cli.command {
        Commands::Analyze {
            source,
            out,
            pretty,
        } => {
            let result = match source.run() {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "analytics run failed");
                    println!("{}", error_payload());
                    std::process::exit(1);
                }
            };
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            match out {
                Some(path) => {
                    write_file(&path, &json)?;
                    println!("Analytics written to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Report {
            source,
            summary_out,
            records_out,
        } => {
            let result = source.run()?;
            write_file(&summary_out, &report::build_summary(&result))?;
            let file = std::fs::File::create(&records_out)
                .with_context(|| format!("failed to create {}", records_out.display()))?;
            report::write_records_csv(&result, file)
                .with_context(|| format!("failed to write {}", records_out.display()))?;
            println!(
                "Summary written to {}, {} records written to {}.",
                summary_out.display(),
                result.records.len(),
                records_out.display()
            );
        }
        Commands::Top { source, limit } => {
            let result = source.run()?;
            let leaders = aggregate::top_by(&result.records, limit, |r| r.engagement_index);

            println!("Top users by engagement index:");
            for (position, leader) in leaders.iter().enumerate() {
                println!(
                    "{}. {} ({}) engagement {:.2}",
                    position + 1,
                    leader.username,
                    leader.team,
                    leader.value
                );
            }
        }
    }

    Ok(())
}

/// Printed on stdout in place of the result when `analyze` fails. Carries no
/// detail from the underlying error; that goes to the log.
fn error_payload() -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "error": "analytics computation failed",
    })
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
