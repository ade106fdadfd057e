use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use similarity_review::catalog::{self, SubmissionEntry};
use similarity_review::models::{Corpus, MatchSet, MetricScale, StatisticsSnapshot};
use similarity_review::{aggregate, db, present, report, risk, SubmissionBatch};

#[derive(Parser)]
#[command(name = "similarity-review")]
#[command(about = "Risk tiers, suspect rankings and charts for code-similarity results", long_about = None)]
struct Cli {
    /// Postgres connection string for database-backed commands
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Scale of the four component metrics in corpus input
    #[arg(long, env = "SIMILARITY_METRIC_SCALE", global = true, value_enum, default_value_t = MetricScale::Percent)]
    metric_scale: MetricScale,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small demo corpus
    Seed,
    /// Import comparison rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Aggregate a similarity corpus into totals, suspects and assignments
    Stats {
        /// Read a statistics payload instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        assignment: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown statistics report
    Report {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        assignment: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Present the match set returned for an upload
    Matches {
        #[arg(long)]
        input: PathBuf,
        /// Rows in the detailed listing; all matches when omitted
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a batch of files before upload
    Plan {
        #[arg(long, default_value = "")]
        assignment: String,
        /// Student ids in file order; missing ones keep their placeholder
        #[arg(long = "student-id")]
        student_ids: Vec<String>,
        files: Vec<PathBuf>,
    },
    /// Summarize the submission catalogue
    Catalog {
        #[arg(long)]
        input: PathBuf,
    },
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn load_corpus(
    cli_url: Option<&str>,
    scale: MetricScale,
    snapshot: Option<&Path>,
    assignment: Option<&str>,
) -> anyhow::Result<Corpus> {
    let Some(path) = snapshot else {
        let pool = connect(cli_url).await?;
        return db::fetch_corpus(&pool, assignment).await;
    };

    let mut corpus = read_json::<StatisticsSnapshot>(path)?
        .into_corpus(scale)
        .with_context(|| format!("invalid statistics payload in {}", path.display()))?;

    if let Some(name) = assignment {
        corpus.records.retain(|record| record.assignment == name);
    }
    if corpus.reported_students != 0 {
        info!(reported = corpus.reported_students, "upstream student total ignored");
    }
    Ok(corpus)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(database_url).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(database_url).await?;
            let inserted = db::import_csv(&pool, &csv, cli.metric_scale).await?;
            println!("Inserted {inserted} comparisons from {}.", csv.display());
        }
        Commands::Stats {
            snapshot,
            assignment,
            limit,
            json,
        } => {
            let corpus = load_corpus(
                database_url,
                cli.metric_scale,
                snapshot.as_deref(),
                assignment.as_deref(),
            )
            .await?;
            let view = aggregate(&corpus.records, corpus.total_submissions);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(ExitCode::SUCCESS);
            }

            println!(
                "{} students, {} submissions, {} comparisons, {} high risk pairs",
                view.totals.total_students,
                view.totals.total_submissions,
                view.totals.total_comparisons,
                view.high_risk_pairs.len()
            );

            if view.suspect_ranking.is_empty() {
                println!("No similarity data available yet.");
                return Ok(ExitCode::SUCCESS);
            }

            println!("Top suspects:");
            for suspect in view.suspect_ranking.iter().take(limit) {
                println!(
                    "- {} {:.0}% ({}) {} high / {} medium across {} comparisons",
                    suspect.student_id,
                    suspect.avg_similarity * 100.0,
                    risk::classify_fraction(suspect.avg_similarity).label,
                    suspect.high_risk_count,
                    suspect.medium_risk_count,
                    suspect.total_submissions
                );
            }

            println!("By assignment:");
            for group in view.assignment_rollup.iter() {
                println!(
                    "- {}: {} pairs, low {} / medium {} / high {}, avg {:.0}%",
                    group.assignment,
                    group.total_pairs,
                    group.low_risk,
                    group.medium_risk,
                    group.high_risk,
                    group.avg_similarity * 100.0
                );
            }
        }
        Commands::Report {
            snapshot,
            assignment,
            out,
        } => {
            let corpus = load_corpus(
                database_url,
                cli.metric_scale,
                snapshot.as_deref(),
                assignment.as_deref(),
            )
            .await?;
            let view = aggregate(&corpus.records, corpus.total_submissions);
            let report = report::build_statistics_report(
                assignment.as_deref(),
                chrono::Utc::now(),
                &view,
                &corpus.records,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Matches { input, limit, json } => {
            let results = read_json::<MatchSet>(&input)?
                .into_results()
                .with_context(|| format!("invalid match set in {}", input.display()))?;

            if json {
                let mut view = present::present(&results);
                if let Some(limit) = limit {
                    view.listing.truncate(limit);
                }
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", report::build_match_report(&results, limit));
            }
        }
        Commands::Plan {
            assignment,
            student_ids,
            files,
        } => {
            let mut batch = SubmissionBatch::new();
            batch.set_assignment_name(assignment);
            batch.add_files(files);

            match batch.request_with_ids(student_ids) {
                Ok(request) => {
                    println!(
                        "{} file(s) will be compared. Total comparisons: {}",
                        request.files.len(),
                        batch.expected_comparisons()
                    );
                    println!("{}", serde_json::to_string_pretty(&request)?);
                }
                Err(err) => {
                    eprintln!("{err}");
                    return Ok(ExitCode::from(2));
                }
            }
        }
        Commands::Catalog { input } => {
            let entries = read_json::<Vec<SubmissionEntry>>(&input)?;
            let summary = catalog::summarize(&entries);
            print!("{}", report::build_catalogue_report(&entries, &summary));
        }
    }

    Ok(ExitCode::SUCCESS)
}
