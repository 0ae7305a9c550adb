use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod app;
mod collector;
mod config;
mod db;
mod models;
mod page;
mod predictor;
mod server;

use crate::app::AppState;
use crate::collector::WidgetState;
use crate::config::{DatabaseArgs, ModelArgs};
use crate::models::BalanceTier;
use crate::predictor::Predictor;

#[derive(Parser)]
#[command(name = "student-performance-predictor")]
#[command(about = "Predict whether a student will pass or fail and record the result", long_about = None)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,
    #[command(flatten)]
    database: DatabaseArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the prediction form over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8501")]
        bind: String,
    },
    /// Run one prediction and print the result page
    Predict {
        #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(i64).range(0..=100))]
        attendance: i64,
        #[arg(long, default_value_t = 75, value_parser = clap::value_parser!(i64).range(0..=100))]
        assignment_score: i64,
        #[arg(long, default_value_t = 65, value_parser = clap::value_parser!(i64).range(0..=100))]
        midterm_score: i64,
        #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(i64).range(0..=100))]
        final_score: i64,
        #[arg(long, default_value_t = 0, value_parser = parse_balance)]
        outstanding_balance: i64,
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(0..=50))]
        library_visits: i64,
    },
    /// Create the student_performance table if it does not exist
    InitDb,
    /// Print the most recent stored predictions
    History {
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
    /// Export stored predictions as CSV
    Export {
        #[arg(long, default_value = "predictions.csv")]
        out: PathBuf,
    },
}

fn parse_balance(value: &str) -> Result<i64, String> {
    let amount: i64 = value.parse().map_err(|err| format!("{err}"))?;
    BalanceTier::from_amount(amount)
        .map(BalanceTier::amount)
        .ok_or_else(|| {
            let tiers: Vec<String> = BalanceTier::ALL
                .iter()
                .map(|tier| tier.amount().to_string())
                .collect();
            format!("must be one of {}", tiers.join(", "))
        })
}

fn load_predictor(args: &ModelArgs) -> anyhow::Result<Predictor> {
    Predictor::load(&args.path)
        .with_context(|| format!("cannot start without a usable model at {}", args.path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("student_performance_predictor=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database = cli.database.settings();
    tracing::debug!(database = %database.redacted_url(), "database configured");

    match cli.command {
        Commands::Serve { bind } => {
            let predictor = load_predictor(&cli.model)?;
            server::serve(AppState::new(predictor, database), &bind).await?;
        }
        Commands::Predict {
            attendance,
            assignment_score,
            midterm_score,
            final_score,
            outstanding_balance,
            library_visits,
        } => {
            let predictor = load_predictor(&cli.model)?;
            let state = AppState::new(predictor, database);
            let widgets = WidgetState {
                attendance,
                assignment_score,
                midterm_score,
                final_score,
                outstanding_balance,
                library_visits,
            };
            let page = app::handle(&state, &widgets, true).await?;
            print!("{}", page::render_markdown(&page));
        }
        Commands::InitDb => {
            db::init_db(&database).await?;
            println!("Schema ready.");
        }
        Commands::History { limit } => {
            let rows = db::fetch_rows(&database, Some(limit)).await?;
            if rows.is_empty() {
                println!("No predictions stored yet.");
                return Ok(());
            }

            println!("Stored predictions:");
            for row in rows.iter() {
                println!(
                    "- {} (attendance {:.0}, assignment {:.0}, midterm {:.0}, final {}, balance {}, library {})",
                    row.performance,
                    row.attendance,
                    row.assignment_score,
                    row.midterm_score,
                    row.final_score,
                    row.outstanding_balance,
                    row.library_visits
                );
            }
        }
        Commands::Export { out } => {
            let rows = db::fetch_rows(&database, None).await?;
            let written = db::export_csv(&rows, &out)?;
            println!("Exported {written} predictions to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_defaults_match_form_defaults() {
        let cli = Cli::try_parse_from(["student-performance-predictor", "predict"]).expect("parse");
        let Commands::Predict {
            attendance,
            assignment_score,
            midterm_score,
            final_score,
            outstanding_balance,
            library_visits,
        } = cli.command
        else {
            panic!("expected predict");
        };
        let defaults = WidgetState::default();
        assert_eq!(attendance, defaults.attendance);
        assert_eq!(assignment_score, defaults.assignment_score);
        assert_eq!(midterm_score, defaults.midterm_score);
        assert_eq!(final_score, defaults.final_score);
        assert_eq!(outstanding_balance, defaults.outstanding_balance);
        assert_eq!(library_visits, defaults.library_visits);
    }

    #[test]
    fn predict_rejects_out_of_range_values() {
        let over = Cli::try_parse_from(["student-performance-predictor", "predict", "--attendance", "101"]);
        assert!(over.is_err());
        let tier = Cli::try_parse_from([
            "student-performance-predictor",
            "predict",
            "--outstanding-balance",
            "123",
        ]);
        assert!(tier.is_err());
    }

    #[test]
    fn history_limit_must_be_positive() {
        for bad in ["0", "-1"] {
            let parsed = Cli::try_parse_from([
                "student-performance-predictor",
                "history",
                "--limit",
                bad,
            ]);
            assert!(parsed.is_err(), "limit {bad} should be rejected");
        }
        let cli = Cli::try_parse_from(["student-performance-predictor", "history", "--limit", "3"])
            .expect("parse");
        assert!(matches!(cli.command, Commands::History { limit: 3 }));
    }

    #[test]
    fn parse_balance_accepts_known_tiers() {
        assert_eq!(parse_balance("600000"), Ok(600_000));
        assert!(parse_balance("abc").is_err());
    }
}
