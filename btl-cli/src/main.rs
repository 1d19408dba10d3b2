use std::path::PathBuf;

use anyhow::{Context, Result};
use btl_cli::config::AppConfig;
use btl_cli::report::{ComparisonReport, StampDutyReport, ViabilityReport};
use btl_cli::{app, logging};
use btl_core::RateSchedule;
use btl_core::store::Backend;
use clap::{Parser, Subcommand};
use tracing::debug;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Buy-to-let calculator for England and Wales.
///
/// Works out stamp duty or land transaction tax, the monthly and annual
/// returns of a rental property, and which of up to three mortgage offers
/// costs least. Inputs are saved between runs.
#[derive(Debug, Parser)]
#[command(name = "btl", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend (`memory` or `sqlite`).
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `btl.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Embedded rate schedule.
    #[arg(long, global = true, value_parser = parse_schedule)]
    schedule: Option<RateSchedule>,

    /// Rate table CSV, used instead of the embedded schedule.
    #[arg(long, global = true)]
    rates: Option<PathBuf>,

    /// Log filter directive (e.g. `debug`, `btl_core=trace`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log events to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a property: purchase costs, monthly profit, ROI, stress test.
    Viability {
        /// Edit an input before evaluating, as `field=value`. Repeatable.
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        sets: Vec<String>,

        /// Do not save the inputs afterwards.
        #[arg(long)]
        no_save: bool,
    },

    /// Compare mortgage offers by total cost.
    Compare {
        /// Edit an offer before comparing, as `id.field=value`. Repeatable.
        #[arg(long = "set", value_name = "ID.FIELD=VALUE")]
        sets: Vec<String>,

        /// Do not save the offers afterwards.
        #[arg(long)]
        no_save: bool,
    },

    /// Itemise the transaction tax on one purchase.
    StampDuty {
        #[arg(long)]
        price: String,

        /// `england` or `wales`.
        #[arg(long, default_value = "england")]
        country: String,

        /// `first`, `next` or `additional`.
        #[arg(long, default_value = "additional")]
        category: String,
    },

    /// Delete all saved inputs.
    Reset,
}

fn parse_schedule(s: &str) -> Result<RateSchedule, String> {
    RateSchedule::parse(s)
        .ok_or_else(|| format!("unknown schedule '{s}' (expected pre-april-2025 or from-april-2025)"))
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.as_deref(), cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.override_database(cli.backend, cli.db);
    config.override_rates(cli.schedule, cli.rates);
    debug!(?config, "resolved configuration");

    match cli.command {
        Command::Viability { sets, no_save } => {
            let repo = app::open_repository(&config).await?;
            let table = app::load_rate_table(&config.rates)?;
            let viability_config = config
                .viability_config()
                .context("Invalid calculator configuration")?;
            let session =
                app::run_viability(repo.as_ref(), viability_config, table, &sets, !no_save)
                    .await?;
            print!("{}", ViabilityReport(&session));
        }
        Command::Compare { sets, no_save } => {
            let repo = app::open_repository(&config).await?;
            let session = app::run_compare(repo.as_ref(), &sets, !no_save).await?;
            print!("{}", ComparisonReport(&session));
        }
        Command::StampDuty {
            price,
            country,
            category,
        } => {
            let table = app::load_rate_table(&config.rates)?;
            let breakdown = app::run_stamp_duty(&table, &price, &country, &category)?;
            print!("{}", StampDutyReport(&breakdown));
        }
        Command::Reset => {
            let repo = app::open_repository(&config).await?;
            app::run_reset(repo.as_ref()).await?;
            println!("Saved inputs cleared.");
        }
    }

    Ok(())
}
