use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use energyrs::cache::{ForecastRepository, InMemoryForecastRepository, SqliteForecastRepository};
use energyrs::clock::{Clock, SystemClock};
use energyrs::config::AppConfig;
use energyrs::import::load_inputs;
use energyrs::logging::{init_logging, LogLevel};
use energyrs::models::DayEnergySummary;
use energyrs::summary::SummaryProvider;

/// EnergyRS - Daily Energy Forecasting CLI
///
/// Turns daily biometric aggregates, schedule events, and an optional
/// lifestyle profile into hourly energy forecasts with confidence scores.
#[derive(Parser)]
#[command(name = "energyrs")]
#[command(version = "0.1.0")]
#[command(about = "Daily Energy Forecasting CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Biometric day aggregates (JSON array)
    #[arg(short, long)]
    biometrics: Option<PathBuf>,

    /// Schedule events (CSV: title,start,end,all_day,energy_delta)
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// User profile (JSON)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Forecast cache database (overrides the configured path)
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize energy for a day (past, today, or future)
    Summary {
        /// Date to summarize (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,

        #[command(flatten)]
        inputs: InputArgs,

        /// Emit the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast energy for the next days
    Forecast {
        /// Days ahead to forecast (default: 3)
        #[arg(short = 'n', long, default_value = "3")]
        days: u32,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Show recorded forecast accuracy over a date range
    Accuracy {
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Forecast cache database (overrides the configured path)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

fn open_repository(
    cli_path: Option<&PathBuf>,
    config: &AppConfig,
) -> Result<Arc<dyn ForecastRepository>> {
    match cli_path.or(config.cache_path.as_ref()) {
        Some(path) => {
            let repo = SqliteForecastRepository::new(path)
                .with_context(|| format!("opening forecast cache {}", path.display()))?;
            Ok(Arc::new(repo))
        }
        None => Ok(Arc::new(InMemoryForecastRepository::new())),
    }
}

#[derive(Tabled)]
struct HourRow {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Energy")]
    energy: String,
    #[tabled(rename = "")]
    bar: String,
}

fn print_summary(summary: &DayEnergySummary) {
    println!();
    println!(
        "{} {}",
        "Energy summary for".bold(),
        summary.date.to_string().bold().cyan()
    );
    println!();

    if summary.hourly_waveform.is_empty() {
        println!(
            "  {}",
            summary
                .warning
                .as_deref()
                .unwrap_or("No estimate available")
                .yellow()
        );
        if !summary.debug.is_empty() {
            println!("  {}", summary.debug.dimmed());
        }
        return;
    }

    println!(
        "  Overall: {}   Mental: {:.0}   Physical: {:.0}",
        format!("{:.0}/100", summary.overall_score).bold().green(),
        summary.mental_score,
        summary.physical_score
    );
    println!(
        "  Confidence: {:.0}%   Coverage: {:.0}%",
        summary.confidence * 100.0,
        summary.coverage * 100.0
    );
    if let Some(efficiency) = summary.sleep_efficiency_pct {
        println!("  Sleep efficiency: {:.0}%", efficiency);
    }
    if let Some(warning) = &summary.warning {
        println!("  {}", warning.yellow());
    }

    let rows: Vec<HourRow> = summary
        .hourly_waveform
        .iter()
        .enumerate()
        .map(|(hour, value)| HourRow {
            hour: format!("{:02}:00", hour),
            energy: format!("{:.2}", value),
            bar: "█".repeat((value * 20.0).round() as usize),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if !summary.boosters.is_empty() {
        println!("  {} {}", "Boosters:".green(), summary.boosters.join(", "));
    }
    if !summary.drainers.is_empty() {
        println!("  {} {}", "Drainers:".red(), summary.drainers.join(", "));
    }
    for highlight in &summary.highlights {
        println!("  • {}", highlight);
    }
}

#[derive(Tabled)]
struct AccuracyRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.verbose > 0 {
        config.logging.level = match cli.verbose {
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
    }
    init_logging(&config.logging)?;

    let clock = Arc::new(SystemClock);

    match cli.command {
        Commands::Summary {
            date,
            inputs,
            json,
        } => {
            let date = match date {
                Some(s) => parse_date(&s)?,
                None => clock.today(),
            };
            let repo = open_repository(inputs.cache.as_ref(), &config)?;
            let day_inputs = load_inputs(
                inputs.biometrics.as_deref(),
                inputs.events.as_deref(),
                inputs.profile.as_deref(),
            )?;

            let provider = SummaryProvider::new(repo, clock, config.engine.clone());
            let summary = provider.summary(date, &day_inputs)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Forecast { days, inputs } => {
            let repo = open_repository(inputs.cache.as_ref(), &config)?;
            let day_inputs = load_inputs(
                inputs.biometrics.as_deref(),
                inputs.events.as_deref(),
                inputs.profile.as_deref(),
            )?;

            let today = clock.today();
            let provider = SummaryProvider::new(repo, clock, config.engine.clone());
            for offset in 1..=days.max(1) {
                let date = today + chrono::Duration::days(offset as i64);
                let summary = provider.summary(date, &day_inputs)?;
                print_summary(&summary);
            }
        }

        Commands::Accuracy { from, to, cache } => {
            let from = parse_date(&from)?;
            let to = parse_date(&to)?;
            let repo = open_repository(cache.as_ref(), &config)?;

            let entries = repo.accuracy_range(from, to)?;
            if entries.is_empty() {
                println!("{}", "No accuracy measurements in range".yellow());
            } else {
                let mean =
                    entries.iter().map(|(_, a)| a).sum::<f64>() / entries.len() as f64;
                let rows: Vec<AccuracyRow> = entries
                    .iter()
                    .map(|(date, accuracy)| AccuracyRow {
                        date: date.to_string(),
                        accuracy: format!("{:.0}%", accuracy * 100.0),
                    })
                    .collect();
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                println!("{}", table);
                println!(
                    "  Mean accuracy: {}",
                    format!("{:.0}%", mean * 100.0).bold().green()
                );
            }
        }
    }

    Ok(())
}
