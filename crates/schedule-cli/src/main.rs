//! `schedule` CLI — expand class schedules and check them for double-bookings.
//!
//! ## Usage
//!
//! ```sh
//! # Expand one rule into occurrences over a window
//! schedule expand -i rule.json --from 2024-02-01 --to 2024-02-07
//!
//! # Same, grouped per date
//! schedule expand -i rule.json --from 2024-02-01 --to 2024-02-29 --by-day
//!
//! # Check a candidate rule against existing ones (exit 1 on conflict)
//! schedule check -i candidate.json --existing rules.json --all
//!
//! # Flattened calendar of many rules
//! schedule calendar -i rules.json --from 2024-02-01 --to 2024-02-29
//!
//! # Create rules one by one, rejecting conflicting ones
//! schedule import -i rules.json -o accepted.json
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to see service logs on stderr.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use schedule_engine::{
    check_conflicts, find_all_conflicts, generate_days, generate_occurrences, HorizonConfig,
    InMemoryRuleStore, RecurrenceRule, RuleStore, ScheduleService, SchedulerConfig,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Recurring class schedule expansion and conflict checking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Scheduler configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Only look this many days ahead for conflicts (overrides --config)
    #[arg(long, global = true)]
    horizon_days: Option<u32>,

    /// Date the look-ahead horizon starts from (defaults to today)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a single rule into dated occurrences
    Expand {
        /// Rule file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// First date of the window (inclusive)
        #[arg(long)]
        from: NaiveDate,
        /// Last date of the window (inclusive)
        #[arg(long)]
        to: NaiveDate,
        /// Group time slots per date
        #[arg(long)]
        by_day: bool,
    },
    /// Check a candidate rule against existing rules
    Check {
        /// Candidate rule file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// JSON array of existing rules
        #[arg(long)]
        existing: String,
        /// Report every conflict instead of stopping at the first
        #[arg(long)]
        all: bool,
    },
    /// Project many rules onto a calendar window
    Calendar {
        /// JSON array of rules (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Create rules in order, skipping any that conflict with those before them
    Import {
        /// JSON array of rules (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Where to write the accepted rules (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.horizon_days)?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    debug!(?config, %today, "Loaded scheduler configuration");

    match cli.command {
        Commands::Expand {
            input,
            output,
            from,
            to,
            by_day,
        } => {
            let rule: RecurrenceRule = parse_json(&read_input(input.as_deref())?, "rule")?;
            if by_day {
                let days = generate_days(&rule, from, to).context("Failed to expand rule")?;
                emit_json(output.as_deref(), &days)?;
            } else {
                let occurrences =
                    generate_occurrences(&rule, from, to).context("Failed to expand rule")?;
                emit_json(output.as_deref(), &occurrences)?;
            }
        }
        Commands::Check {
            input,
            existing,
            all,
        } => {
            let candidate: RecurrenceRule =
                parse_json(&read_input(input.as_deref())?, "candidate rule")?;
            let existing: Vec<RecurrenceRule> =
                parse_json(&read_input(Some(existing.as_str()))?, "existing rules")?;
            let horizon = config.horizon.resolve(today);

            let found = if all {
                let conflicts = find_all_conflicts(&candidate, &existing, horizon)
                    .context("Failed to check conflicts")?;
                emit_json(None, &conflicts)?;
                !conflicts.is_empty()
            } else {
                let conflict = check_conflicts(&candidate, &existing, horizon)
                    .context("Failed to check conflicts")?;
                emit_json(None, &conflict)?;
                conflict.is_some()
            };
            if found {
                process::exit(1);
            }
        }
        Commands::Calendar {
            input,
            output,
            from,
            to,
        } => {
            let rules: Vec<RecurrenceRule> = parse_json(&read_input(input.as_deref())?, "rules")?;
            let service = ScheduleService::with_config(
                Arc::new(InMemoryRuleStore::with_rules(rules)),
                config,
            );
            let events = service
                .calendar(from, to)
                .await
                .context("Failed to build calendar")?;
            emit_json(output.as_deref(), &events)?;
        }
        Commands::Import { input, output } => {
            let rules: Vec<RecurrenceRule> = parse_json(&read_input(input.as_deref())?, "rules")?;
            let store = Arc::new(InMemoryRuleStore::new());
            let service = ScheduleService::with_config(store.clone(), config).with_today(today);

            let mut rejected = 0;
            for rule in rules {
                let label = format!("{} ({})", rule.class_type, rule.id);
                if let Err(err) = service.create(rule).await {
                    eprintln!("Rejected {}: {}", label, err);
                    rejected += 1;
                }
            }

            let accepted = store.list().await?;
            emit_json(output.as_deref(), &accepted)?;
            eprintln!("Accepted {} rule(s), rejected {}", accepted.len(), rejected);
        }
    }

    Ok(())
}

/// Read `--config` if given, then apply `--horizon-days`.
fn load_config(path: Option<&str>, horizon_days: Option<u32>) -> Result<SchedulerConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path))?;
            SchedulerConfig::from_json(&raw).with_context(|| format!("Invalid config: {}", path))?
        }
        None => SchedulerConfig::default(),
    };
    if let Some(days) = horizon_days {
        config.horizon = HorizonConfig::LookAhead { days };
    }
    Ok(config)
}

fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Failed to parse {}", what))
}

/// Read a whole file, or stdin when no path is given.
fn read_input(path: Option<&str>) -> Result<String> {
    let mut raw = String::new();
    match path {
        Some(path) => File::open(path)
            .and_then(|mut file| file.read_to_string(&mut raw))
            .with_context(|| format!("Failed to read file: {}", path))?,
        None => io::stdin()
            .lock()
            .read_to_string(&mut raw)
            .context("Failed to read from stdin")?,
    };
    Ok(raw)
}

/// Pretty-print `value` as JSON to a file, or to stdout when no path is given.
fn emit_json<T: Serialize + ?Sized>(path: Option<&str>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write file: {}", path))
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", json).context("Failed to write to stdout")
        }
    }
}
