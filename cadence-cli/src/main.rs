use anyhow::{Context, Result, bail};
use cadence_core::{
    AdherenceReport, AdherenceStatus, AdministrationEvent, CyclePhase, Protocol, analyze_in_tz,
    cycle_position, is_active_phase, next_occurrence, next_site, preview, validate,
};
use cadence_core::time::parse_tz;
use cadence_ingest::{
    find_protocol, load_events_json, load_protocols, parse_event_log_csv,
    parse_schedule_shorthand, select_record,
};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod reminders_cmd;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Dose schedule previews and adherence reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ProtocolArgs {
    /// Protocol snapshot (JSON array or single object)
    #[arg(long)]
    protocol: PathBuf,

    /// Protocol id, required when the snapshot holds more than one
    #[arg(long)]
    id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a protocol against every invariant and list all problems
    Validate {
        #[command(flatten)]
        src: ProtocolArgs,
    },

    /// Next occurrence strictly after a date (default: today)
    Next {
        #[command(flatten)]
        src: ProtocolArgs,

        #[arg(long)]
        from: Option<NaiveDate>,
    },

    /// Upcoming occurrence dates
    Preview {
        #[command(flatten)]
        src: ProtocolArgs,

        /// Reference date (default: today in the configured timezone)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Days ahead to look (default from config.preview.horizon_days)
        #[arg(long)]
        horizon: Option<u32>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Whether a date is in an active or off phase
    Cycle {
        #[command(flatten)]
        src: ProtocolArgs,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Adherence over a window from a dose log (CSV or JSON)
    Adherence {
        #[command(flatten)]
        src: ProtocolArgs,

        #[arg(long)]
        events: PathBuf,

        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Next injection site in the protocol's rotation
    Site {
        #[command(flatten)]
        src: ProtocolArgs,

        /// Site used last time; read from --events when omitted
        #[arg(long)]
        last: Option<String>,

        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Project upcoming reminder intents as JSON lines
    Reminders {
        #[command(flatten)]
        src: ProtocolArgs,

        #[arg(long)]
        last_site: Option<String>,

        #[arg(long)]
        events: Option<PathBuf>,

        #[arg(long)]
        horizon: Option<u32>,
    },

    /// Parse a schedule shorthand ("every 3 days", "mon,wed,fri") and print it
    Rule { text: String },

    /// Config file management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.cadence/config.toml if none exists
    Init,
    /// Print the effective config
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_logging(&cfg.logging.filter);

    match cli.command {
        Command::Validate { src } => {
            let records = load_protocols(&src.protocol)?;
            let record = select_record(&records, src.id.as_deref())?;
            let report = validate(&record.to_draft());
            if report.valid {
                println!("{}: valid", record.id);
            } else {
                println!("{}: invalid", record.id);
                for e in report.errors() {
                    println!("- {e}");
                }
                bail!("protocol {} failed validation", record.id);
            }
        }

        Command::Next { src, from } => {
            let protocol = load_protocol(&src)?;
            let from = from.map_or_else(|| today(&cfg), Ok)?;
            match next_occurrence(&protocol.rule, from) {
                Some(date) => println!("{date}"),
                None => println!("no computable next occurrence for rule: {}", protocol.rule),
            }
        }

        Command::Preview {
            src,
            today: reference,
            horizon,
            json,
        } => {
            let protocol = load_protocol(&src)?;
            let reference = reference.map_or_else(|| today(&cfg), Ok)?;
            let horizon = horizon.unwrap_or(cfg.preview.horizon_days);
            let dates = preview(&protocol, reference, horizon);

            if json {
                println!("{}", serde_json::to_string_pretty(&dates)?);
            } else {
                println!(
                    "{} ({}) next {} days from {}:",
                    protocol.id, protocol.rule, horizon, reference
                );
                if dates.is_empty() {
                    println!("(no upcoming occurrences)");
                }
                for date in &dates {
                    println!("- {} {}", date, date.format("%a"));
                }
            }
        }

        Command::Cycle { src, date } => {
            let protocol = load_protocol(&src)?;
            let date = date.map_or_else(|| today(&cfg), Ok)?;
            let active = is_active_phase(&protocol, date);
            println!("{}: {}", date, if active { "active" } else { "off" });
            if let Some(pos) = cycle_position(&protocol, date) {
                let phase = match pos.phase {
                    CyclePhase::Active => "active",
                    CyclePhase::Off => "off",
                };
                println!(
                    "cycle {} day {} ({} phase, {} day(s) left)",
                    pos.cycle_number,
                    pos.day_in_cycle + 1,
                    phase,
                    pos.days_left_in_phase
                );
            }
        }

        Command::Adherence {
            src,
            events,
            from,
            to,
            json,
        } => {
            let protocol = load_protocol(&src)?;
            let events = load_events(&events, &cfg)?;
            let tz = parse_tz(&cfg.timezone)?;
            let report = analyze_in_tz(&protocol, &events, from, to, tz);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Command::Site { src, last, events } => {
            let protocol = load_protocol(&src)?;
            let events = match &events {
                Some(p) => load_events(p, &cfg)?,
                None => vec![],
            };
            let last = last
                .as_deref()
                .or_else(|| cadence_core::last_site_used(&events, &protocol.id));
            let rotation = protocol.site_rotation.as_deref().unwrap_or_default();
            match next_site(rotation, last) {
                Some(site) => println!("{site}"),
                None => println!("protocol {} has no site rotation", protocol.id),
            }
        }

        Command::Reminders {
            src,
            last_site,
            events,
            horizon,
        } => {
            let protocol = load_protocol(&src)?;
            let events = match &events {
                Some(p) => load_events(p, &cfg)?,
                None => vec![],
            };
            let horizon = horizon.unwrap_or(cfg.preview.horizon_days);
            reminders_cmd::run(&protocol, &events, last_site, today(&cfg)?, horizon, &cfg)?;
        }

        Command::Rule { text } => {
            let rule = parse_schedule_shorthand(&text)?;
            println!("{}", serde_json::to_string(&rule)?);
            println!("({rule})");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn today(cfg: &Config) -> Result<NaiveDate> {
    let tz = parse_tz(&cfg.timezone)?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

fn load_protocol(src: &ProtocolArgs) -> Result<Protocol> {
    let records = load_protocols(&src.protocol)?;
    find_protocol(&records, src.id.as_deref())
        .with_context(|| format!("loading protocol from {}", src.protocol.display()))
}

fn load_events(path: &Path, cfg: &Config) -> Result<Vec<AdministrationEvent>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return load_events_json(path);
    }

    let log = parse_event_log_csv(path, &cfg.timezone)?;
    if log.skipped > 0 {
        warn!(skipped = log.skipped, path = %path.display(), "some dose log rows were skipped");
    }
    debug!(events = log.events.len(), "loaded dose log");
    Ok(log.events)
}

fn print_report(r: &AdherenceReport) {
    println!("Adherence for {} ({} to {})", r.protocol_id, r.window_start, r.window_end);
    match r.status {
        AdherenceStatus::Unsupported => {
            println!("expected: unknown (custom schedule)");
            println!("actual:   {}", r.actual_count);
            println!("adherence: unknown");
        }
        AdherenceStatus::NotDue | AdherenceStatus::Computed => {
            println!("expected: {}", r.expected_count.unwrap_or(0));
            println!("actual:   {}", r.actual_count);
            match r.adherence_percent {
                Some(pct) if r.status == AdherenceStatus::NotDue => {
                    println!("adherence: {pct}% (nothing due in this window)")
                }
                Some(pct) => println!("adherence: {pct}% ({} missed)", r.missed_count()),
                None => println!("adherence: unknown"),
            }
        }
    }
    println!("streak:   {} current, {} longest", r.current_streak, r.longest_streak);
    match r.last_event_date {
        Some(d) => println!("last dose: {d}"),
        None => println!("last dose: none recorded"),
    }
}
