//! certkit - protocol conformance self-assessment CLI
//!
//! ## Commands
//!
//! - `run`: run conformance checks and score the result
//! - `levels`: list the published certification levels
//! - `badge`: write an SVG badge for a level or a saved report
//! - `history`: show locally recorded certifications
//! - `record`: issue certification records from recorded runs and manage
//!   their lifecycle (renew, suspend, reinstate, revoke, expiry sweep)
//!
//! Everything stays on the local machine: adapters are in-process and every
//! output is a local file or stdout.

mod badge;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};

use certkit_core::history::DEFAULT_HISTORY_FILE;
use certkit_core::lifecycle::DEFAULT_RECORDS_FILE;
use certkit_core::{
    CertHistory, CertHistoryEntry, CertRecordStore, CertificationLevel, CertificationRecord,
    CertificationScorer, ConformanceRunner, ImplementationAdapter, ReferenceAdapter, RunTarget,
    RunnerConfig, ScriptedAdapter, LEVEL_DEFINITIONS,
};

use crate::badge::render_badge;
use crate::report::{
    read_report, render_html, render_json, render_markdown, render_text, write_output,
    CertificationReport,
};

const REFERENCE_NAME: &str = "certkit-reference";

#[derive(Parser)]
#[command(name = "certkit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Protocol conformance self-assessment (local only)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run conformance checks and score the result
    Run {
        /// Comma-separated protocol ids (e.g. atp,aeap,aoap)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "level")]
        protocols: Option<Vec<String>>,

        /// Target level; runs its protocols and those of every lower level
        #[arg(short, long, value_parser = parse_level)]
        level: Option<CertificationLevel>,

        /// JSON fixture of scripted adapter responses (default: built-in reference adapter)
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Implementation name recorded in the result
        #[arg(short, long)]
        name: Option<String>,

        /// Per-check timeout in milliseconds (0 disables)
        #[arg(long)]
        check_timeout_ms: Option<u64>,

        /// Whole-run timeout in milliseconds (0 disables)
        #[arg(long)]
        run_timeout_ms: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the result to this JSONL history file
        #[arg(long, env = "CERTKIT_HISTORY_FILE")]
        history: Option<PathBuf>,

        /// Exit with an error unless at least this level is achieved
        #[arg(long, value_parser = parse_level)]
        fail_under: Option<CertificationLevel>,
    },

    /// List certification levels and their criteria
    Levels,

    /// Write an SVG badge
    Badge {
        /// Level to render
        #[arg(short, long, value_parser = parse_level, required_unless_present = "report")]
        level: Option<CertificationLevel>,

        /// Take the achieved level from a JSON report
        #[arg(long, conflicts_with = "level")]
        report: Option<PathBuf>,

        /// Output SVG path
        #[arg(short, long, default_value = "certkit-badge.svg")]
        output: PathBuf,
    },

    /// Show recorded certifications, newest first
    History {
        /// History file
        #[arg(long, env = "CERTKIT_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
        file: PathBuf,

        /// Only show entries for this implementation
        #[arg(short, long)]
        implementation: Option<String>,

        /// Maximum number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Manage certification records issued from recorded runs
    Record {
        /// Record store file
        #[arg(long, global = true, env = "CERTKIT_RECORDS_FILE", default_value = DEFAULT_RECORDS_FILE)]
        store: PathBuf,

        #[command(subcommand)]
        action: RecordAction,
    },
}

#[derive(Subcommand)]
enum RecordAction {
    /// Issue a record at the level a recorded run achieved
    Issue {
        /// History file holding the run
        #[arg(long, env = "CERTKIT_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
        history: PathBuf,

        /// Run to issue from (default: latest recorded run)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Extend a record's validity, optionally on a fresh recorded run
    Renew {
        record_id: String,

        /// History file to take the reassessment run from
        #[arg(long)]
        history: Option<PathBuf>,

        /// Reassessment run (default: latest run of the record's implementation)
        #[arg(long, requires = "history")]
        run_id: Option<String>,
    },

    /// Put a record on hold
    Suspend {
        record_id: String,
        #[arg(long)]
        reason: String,
    },

    /// Lift a suspension
    Reinstate { record_id: String },

    /// Permanently revoke a record
    Revoke {
        record_id: String,
        #[arg(long)]
        reason: String,
    },

    /// Mark every active record past its expiry as expired
    Expire,

    /// List records, newest first
    List {
        #[arg(short, long)]
        implementation: Option<String>,
    },

    /// Print a record's lifecycle events as JSON
    Events { record_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
    Html,
}

fn parse_level(raw: &str) -> std::result::Result<CertificationLevel, String> {
    raw.parse::<CertificationLevel>().map_err(|e| e.to_string())
}

struct RunArgs {
    protocols: Option<Vec<String>>,
    level: Option<CertificationLevel>,
    fixture: Option<PathBuf>,
    name: Option<String>,
    check_timeout_ms: Option<u64>,
    run_timeout_ms: Option<u64>,
    format: OutputFormat,
    output: Option<PathBuf>,
    history: Option<PathBuf>,
    fail_under: Option<CertificationLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    certkit_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            protocols,
            level,
            fixture,
            name,
            check_timeout_ms,
            run_timeout_ms,
            format,
            output,
            history,
            fail_under,
        } => {
            cmd_run(RunArgs {
                protocols,
                level,
                fixture,
                name,
                check_timeout_ms,
                run_timeout_ms,
                format,
                output,
                history,
                fail_under,
            })
            .await
        }
        Commands::Levels => cmd_levels(),
        Commands::Badge {
            level,
            report,
            output,
        } => cmd_badge(level, report.as_deref(), &output),
        Commands::History {
            file,
            implementation,
            limit,
        } => cmd_history(&file, implementation.as_deref(), limit),
        Commands::Record { store, action } => cmd_record(&CertRecordStore::new(store), action),
    }
}

/// Run, score, render, and optionally record and gate.
async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = RunnerConfig::from_env().context("Invalid CERTKIT_* environment")?;
    if args.check_timeout_ms.is_some() {
        config = config.with_check_timeout_ms(args.check_timeout_ms);
    }
    if args.run_timeout_ms.is_some() {
        config = config.with_run_timeout_ms(args.run_timeout_ms);
    }

    let adapter: Box<dyn ImplementationAdapter> = match &args.fixture {
        Some(path) => {
            let scripted = ScriptedAdapter::from_fixture_file(path)
                .with_context(|| format!("Failed to load fixture {:?}", path))?;
            if args.name.is_none() {
                if let Some(name) = scripted.implementation_name() {
                    config.implementation_name = name.to_string();
                }
            }
            Box::new(scripted)
        }
        None => {
            if std::env::var(certkit_core::config::ENV_IMPLEMENTATION_NAME).is_err() {
                config.implementation_name = REFERENCE_NAME.to_string();
            }
            Box::new(ReferenceAdapter::new())
        }
    };
    if let Some(name) = args.name {
        config.implementation_name = name;
    }

    let target = match (args.protocols, args.level) {
        (Some(protocols), _) => RunTarget::Protocols(protocols),
        (None, Some(level)) => RunTarget::Level(level),
        (None, None) => RunTarget::All,
    };

    info!(
        implementation = %config.implementation_name,
        run_target = ?target,
        "starting conformance run"
    );
    let runner = ConformanceRunner::new(config);
    let run = runner
        .run(target, adapter.as_ref())
        .await
        .context("Conformance run failed")?;
    let certification = CertificationScorer::score(&run);

    if let Some(path) = &args.history {
        let entry = CertHistory::new(path)
            .append(&run, &certification)
            .context("Failed to record history")?;
        info!(path = ?path, recorded_at = %entry.recorded_at, "history updated");
    }

    let achieved = certification.achieved_level;
    let report = CertificationReport::new(run, certification);
    let rendered = match args.format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Markdown => render_markdown(&report),
        OutputFormat::Html => render_html(&report),
    };

    match &args.output {
        Some(path) => {
            write_output(path, &rendered)?;
            println!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    if let Some(minimum) = args.fail_under {
        if achieved < minimum {
            bail!("achieved level {achieved} is below required {minimum}");
        }
    }
    Ok(())
}

fn cmd_levels() -> Result<()> {
    println!(
        "{:<10} {:>9}  {:<9}  REQUIRED PROTOCOLS",
        "LEVEL", "MIN SCORE", "BADGE"
    );
    for def in &LEVEL_DEFINITIONS {
        let protocols = def
            .required_protocols
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<10} {:>8.0}%  {:<9}  {}",
            def.level.as_str(),
            def.minimum_score * 100.0,
            def.badge_color,
            protocols
        );
    }
    Ok(())
}

fn cmd_badge(
    level: Option<CertificationLevel>,
    report: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let level = match (level, report) {
        (Some(level), _) => level,
        (None, Some(path)) => read_report(path)?.certification.achieved_level,
        (None, None) => bail!("either --level or --report is required"),
    };

    write_output(output, &render_badge(level))?;
    println!("Badge written to {}", output.display());
    match level.definition() {
        Some(def) => println!("Level: {} ({})", def.display_name, def.badge_color),
        None => println!("Level: not certified"),
    }
    Ok(())
}

fn cmd_history(file: &Path, implementation: Option<&str>, limit: usize) -> Result<()> {
    let history = CertHistory::new(file);
    let entries = match implementation {
        Some(name) => history.for_implementation(name)?,
        None => history.load_all()?,
    };

    if entries.is_empty() {
        println!("No certification history in {}", file.display());
        return Ok(());
    }

    for entry in entries.iter().rev().take(limit) {
        let cert = &entry.certification;
        println!(
            "{}  {:<24} {:<9} {:>6.1}%  run {}",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.run.implementation_name,
            cert.achieved_level.as_str(),
            cert.overall_score * 100.0,
            entry.run.run_id
        );
    }
    Ok(())
}

/// The history entry for `run_id`, else the newest for `implementation`,
/// else the newest overall.
fn pick_run(
    history: &CertHistory,
    run_id: Option<&str>,
    implementation: Option<&str>,
) -> Result<CertHistoryEntry> {
    let entry = match (run_id, implementation) {
        (Some(id), _) => history.find_run(id)?,
        (None, Some(name)) => history.for_implementation(name)?.pop(),
        (None, None) => history.latest()?,
    };
    match (entry, run_id) {
        (Some(entry), _) => Ok(entry),
        (None, Some(id)) => bail!("run {id} not found in {}", history.path().display()),
        (None, None) => bail!("no recorded runs in {}", history.path().display()),
    }
}

fn print_record(record: &CertificationRecord) {
    println!(
        "{}  {:<24} {:<9} {:<10} expires {}  renewals {}",
        record.record_id,
        record.implementation_name,
        record.level.as_str(),
        record.state.as_str(),
        record.expires_at.format("%Y-%m-%d"),
        record.renewal_count
    );
}

fn cmd_record(store: &CertRecordStore, action: RecordAction) -> Result<()> {
    let mut manager = store.load()?;
    let now = chrono::Utc::now();

    let changed: Vec<CertificationRecord> = match action {
        RecordAction::Issue { history, run_id } => {
            let entry = pick_run(&CertHistory::new(history), run_id.as_deref(), None)?;
            vec![manager.issue(&entry, now)?]
        }
        RecordAction::Renew {
            record_id,
            history,
            run_id,
        } => {
            let reassessment = match history {
                Some(path) => {
                    let implementation = manager
                        .record(&record_id)
                        .map(|r| r.implementation_name.clone());
                    Some(pick_run(
                        &CertHistory::new(path),
                        run_id.as_deref(),
                        implementation.as_deref(),
                    )?)
                }
                None => None,
            };
            vec![manager.renew(&record_id, reassessment.as_ref(), now)?]
        }
        RecordAction::Suspend { record_id, reason } => {
            vec![manager.suspend(&record_id, &reason, now)?]
        }
        RecordAction::Reinstate { record_id } => vec![manager.reinstate(&record_id, now)?],
        RecordAction::Revoke { record_id, reason } => {
            vec![manager.revoke(&record_id, &reason, now)?]
        }
        RecordAction::Expire => {
            let expired = manager.check_expirations(now);
            println!("{} record(s) expired", expired.len());
            expired
        }
        RecordAction::List { implementation } => {
            let records = match implementation.as_deref() {
                Some(name) => manager.records_for(name),
                None => manager.records(),
            };
            if records.is_empty() {
                println!("No certification records in {}", store.path().display());
            }
            records.into_iter().for_each(print_record);
            return Ok(());
        }
        RecordAction::Events { record_id } => {
            if manager.record(&record_id).is_none() {
                bail!("certification record not found: {record_id}");
            }
            println!("{}", manager.export_events_json(&record_id)?);
            return Ok(());
        }
    };

    store.save(&manager)?;
    changed.iter().for_each(print_record);
    info!(path = ?store.path(), changed = changed.len(), "record store updated");
    Ok(())
}
