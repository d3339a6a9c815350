//! lapse - warn before, stop after
//!
//! Entry point for a single notify or execute run. It wires together:
//! - Configuration loading and command-line overrides
//! - The inventory snapshot provider
//! - The executor chain (journal or dry run, optionally behind a webhook)
//! - The run history store
//! - The core runner

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::Parser;
use lapse_api::{LifecycleAction, RunMode, RunReport};
use lapse_cloud_api::ActionExecutor;
use lapse_config::{Policy, is_valid_channel, load_config};
use lapse_core::Runner;
use lapse_providers::{DryRunExecutor, JournalExecutor, JsonInventoryProvider, WebhookNotifier};
use lapse_store::{SqliteStore, Store};
use lapse_util::{
    LAPSE_CONFIG_ENV, LAPSE_DATA_DIR_ENV, at_local_noon, database_path_in, default_config_path,
    parse_tag_date,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// lapse - Warn about and stop cloud instances past their "Stop after" date
#[derive(Parser, Debug)]
#[command(name = "lapse", version)]
#[command(about = "Warn about and stop cloud instances past their stop-after date", long_about = None)]
struct Args {
    /// Run mode: "notify" only reports and annotates, "execute" also stops
    mode: RunMode,

    /// Configuration file path (default: ~/.config/lapse/config.toml, optional)
    #[arg(short, long, env = LAPSE_CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Channel override for notifications
    #[arg(long)]
    channel: Option<String>,

    /// Log instructions instead of carrying them out
    #[arg(long)]
    dry_run: bool,

    /// Inventory snapshot override
    #[arg(long)]
    inventory: Option<PathBuf>,

    /// Directory holding the run history database
    #[arg(short, long, env = LAPSE_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    today: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn load_policy(args: &Args) -> Result<Policy> {
    let mut policy = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?
            } else {
                info!(path = %path.display(), "No config file, using defaults");
                Policy::default()
            }
        }
    };

    if let Some(channel) = &args.channel {
        if !is_valid_channel(channel) {
            bail!("Invalid channel {:?}: expected '#' followed by letters, digits or '-'", channel);
        }
        policy.notifications.channel = channel.clone();
    }

    if let Some(inventory) = &args.inventory {
        policy.service.inventory_path = inventory.clone();
    }

    if let Some(data_dir) = &args.data_dir {
        policy.service.data_dir = data_dir.clone();
    }

    Ok(policy)
}

/// The evaluation time: noon on `--today`, else the (possibly mocked) clock
fn resolve_now(today: Option<&str>) -> Result<DateTime<Local>> {
    match today {
        Some(value) => {
            let date = parse_tag_date(value)
                .with_context(|| format!("Invalid --today {:?}, expected YYYY-MM-DD", value))?;
            at_local_noon(date).with_context(|| format!("No local noon on {}", date))
        }
        None => Ok(lapse_util::now()),
    }
}

fn build_executor(policy: &Policy, dry_run: bool) -> Result<Arc<dyn ActionExecutor>> {
    if dry_run {
        return Ok(Arc::new(DryRunExecutor::new()));
    }

    let journal: Arc<dyn ActionExecutor> =
        Arc::new(JournalExecutor::new(&policy.service.journal_path));

    match &policy.notifications.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(
                url.clone(),
                policy.notifications.max_messages_per_second,
                journal,
            )
            .context("Failed to set up webhook notifier")?;
            Ok(Arc::new(notifier))
        }
        None => Ok(journal),
    }
}

fn print_report(report: &RunReport) {
    let counts = report.counts();
    println!(
        "{} run{} at {}: {} instances ({} running), {} to warn, {} to stop",
        report.mode,
        if report.dry_run { " (dry run)" } else { "" },
        lapse_util::format_datetime_full(&report.evaluated_at),
        counts.total,
        counts.running,
        counts.warn,
        counts.stop,
    );

    for action in [LifecycleAction::Stop, LifecycleAction::Warn] {
        for entry in report.entries_with(action) {
            println!(
                "  {:<4}  {:<20}  {:<24}  {}",
                action.as_str(),
                entry.instance.id.as_str(),
                entry.instance.display_name(),
                entry.decision.reason
            );
        }
    }

    for outcome in report.failed_outcomes() {
        println!(
            "  FAILED {} {}: {:?}",
            outcome.instruction.kind(),
            outcome.instruction.instance_id(),
            outcome.status
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %args.mode,
        "lapse starting"
    );

    let policy = load_policy(&args)?;
    let now = resolve_now(args.today.as_deref())?;
    if lapse_util::is_mock_time_active() {
        warn!(now = %now, "Mock time is active");
    }

    let data_dir = policy.service.data_dir.clone();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = database_path_in(&data_dir);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    info!(db_path = %db_path.display(), healthy = store.is_healthy(), "Store initialized");

    let provider = Arc::new(JsonInventoryProvider::new(&policy.service.inventory_path));
    let executor = build_executor(&policy, args.dry_run)?;

    info!(
        inventory = %policy.service.inventory_path.display(),
        journal = %policy.service.journal_path.display(),
        channel = %policy.notifications.channel,
        dry_run = executor.is_dry_run(),
        "Collaborators ready"
    );

    let runner = Runner::new(policy, provider, executor, store.clone()).with_sink(store);

    let report = runner
        .run(args.mode, now)
        .await
        .with_context(|| format!("{} run failed", args.mode))?;

    print_report(&report);

    let failures = report.failed_outcomes().count();
    if failures > 0 {
        warn!(failures, "Some instructions failed");
    }

    Ok(())
}
