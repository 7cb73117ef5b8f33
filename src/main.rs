//! registry-census - citizen count analytics for a population registry
//!
//! A CLI tool that walks the country → territory → district → seat
//! hierarchy of a registry REST API (or a JSON snapshot of it) and
//! reports citizen counts at every level.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (registry unreachable, config, bad selection, etc.)
//!   2 - Counts incomplete and --fail-on-incomplete was set

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod registry;
mod report;
mod selection;

use analysis::{Aggregator, RefreshTracker, RunSlot, RunTicket};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use error::{AggregateError, SelectionError};
use indicatif::{ProgressBar, ProgressStyle};
use models::{CensusReport, ReportMetadata};
use registry::{HttpRegistry, InMemoryRegistry, Registry};
use report::ReportOptions;
use selection::Selection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where the effective configuration came from.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    /// The default file exists but could not be used.
    Fallback(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("registry-census v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Fallback(reason) => warn!("Failed to load config: {}", reason),
    }

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .registry-census.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your registry and choose a report format.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence when set.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    let level = level.to_string().to_lowercase();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,registry_census={}", level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(format!("{:#}", e)))),
    }
}

/// Pick the registry backend and run the requested mode.
async fn run(args: Args, config: Config) -> Result<i32> {
    match config.registry.snapshot.clone() {
        Some(path) => {
            let registry = InMemoryRegistry::load(&path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            dispatch(Arc::new(registry), &args, &config).await
        }
        None => {
            info!(
                "Using registry at {} (timeout {}s)",
                config.registry.base_url, config.registry.timeout_seconds
            );
            let registry =
                HttpRegistry::new(&config.registry.base_url, config.registry.timeout_seconds)?;
            dispatch(Arc::new(registry), &args, &config).await
        }
    }
}

async fn dispatch<R: Registry + 'static>(
    registry: Arc<R>,
    args: &Args,
    config: &Config,
) -> Result<i32> {
    if args.list_citizens {
        return list_citizens(registry.as_ref(), args, config).await;
    }
    if let Some(interval) = args.watch {
        return watch(registry, args, config, interval).await;
    }

    let tracker: RefreshTracker<CensusReport> = RefreshTracker::new();
    let ticket = tracker.begin();

    let report = match run_census(registry.as_ref(), args.country, ticket, !args.quiet).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            eprintln!("\n❌ Error: {}", e);
            eprintln!(
                "   No counts could be computed. Check the registry is reachable and try again."
            );
            return Ok(1);
        }
    };

    emit_report(&report, args, config)?;

    if let Some(ref output) = args.output {
        print_summary(&report, output);
    }

    Ok(exit_code(&report, args))
}

/// Run one aggregation and wrap it in report metadata.
async fn run_census<R: Registry>(
    registry: &R,
    country_filter: Option<u64>,
    ticket: RunTicket,
    show_progress: bool,
) -> Result<CensusReport, AggregateError> {
    let start_time = Instant::now();

    let spinner = show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message("Counting citizens at all levels...");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let result = Aggregator::new(registry).load(country_filter).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    Ok(CensusReport {
        metadata: ReportMetadata {
            source: registry.describe(),
            generated_at: Utc::now(),
            country_filter,
            duration_seconds: start_time.elapsed().as_secs_f64(),
            run_sequence: ticket.sequence,
        },
        result: result?,
    })
}

/// Recount on a fixed interval until Ctrl-C.
///
/// Each run is its own task and only one is ever in flight: a tick that
/// fires while the previous count is still running is skipped. Results go
/// through the tracker, so a run that was overtaken is dropped rather than
/// shown.
async fn watch<R: Registry + 'static>(
    registry: Arc<R>,
    args: &Args,
    config: &Config,
    interval_secs: u64,
) -> Result<i32> {
    let tracker: RefreshTracker<CensusReport> = RefreshTracker::new();
    let mut slot: RunSlot<Result<CensusReport, AggregateError>> = RunSlot::new();

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let country_filter = args.country;
    info!("Recounting every {}s, press Ctrl-C to stop", interval_secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let registry = Arc::clone(&registry);
                let started = slot.try_start(&tracker, move |ticket| async move {
                    run_census(registry.as_ref(), country_filter, ticket, false).await
                });
                match started {
                    Some(ticket) => debug!("Started run {}", ticket.sequence),
                    None => info!("Previous count still running, skipping this tick"),
                }
            }
            (ticket, outcome) = slot.finished() => {
                match outcome {
                    Ok(Ok(report)) => {
                        if tracker.commit(ticket, report.clone()) {
                            emit_report(&report, args, config)?;
                        } else {
                            info!("Discarded stale results from run {}", ticket.sequence);
                        }
                    }
                    Ok(Err(e)) => warn!("Run {} failed: {}", ticket.sequence, e),
                    Err(e) => warn!("Run {} did not complete: {}", ticket.sequence, e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if slot.is_running() {
                    info!("Stopping, abandoning the count in progress");
                } else {
                    info!("Stopping");
                }
                slot.abort();
                break;
            }
        }
    }

    Ok(tracker
        .latest()
        .map(|report| exit_code(&report, args))
        .unwrap_or(0))
}

/// Handle --list-citizens: resolve the selection and print its citizens.
async fn list_citizens<R: Registry>(registry: &R, args: &Args, config: &Config) -> Result<i32> {
    let selection = Selection::from_ids(args.country, args.territory, args.district, args.seat)?;
    selection.verify(registry).await?;

    let scope = selection
        .citizen_scope()
        .ok_or(SelectionError::NoCitizenScope)?;
    if !selection.is_complete() {
        debug!("No seat selected, listing the whole district");
    }

    let citizens = scope.fetch(registry).await.with_context(|| {
        format!(
            "Failed to list citizens for {} {}",
            scope.level(),
            scope.id()
        )
    })?;
    info!(
        "Found {} citizens in {} {}",
        citizens.len(),
        scope.level(),
        scope.id()
    );

    let content = report::render_citizen_listing(scope, &citizens, config.report.format)?;
    write_output(&content, args.output.as_deref())?;

    Ok(0)
}

fn emit_report(report: &CensusReport, args: &Args, config: &Config) -> Result<()> {
    let options = ReportOptions::from(&config.report);
    let content = report::render_report(report, config.report.format, &options)?;
    write_output(&content, args.output.as_deref())
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn print_summary(report: &CensusReport, output: &Path) {
    let result = &report.result;

    println!("\n📊 Census Summary:");
    println!("   Total citizens: {}", result.total_citizens);
    println!(
        "   Countries: {} | Territories: {} | Districts: {} | Seats: {}",
        result.country_counts.len(),
        result.territory_counts.len(),
        result.district_counts.len(),
        result.seat_counts.len()
    );
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    if !result.is_complete() {
        println!(
            "   ⚠️  {} fetches failed; data may be incomplete",
            result.failures.len()
        );
    }
    println!("\n✅ Report saved to: {}", output.display());
}

fn exit_code(report: &CensusReport, args: &Args) -> i32 {
    if args.fail_on_incomplete && !report.result.is_complete() {
        eprintln!(
            "\n⛔ {} fetches failed. Failing (exit code 2).",
            report.result.failures.len()
        );
        2
    } else {
        0
    }
}
