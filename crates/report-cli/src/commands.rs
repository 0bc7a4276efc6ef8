//! Command handlers for CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use report_cache::{CacheConfig, FetchSource, FsCacheStorage, HttpFetcher, OfflineCache};
use report_core::AppConfig;
use report_models::{ReportPayload, SubmissionId};
use report_persistence::PendingStore;
use report_sync::{
    ConnectivityMonitor, HttpDelivery, SubmitOutcome, Submitter, SyncConfig, SyncCoordinator,
    SyncEvent, SyncRuntime,
};
use report_validation::{FieldKey, FormEvent, ReportForm, SubmitDecision};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::{CacheCommand, Commands, OutputFormat, QueueCommand};
use crate::health::HealthProbe;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub async fn execute(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Submit { file } => cmd_submit(config, &file).await,
        Commands::Queue { command } => match command {
            QueueCommand::List { format } => cmd_queue_list(config, format),
            QueueCommand::Remove { id } => cmd_queue_remove(config, SubmissionId::new(id)),
        },
        Commands::Sync => cmd_sync(config).await,
        Commands::Health => cmd_health(config).await,
        Commands::Cache { command } => cmd_cache(config, command).await,
        Commands::Watch => cmd_watch(config).await,
    }
}

/// Reads a report file.
pub fn load_report(path: &Path) -> Result<ReportPayload> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))?;
    let payload = ReportPayload::from_value(value)
        .map_err(|e| format!("{} is not a report: {}", path.display(), e))?;
    Ok(payload)
}

/// Runs the form's submit check over a payload, after leaving every
/// evaluation field as a user would.
///
/// Returns the normalized payload, or every field error in document order.
pub fn check_report(payload: &ReportPayload) -> std::result::Result<ReportPayload, Vec<(FieldKey, String)>> {
    let mut form = ReportForm::from_payload(payload);
    for key in form.field_keys() {
        if key.is_evaluation() {
            form.dispatch(FormEvent::Blur(key));
        }
    }
    match form.dispatch(FormEvent::Submit) {
        Some(SubmitDecision::Accepted(normalized)) => Ok(normalized),
        _ => Err(form.errors()),
    }
}

fn checked_report(path: &Path) -> Result<ReportPayload> {
    let payload = load_report(path)?;
    check_report(&payload).map_err(|errors| {
        for (key, message) in &errors {
            println!("  {}: {}", key, message);
        }
        format!("{} has {} invalid field(s)", path.display(), errors.len()).into()
    })
}

fn sync_config(config: &AppConfig) -> Result<SyncConfig> {
    let mut sync = SyncConfig::new(config.api_url.as_str())?
        .with_stall_threshold(config.stall_threshold);
    if let Some(key) = &config.api_key {
        sync = sync.with_api_key(key.clone());
    }
    Ok(sync)
}

fn health_probe(config: &AppConfig, sync: &SyncConfig) -> Result<HealthProbe> {
    Ok(HealthProbe::new(sync.health_url()?, config.probe_timeout)?)
}

fn offline_cache(config: &AppConfig) -> Result<OfflineCache> {
    let cache_config = CacheConfig::new(
        config.cache_prefix.clone(),
        config.cache_version.clone(),
        config.app_scope.as_str(),
    )?;
    Ok(OfflineCache::new(
        cache_config,
        Arc::new(FsCacheStorage::new(config.cache_dir())),
        Arc::new(HttpFetcher::new()),
    ))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let normalized = checked_report(file)?;
    println!("Report is valid.");
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}

async fn cmd_submit(config: &AppConfig, file: &Path) -> Result<()> {
    let payload = checked_report(file)?;
    let sync = sync_config(config)?;
    let online = health_probe(config, &sync)?.check().await;

    let store = Arc::new(PendingStore::new(config.pending_dir()));
    let delivery = Arc::new(HttpDelivery::new(&sync)?);
    let submitter = Submitter::new(store, delivery, Arc::new(ConnectivityMonitor::new(online)));

    match submitter.submit(payload.to_value()).await? {
        SubmitOutcome::Delivered(response) => {
            println!("Report delivered.");
            if !response.is_null() {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        SubmitOutcome::Queued(id) => {
            println!("Report not delivered; queued as #{}.", id);
            println!("Run `report-app sync` or `report-app watch` to deliver it later.");
        }
    }
    Ok(())
}

fn cmd_queue_list(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let store = PendingStore::new(config.pending_dir());
    let pending = store.list_all()?;

    match format {
        OutputFormat::Table => {
            if pending.is_empty() {
                println!("No pending submissions.");
                return Ok(());
            }
            println!("{:<6} {:<20} {:<9} {}", "ID", "QUEUED", "ATTEMPTS", "TICKET");
            println!("{}", "-".repeat(50));
            for record in &pending {
                let ticket = record
                    .data
                    .get("ticket_number")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let stalled = if record.is_stalled(config.stall_threshold) {
                    " (stalled)"
                } else {
                    ""
                };
                println!(
                    "{:<6} {:<20} {:<9} {}{}",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.attempts,
                    ticket,
                    stalled
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
    }
    Ok(())
}

fn cmd_queue_remove(config: &AppConfig, id: SubmissionId) -> Result<()> {
    let store = PendingStore::new(config.pending_dir());
    if store.get(id)?.is_none() {
        return Err(format!("No pending submission #{}", id).into());
    }
    store.remove(id)?;
    info!(id = %id, "pending submission removed by operator");
    println!("Removed pending submission #{}.", id);
    Ok(())
}

async fn cmd_sync(config: &AppConfig) -> Result<()> {
    let sync = sync_config(config)?;
    let store = Arc::new(PendingStore::new(config.pending_dir()));
    let delivery = Arc::new(HttpDelivery::new(&sync)?);
    let coordinator = SyncCoordinator::new(sync, store, delivery);

    let report = coordinator.run_once().await?;
    if report.attempted == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }
    println!(
        "Synced {} of {} pending submission(s).",
        report.delivered.len(),
        report.attempted
    );
    if !report.failed.is_empty() {
        println!("  Still queued: {}", join_ids(&report.failed));
    }
    if !report.stalled.is_empty() {
        println!("  Stalled: {}", join_ids(&report.stalled));
    }
    Ok(())
}

fn join_ids(ids: &[SubmissionId]) -> String {
    ids.iter()
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn cmd_health(config: &AppConfig) -> Result<()> {
    let sync = sync_config(config)?;
    let probe = health_probe(config, &sync)?;
    if probe.check().await {
        println!("Service is up ({}).", probe.url());
        Ok(())
    } else {
        Err(format!("Service is unreachable ({})", probe.url()).into())
    }
}

async fn cmd_cache(config: &AppConfig, command: CacheCommand) -> Result<()> {
    let cache = offline_cache(config)?;
    let name = cache.config().cache_name();

    match command {
        CacheCommand::Install => {
            cache.install().await?;
            println!("Installed {}.", name);
        }
        CacheCommand::Activate => {
            let report = cache.activate().await?;
            println!("Activated {}.", name);
            for stale in &report.deleted {
                println!("  Deleted {}", stale);
            }
        }
        CacheCommand::Fetch { url } => {
            let fetched = cache.fetch(&url).await?;
            let source = match &fetched.source {
                FetchSource::Cache(name) => format!("cache {}", name),
                FetchSource::Network => "network".to_string(),
            };
            println!(
                "{} {} ({} bytes, from {})",
                fetched.response.status,
                fetched.response.url,
                fetched.response.body.len(),
                source
            );
        }
        CacheCommand::Status => {
            let status = cache.status()?;
            println!("Current: {}", status.cache_name);
            println!("State:   {:?}", status.state);
            if status.stored.is_empty() {
                println!("Stored:  (none)");
            } else {
                println!("Stored:  {}", status.stored.join(", "));
            }
        }
    }
    Ok(())
}

async fn cmd_watch(config: &AppConfig) -> Result<()> {
    let sync = sync_config(config)?;
    let probe = health_probe(config, &sync)?;
    let store = Arc::new(PendingStore::new(config.pending_dir()));
    let delivery = Arc::new(HttpDelivery::new(&sync)?);

    let mut runtime = SyncRuntime::new(SyncCoordinator::new(sync, store, delivery));
    let monitor = ConnectivityMonitor::new(false).with_trigger(runtime.trigger());
    let mut events = runtime.subscribe();
    runtime.start()?;

    println!("Watching {} every {:?}", probe.url(), config.probe_interval);
    println!("   Press Ctrl+C to stop\n");

    let mut ticker = tokio::time::interval(config.probe_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let online = probe.check().await;
                monitor.set_online(online);
                if online {
                    // `submit` runs in its own process and cannot signal this one
                    if let Err(e) = runtime.request_if_pending() {
                        warn!(error = %e, "cannot inspect pending queue");
                    }
                }
            }
            event = events.recv() => match event {
                Ok(SyncEvent::PassCompleted(report)) if report.attempted > 0 => {
                    println!(
                        "Sync pass: {} delivered, {} still queued",
                        report.delivered.len(),
                        report.failed.len()
                    );
                }
                Ok(SyncEvent::Stalled { id, attempts }) => {
                    println!("Submission #{} stalled after {} attempts", id, attempts);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "sync event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    runtime.shutdown().await?;
    Ok(())
}
