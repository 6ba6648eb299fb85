mod args;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hedra_batch_core::events::EventEnvelope;
use hedra_batch_core::{
    create_event_system, load_config_or_default, resolve, validate_config, BatchEvent,
    BatchOrchestrator, BatchReport, EventSink, FileEventSink, FsResultWriter, HedraClient,
    RemoteJobClient, ResultWriter, SanitizedConfig,
};

use args::Cli;

/// Buffer size for the run log channel
const EVENT_BUFFER_SIZE: usize = 256;

/// Exit code for configuration and input errors
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli).await {
        Ok(report) => std::process::exit(report::exit_code(&report)),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run(cli: Cli) -> Result<BatchReport> {
    if let Some(path) = &cli.config {
        info!("Loading configuration from {:?}", path);
    }
    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    validate_config(&config).context("Configuration validation failed")?;

    let api_key = match cli.api_key.clone().or_else(|| config.api.api_key.clone()) {
        Some(key) if !key.trim().is_empty() => key,
        _ => bail!("No API key provided: pass --api_key or set HEDRA_API_KEY"),
    };

    info!(
        "Configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    let output_dir = cli.output_folder();
    let log_path = output_dir.join(&config.output.log_file);

    // Input problems are fatal and must surface before anything is submitted.
    let input = match resolve(&cli.input_folder, &config.input) {
        Ok(input) => input,
        Err(e) => {
            log_aborted(&log_path, &e.to_string());
            return Err(e)
                .with_context(|| format!("Invalid input folder {:?}", cli.input_folder));
        }
    };

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output folder {:?}", output_dir))?;

    let sink: Arc<dyn EventSink> = Arc::new(
        FileEventSink::open(&log_path).context("Failed to open run log")?,
    );
    let (events, event_writer) = create_event_system(sink, EVENT_BUFFER_SIZE);
    let writer_task = tokio::spawn(event_writer.run());
    info!("Writing run log to {:?}", log_path);

    let hedra = HedraClient::new(&config.api, &api_key).context("Failed to create API client")?;
    info!("Using Hedra API at {}", hedra.base_url());
    let client: Arc<dyn RemoteJobClient> = Arc::new(hedra);
    let writer: Arc<dyn ResultWriter> = Arc::new(FsResultWriter::new(&config.output));

    let orchestrator = BatchOrchestrator::new(
        config.orchestrator.clone(),
        client,
        writer,
        Some(events),
    );

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next safe point");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&input, &cli.prompt, &output_dir).await;

    // The orchestrator holds the last event handle; dropping it lets the
    // writer drain and exit.
    drop(orchestrator);
    if let Err(e) = writer_task.await {
        warn!("Run log writer failed: {}", e);
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        report::print_report(&report);
    }

    Ok(report)
}

/// Record a batch that never started in the run log.
///
/// Only written when the output folder already exists; an invalid input
/// folder must not cause folders to be created.
fn log_aborted(log_path: &Path, reason: &str) {
    let in_existing_dir = log_path.parent().is_some_and(Path::is_dir);
    if !in_existing_dir {
        return;
    }

    let event = BatchEvent::BatchAborted {
        reason: reason.to_string(),
    };
    let result = FileEventSink::open(log_path)
        .and_then(|sink| sink.append(&EventEnvelope::new(event)));
    if let Err(e) = result {
        warn!("Failed to write run log {:?}: {}", log_path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_aborted_writes_error_line() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("hedra_batch.log");

        log_aborted(&log_path, "No character image found in /in");

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents
            .trim_end()
            .ends_with(" - ERROR - Batch processing failed: No character image found in /in"));
    }

    #[test]
    fn test_log_aborted_skips_missing_folder() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        log_aborted(&missing.join("hedra_batch.log"), "Input folder not found");

        assert!(!missing.exists());
    }
}
