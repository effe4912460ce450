mod cli;
mod config;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use streamwatch_connector::{fetch_batch, Fetcher, FixtureFetcher, LuminateClient};
use streamwatch_core::config::load_dotenv;
use streamwatch_core::{isrcs_from_csv, Config, FetchQuery};
use streamwatch_rules::{
    analyze_batch_parallel_with_history, analyze_batch_with_history, BatchReport, Detector,
    DiagnosticLog,
};

use crate::cli::{AnalyzeArgs, CliArgs, Command, OutputFormat, ThresholdArgs};
use crate::config::resolve_detector_config;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    // stdout is reserved for reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env();

    match args.command {
        Command::Analyze(analyze) => run_analyze(&config, analyze).await,
        Command::Inspect { response } => run_inspect(&config, &response),
        Command::Config(overrides) => run_config(&config, &overrides),
    }
}

// ── analyze ─────────────────────────────────────────────────────────

async fn run_analyze(config: &Config, args: AnalyzeArgs) -> Result<()> {
    config.log_summary();
    let detector = Detector::new(resolve_detector_config(config.thresholds, &args.thresholds)?);

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let isrcs = isrcs_from_csv(&text)
        .with_context(|| format!("failed to parse ISRCs from {}", args.input.display()))?;
    info!(count = isrcs.len(), "loaded ISRCs");

    let query = FetchQuery::parse(
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        args.location.as_deref(),
    )
    .context("invalid query window")?;

    let (fetcher, delay): (Box<dyn Fetcher>, Duration) = match &args.responses {
        Some(dir) => {
            info!(dir = %dir.display(), "reading recorded responses");
            let fixtures: Box<dyn Fetcher> = Box::new(FixtureFetcher::new(dir));
            (fixtures, Duration::ZERO)
        }
        None => {
            let client: Box<dyn Fetcher> = Box::new(
                LuminateClient::from_config(&config.luminate)
                    .context("failed to create Luminate client")?,
            );
            (client, Duration::from_millis(config.luminate.request_delay_ms))
        }
    };

    let outcomes = fetch_batch(fetcher.as_ref(), &isrcs, &query, delay).await;

    let previous = match &args.previous_responses {
        Some(dir) => load_previous(dir, &isrcs).await,
        None => HashMap::new(),
    };

    let report = if args.parallel {
        analyze_batch_parallel_with_history(&detector, &outcomes, &previous)
    } else {
        analyze_batch_with_history(&detector, &outcomes, &previous)
    };

    write_report(&report, args.format, args.output.as_deref())?;

    let summary = report.summary();
    eprintln!(
        "{} analyzed, {} flagged, {} without data, {} fetch failures",
        summary.total, summary.flagged, summary.no_data, summary.fetch_failed
    );
    let failed = report.failed_identifiers();
    if !failed.is_empty() {
        warn!(isrcs = ?failed, "{} identifiers could not be fetched", failed.len());
    }
    Ok(())
}

async fn load_previous(dir: &Path, isrcs: &[String]) -> HashMap<String, Value> {
    let fetcher = FixtureFetcher::new(dir);
    let outcomes = fetch_batch(&fetcher, isrcs, &FetchQuery::default(), Duration::ZERO).await;
    let previous: HashMap<String, Value> = outcomes
        .into_iter()
        .filter_map(|(isrc, outcome)| Some((isrc, outcome.response()?)))
        .collect();
    info!(count = previous.len(), "loaded prior-period responses");
    previous
}

fn write_report(report: &BatchReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let rendered = match format {
        OutputFormat::Csv => report.to_csv(),
        OutputFormat::Json => report.to_json().context("failed to serialize report")?,
    };
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

// ── inspect ─────────────────────────────────────────────────────────

fn run_inspect(config: &Config, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let response: Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))?;

    let log = Arc::new(DiagnosticLog::new());
    let detector = Detector::new(resolve_detector_config(
        config.thresholds,
        &ThresholdArgs::default(),
    )?)
    .with_sink(log.clone());

    let identifier = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let flat = detector.extract(&response);
    let analysis = detector.analyze_flat(&identifier, flat.as_ref(), None);

    let out = serde_json::json!({
        "response": response,
        "flat_metrics": flat,
        "analysis": analysis,
        "diagnostics": log.events(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

// ── config ──────────────────────────────────────────────────────────

fn run_config(config: &Config, overrides: &ThresholdArgs) -> Result<()> {
    let detector_config = resolve_detector_config(config.thresholds, overrides)?;
    let out = serde_json::json!({
        "config": config.redacted_summary(),
        "detector": detector_config,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
