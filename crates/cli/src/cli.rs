use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Streaming anomaly detection for recordings identified by ISRC.
///
/// Reads identifiers from a CSV, fetches per-recording streaming data from
/// the Luminate API (or a directory of recorded responses), and reports
/// identifiers whose streaming pattern looks manipulated.
#[derive(Parser, Debug)]
#[command(name = "streamwatch", version, about = "Streaming anomaly detection by ISRC")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and analyze every ISRC listed in a CSV file
    Analyze(AnalyzeArgs),
    /// Show how one recorded response normalizes and evaluates
    Inspect {
        /// Path to a JSON response
        response: PathBuf,
    },
    /// Print the resolved configuration with secrets redacted
    Config(ThresholdArgs),
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// CSV file with an ISRC column (first column containing "isrc")
    #[arg(long, short)]
    pub input: PathBuf,

    /// Read `<ISRC>.json` responses from this directory instead of the live API
    #[arg(long, env = "STREAMWATCH_RESPONSES_DIR")]
    pub responses: Option<PathBuf>,

    /// Directory of prior-period responses used for drop-off detection
    #[arg(long)]
    pub previous_responses: Option<PathBuf>,

    /// Start of the query window (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// End of the query window (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Location code, e.g. US
    #[arg(long)]
    pub location: Option<String>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, env = "STREAMWATCH_FORMAT", default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Evaluate identifiers on all cores
    #[arg(long)]
    pub parallel: bool,
}

/// Threshold overrides, given as fractions. Override env values.
#[derive(clap::Args, Debug, Default, Clone, Copy)]
pub struct ThresholdArgs {
    /// Flag when one DMA holds more than this share of streams
    #[arg(long)]
    pub dma_threshold: Option<f64>,

    /// Flag when the free-service share is below this
    #[arg(long)]
    pub free_min: Option<f64>,

    /// Flag when the free-service share is at or above this
    #[arg(long)]
    pub free_max: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}
