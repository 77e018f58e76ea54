//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::ChannelKind;
use std::path::PathBuf;

/// fanout - distribute one piece of content to many channels
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    author,
    version,
    about = "Multi-channel content distribution dispatcher",
    long_about = "Renders one piece of content with a template variant and delivers it \n\
                  concurrently to chat, social, issue-tracker and webhook channels, \n\
                  reporting per-channel success and connector health."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus exporter port (omit to disable)
    #[arg(long, global = true, env = "FANOUT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Distribute content to channels
    Distribute(DistributeArgs),

    /// Show connector health
    Status(StatusArgs),

    /// Validate configuration file without sending anything
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `distribute` command
#[derive(Parser, Debug, Clone)]
pub struct DistributeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Content title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Content body
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the content body from a file
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Link to the full content
    #[arg(long)]
    pub link: Option<String>,

    /// Tags (comma-separated or repeated)
    #[arg(long = "tag", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Metadata entries as key=value
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Envelope id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Target channels (defaults to the configured default channels)
    #[arg(long = "channel", value_delimiter = ',', value_parser = parse_channel)]
    pub channels: Vec<ChannelKind>,

    /// Render every channel with this template variant
    #[arg(long)]
    pub variant: Option<String>,

    /// Per-send timeout in milliseconds (overrides configuration)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Concurrent connector calls (overrides configuration)
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Probe every connector before reporting
    #[arg(long)]
    pub probe: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "fanout.toml", env = "FANOUT_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show template variants
    #[arg(long)]
    pub templates: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

fn parse_channel(raw: &str) -> Result<ChannelKind, String> {
    raw.parse::<ChannelKind>().map_err(|e| e.to_string())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
