//! The `scan` subcommand, grounded in
//! `deepbrainspace-guardy/src/cli/commands/scan.rs`'s `ScanArgs`, narrowed
//! to the flags this engine's config actually recognizes.

use crate::cli::Output;
use crate::config::{load_config, ScanConfig};
use crate::engine;
use crate::finding::Severity;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Args)]
pub struct ScanArgs {
    /// Directory to scan.
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Maximum file size to scan, in megabytes.
    #[arg(long)]
    pub max_file_size_mb: Option<u64>,

    /// Follow symbolic links while walking the tree.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Disable entropy-based detection (faster, less thorough).
    #[arg(long)]
    pub no_entropy: bool,

    /// Minimum confidence a finding must reach to be reported.
    #[arg(long)]
    pub confidence_floor: Option<f32>,

    /// Additional path globs to exclude.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Exit non-zero if any finding meets or exceeds this severity.
    #[arg(long, value_enum)]
    pub fail_on: Option<SeverityArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SeverityArg {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

pub fn execute(args: ScanArgs, config_path: Option<&str>) -> Result<i32> {
    let output = Output::new(false);

    let mut config: ScanConfig =
        load_config(&args.path, config_path.map(std::path::Path::new)).context("loading scan configuration")?;

    if let Some(max_mb) = args.max_file_size_mb {
        config.max_file_bytes = max_mb * 1024 * 1024;
    }
    if args.no_entropy {
        config.detectors.entropy = false;
    }
    if let Some(floor) = args.confidence_floor {
        config.confidence_floor = floor;
    }
    config.exclude_patterns.extend(args.exclude);
    config.follow_symlinks = args.follow_symlinks;
    let failure_threshold: Severity = args.fail_on.map(Into::into).unwrap_or(config.failure_threshold);
    config.failure_threshold = failure_threshold;

    output.info(&format!("scanning {}", args.path.display()));
    let progress_bar = output.progress_bar(0);
    let result = engine::scan(
        &args.path,
        &config,
        Some(&|scanned, total| {
            if progress_bar.length() != Some(total as u64) {
                progress_bar.set_length(total as u64);
            }
            progress_bar.set_position(scanned as u64);
        }),
        None,
    )?;
    progress_bar.finish_and_clear();

    match args.format {
        OutputFormat::Text => output.report(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output.report_json(&result))?),
    }

    let exit_code = match result.max_severity() {
        Some(severity) if severity >= failure_threshold => 1,
        _ => 0,
    };
    Ok(exit_code)
}
