//! The immutable configuration record the engine consumes, plus a thin
//! `figment`-based loader. Grounded in
//! `deepbrainspace-guardy/src/config/core.rs`'s `Figment` composition
//! (defaults embedded at compile time, then a file, then environment
//! variables) — unlike that file, this crate has exactly one config type,
//! not two competing `GuardyConfig` definitions.

pub mod loader;

use crate::filters::TestFilePolicy;
use crate::finding::{SecretType, Severity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use loader::{load_config, ConfigLoadError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSwitches {
    pub pattern: bool,
    pub entropy: bool,
    pub context: bool,
}

impl Default for DetectorSwitches {
    fn default() -> Self {
        DetectorSwitches { pattern: true, entropy: true, context: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    pub path_substrings: Vec<String>,
    pub exact_paths: Vec<String>,
    pub value_patterns: Vec<String>,
    pub line_patterns: Vec<String>,
    pub comment_marker: String,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        WhitelistConfig {
            path_substrings: Vec::new(),
            exact_paths: Vec::new(),
            value_patterns: Vec::new(),
            line_patterns: Vec::new(),
            comment_marker: "leakguard-ignore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
    pub severity: Severity,
    pub secret_type: SecretType,
}

fn serde_test_file_policy_default() -> TestFilePolicyConfig {
    TestFilePolicyConfig::Relaxed
}

/// Serde-friendly mirror of [`TestFilePolicy`] (which lives in `filters`
/// and intentionally carries no serde derive of its own, since it is an
/// engine-internal enum the config layer merely selects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestFilePolicyConfig {
    IncludeAll,
    ExcludeAll,
    Relaxed,
    IntegrationOnly,
}

impl From<TestFilePolicyConfig> for TestFilePolicy {
    fn from(value: TestFilePolicyConfig) -> Self {
        match value {
            TestFilePolicyConfig::IncludeAll => TestFilePolicy::IncludeAll,
            TestFilePolicyConfig::ExcludeAll => TestFilePolicy::ExcludeAll,
            TestFilePolicyConfig::Relaxed => TestFilePolicy::Relaxed,
            TestFilePolicyConfig::IntegrationOnly => TestFilePolicy::IntegrationOnly,
        }
    }
}

/// The scan engine's full, immutable configuration. Built once per
/// invocation (by [`load_config`] or [`ScanConfig::defaults`]) and shared
/// by value with every worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub included_extensions: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub detectors: DetectorSwitches,
    pub entropy_threshold: f64,
    pub min_candidate_length: usize,
    pub max_candidate_length: usize,
    pub confidence_floor: f32,
    pub failure_threshold: Severity,
    pub max_concurrency: usize,
    pub max_file_bytes: u64,
    pub max_line_bytes: u64,
    pub allow_long_lines: bool,
    pub enable_caching: bool,
    pub cache_capacity: usize,
    pub whitelist: WhitelistConfig,
    #[serde(default = "serde_test_file_policy_default")]
    pub test_file_policy: TestFilePolicyConfig,
    pub custom_patterns: Vec<CustomPattern>,
    pub follow_symlinks: bool,
    pub progress_interval: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            root: PathBuf::from("."),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            included_extensions: Vec::new(),
            excluded_extensions: Vec::new(),
            detectors: DetectorSwitches::default(),
            entropy_threshold: 3.5,
            min_candidate_length: 12,
            max_candidate_length: 256,
            confidence_floor: 0.3,
            failure_threshold: Severity::High,
            max_concurrency: 8,
            max_file_bytes: 10 * 1024 * 1024,
            max_line_bytes: 10_000,
            allow_long_lines: false,
            enable_caching: true,
            cache_capacity: 4096,
            whitelist: WhitelistConfig::default(),
            test_file_policy: TestFilePolicyConfig::Relaxed,
            custom_patterns: Vec::new(),
            follow_symlinks: false,
            progress_interval: 50,
        }
    }
}

impl ScanConfig {
    /// Built-in defaults with no file or environment overlay — used by
    /// tests and as the loader's base layer.
    pub fn defaults() -> Self {
        ScanConfig::default()
    }
}
