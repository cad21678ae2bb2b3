//! The three independent detection strategies plus the composite
//! orchestrator that fans out to them. Grounded in
//! `deepbrainspace-guardy/src/scanner/core.rs` (the `Scanner` struct's
//! per-file detect loop) and `scanner/parallel.rs` (concurrent execution of
//! detector-equivalent work), generalized into a trait so each strategy is
//! a swappable implementation.

pub mod composite;
pub mod context;
pub mod entropy;
pub mod pattern;

use crate::error::ScanError;
use crate::finding::Finding;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use composite::{CompositeDetector, DedupStrategy, ExecutionMode, MergeStrategy};
pub use context::ContextAwareDetector;
pub use entropy::EntropyDetector;
pub use pattern::PatternDetector;

/// Per-line context already computed for the file being scanned; shared
/// read-only by every detector so none of them re-derives it.
pub struct ScanContext<'a> {
    pub absolute_path: &'a Path,
    pub relative_path: &'a Path,
    pub content: &'a str,
    pub lines: &'a [&'a str],
    pub is_test_file: bool,
    pub extension: Option<&'a str>,
}

/// A single detection strategy, CPU-bound and cancellation-safe between
/// rule/candidate iterations.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    /// Runs this detector over the full file context, returning the
    /// findings it produced. `cancel`, when set, is checked between
    /// iterations; a set flag means "stop early, return what you have".
    fn detect(&self, ctx: &ScanContext<'_>, cancel: &Arc<AtomicBool>) -> Result<Vec<Finding>, ScanError>;
}

pub(crate) fn is_cancelled(cancel: &Arc<AtomicBool>) -> bool {
    cancel.load(std::sync::atomic::Ordering::Relaxed)
}

/// Comment-leader prefixes recognized across the common source languages
/// this crate scans; shared by the pattern and post-processing stages.
pub const COMMENT_PREFIXES: &[&str] = &["//", "#", "/*", "*", "<!--", ";", "--"];

pub fn is_comment_line(trimmed: &str) -> bool {
    COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Fixed placeholder-marker vocabulary: values containing one of these are
/// treated as evidence against real-secret status.
pub const PLACEHOLDER_MARKERS: &[&str] = &[
    "example", "test", "demo", "placeholder", "dummy", "xxx", "0000", "1234", "your_",
    "insert_here", "changeme", "sample", "fake",
];

pub fn contains_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}
