//! Fan-out orchestrator for the three detection strategies: runs them per
//! one of four execution modes, merges overlapping findings, deduplicates,
//! and caches per-file results. Grounded in
//! `deepbrainspace-guardy/src/parallel/processor.rs`'s worker-pool shape,
//! generalized from "one job per file" to "one job per detector within a
//! file" and, unlike that file, never synthesizes a zeroed placeholder
//! result for a timed-out job.

use super::{is_cancelled, Detector, ScanContext};
use crate::error::ScanError;
use crate::finding::{ContextFlags, DetectorKind, Finding, Location, SecretInfo, SecretType, Severity};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
    /// Stop once a high-priority detector returns a finding with
    /// confidence > 0.8.
    FailFast,
    /// High-priority detectors first, then the rest, unless fail-fast's
    /// condition triggers and stops after the current priority tier.
    PriorityBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Union,
    WeightedAverage,
    Conservative,
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    None,
    ExactMatch,
    PositionBased,
    PositionAndContent,
    SmartMerge,
}

struct RegisteredDetector {
    detector: Box<dyn Detector>,
    /// Higher runs earlier in priority-based mode.
    priority: i32,
    weight: f32,
}

struct CacheEntry {
    key: (std::path::PathBuf, u64),
    findings: Vec<Finding>,
}

pub struct CompositeDetector {
    detectors: Vec<RegisteredDetector>,
    execution_mode: ExecutionMode,
    merge_strategy: MergeStrategy,
    dedup_strategy: DedupStrategy,
    per_detector_timeout: Duration,
    cache: Mutex<VecDeque<CacheEntry>>,
    cache_capacity: usize,
}

impl CompositeDetector {
    pub fn new(
        execution_mode: ExecutionMode,
        merge_strategy: MergeStrategy,
        dedup_strategy: DedupStrategy,
        per_detector_timeout: Duration,
        cache_capacity: usize,
    ) -> Self {
        CompositeDetector {
            detectors: Vec::new(),
            execution_mode,
            merge_strategy,
            dedup_strategy,
            per_detector_timeout,
            cache: Mutex::new(VecDeque::new()),
            cache_capacity,
        }
    }

    pub fn register(&mut self, detector: Box<dyn Detector>, priority: i32, weight: f32) {
        self.detectors.push(RegisteredDetector { detector, priority, weight });
    }

    fn content_hash(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    fn cache_lookup(&self, path: &std::path::Path, hash: u64) -> Option<Vec<Finding>> {
        let cache = self.cache.lock().unwrap();
        cache
            .iter()
            .find(|entry| entry.key.0 == path && entry.key.1 == hash)
            .map(|entry| entry.findings.clone())
    }

    fn cache_store(&self, path: &std::path::Path, hash: u64, findings: Vec<Finding>) {
        let mut cache = self.cache.lock().unwrap();
        if cache.len() >= self.cache_capacity && self.cache_capacity > 0 {
            cache.pop_front();
        }
        cache.push_back(CacheEntry {
            key: (path.to_path_buf(), hash),
            findings,
        });
    }

    /// Runs one detector with a timeout; a timed-out or errored detector
    /// yields a synthetic error finding rather than aborting the file. The
    /// detector observes a cancel flag scoped to this single call, seeded
    /// from (but independent of) the scan-wide `cancel` — a slow detector
    /// on one file must never abort the rest of the scan.
    fn run_one(
        detector: &dyn Detector,
        ctx: &ScanContext<'_>,
        cancel: &Arc<AtomicBool>,
        timeout: Duration,
    ) -> Vec<Finding> {
        let local_cancel = Arc::new(AtomicBool::new(is_cancelled(cancel)));
        let (tx, rx) = crossbeam::channel::bounded(1);
        let name = detector.name().to_string();
        let result = crossbeam::thread::scope(|scope| {
            let local_cancel = Arc::clone(&local_cancel);
            scope.spawn(move |_| {
                let outcome = detector.detect(ctx, &local_cancel);
                let _ = tx.send(outcome);
            });
            rx.recv_timeout(timeout)
        })
        .expect("worker thread panicked");

        match result {
            Ok(Ok(findings)) => findings,
            Ok(Err(err)) => vec![synthetic_error_finding(ctx, &name, &err.to_string())],
            Err(_timeout) => {
                local_cancel.store(true, std::sync::atomic::Ordering::Relaxed);
                vec![synthetic_error_finding(ctx, &name, "detector timed out")]
            }
        }
    }

    fn run_detectors(&self, ctx: &ScanContext<'_>, cancel: &Arc<AtomicBool>) -> Vec<(usize, Vec<Finding>)> {
        match self.execution_mode {
            ExecutionMode::Sequential => self
                .detectors
                .iter()
                .enumerate()
                .map(|(i, d)| (i, Self::run_one(d.detector.as_ref(), ctx, cancel, self.per_detector_timeout)))
                .collect(),

            ExecutionMode::Parallel => {
                let timeout = self.per_detector_timeout;
                crossbeam::thread::scope(|scope| {
                    let handles: Vec<_> = self
                        .detectors
                        .iter()
                        .enumerate()
                        .map(|(i, d)| {
                            let cancel = Arc::clone(cancel);
                            scope.spawn(move |_| (i, Self::run_one(d.detector.as_ref(), ctx, &cancel, timeout)))
                        })
                        .collect();
                    handles.into_iter().map(|h| h.join().expect("detector thread panicked")).collect()
                })
                .expect("scope failed")
            }

            ExecutionMode::FailFast => {
                let mut ordered: Vec<&RegisteredDetector> = self.detectors.iter().collect();
                ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
                let mut results = Vec::new();
                for (rank, registered) in ordered.iter().enumerate() {
                    let findings = Self::run_one(registered.detector.as_ref(), ctx, cancel, self.per_detector_timeout);
                    let triggers_stop = findings.iter().any(|f| f.confidence > 0.8);
                    results.push((rank, findings));
                    if triggers_stop || is_cancelled(cancel) {
                        break;
                    }
                }
                results
            }

            ExecutionMode::PriorityBased => {
                let mut by_priority: Vec<&RegisteredDetector> = self.detectors.iter().collect();
                by_priority.sort_by(|a, b| b.priority.cmp(&a.priority));
                let mut results = Vec::new();
                let mut tiers: Vec<Vec<&RegisteredDetector>> = Vec::new();
                for registered in by_priority {
                    match tiers.last_mut() {
                        Some(tier) if tier.last().map(|d| d.priority) == Some(registered.priority) => {
                            tier.push(registered)
                        }
                        _ => tiers.push(vec![registered]),
                    }
                }
                let mut idx = 0;
                for tier in tiers {
                    let mut tier_triggered = false;
                    for registered in tier {
                        let findings = Self::run_one(registered.detector.as_ref(), ctx, cancel, self.per_detector_timeout);
                        if findings.iter().any(|f| f.confidence > 0.8) {
                            tier_triggered = true;
                        }
                        results.push((idx, findings));
                        idx += 1;
                    }
                    if tier_triggered || is_cancelled(cancel) {
                        break;
                    }
                }
                results
            }
        }
    }

    /// Runs the full fan-out/merge/dedup pipeline for one file, consulting
    /// and updating the cache when content hashes match.
    pub fn detect_file(&self, ctx: &ScanContext<'_>, cancel: &Arc<AtomicBool>) -> Vec<Finding> {
        let hash = Self::content_hash(ctx.content);
        if let Some(cached) = self.cache_lookup(ctx.absolute_path, hash) {
            return cached;
        }

        let per_detector = self.run_detectors(ctx, cancel);
        let all: Vec<Finding> = per_detector.into_iter().flat_map(|(_, f)| f).collect();

        let merged = self.merge(all);
        let deduped = self.dedup(merged);

        self.cache_store(ctx.absolute_path, hash, deduped.clone());
        deduped
    }

    /// Groups findings by (path, line, overlapping-or-adjacent columns)
    /// then combines each group per the configured merge strategy.
    fn merge(&self, findings: Vec<Finding>) -> Vec<Finding> {
        if self.merge_strategy == MergeStrategy::Union {
            return findings;
        }

        let mut groups: Vec<Vec<Finding>> = Vec::new();
        'outer: for finding in findings {
            for group in groups.iter_mut() {
                let representative = &group[0];
                if representative.location.absolute_path == finding.location.absolute_path
                    && representative.location.line == finding.location.line
                    && columns_overlap_or_adjacent(&representative.location, &finding.location)
                {
                    group.push(finding);
                    continue 'outer;
                }
            }
            groups.push(vec![finding]);
        }

        groups
            .into_iter()
            .map(|group| self.combine_group(group))
            .collect()
    }

    fn combine_group(&self, group: Vec<Finding>) -> Finding {
        if group.len() == 1 {
            return group.into_iter().next().unwrap();
        }

        match self.merge_strategy {
            MergeStrategy::Union => unreachable!("union never groups"),
            MergeStrategy::WeightedAverage => {
                let total_weight: f32 = group
                    .iter()
                    .map(|f| self.weight_for(&f.provenance))
                    .sum::<f32>()
                    .max(f32::EPSILON);
                let weighted_confidence: f32 = group
                    .iter()
                    .map(|f| self.weight_for(&f.provenance) * f.confidence)
                    .sum::<f32>()
                    / total_weight;
                let mut base = group[0].clone();
                for other in &group[1..] {
                    base = base.merge_with(other, weighted_confidence);
                }
                base.with_confidence(weighted_confidence)
            }
            MergeStrategy::Conservative => {
                let distinct_detectors: std::collections::HashSet<DetectorKind> =
                    group.iter().flat_map(|f| f.provenance.iter().copied()).collect();
                let max_confidence = group.iter().map(|f| f.confidence).fold(0.0_f32, f32::max);
                if distinct_detectors.len() < 2 && max_confidence <= 0.8 {
                    // Not confirmed by enough detectors: keep only the
                    // strongest single finding, unboosted.
                    group
                        .into_iter()
                        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
                        .unwrap()
                } else {
                    let mut base = group[0].clone();
                    for other in &group[1..] {
                        base = base.merge_with(other, max_confidence);
                    }
                    base.with_confidence((max_confidence * 1.2).min(1.0))
                }
            }
            MergeStrategy::Optimistic => {
                let max_confidence = group.iter().map(|f| f.confidence).fold(0.0_f32, f32::max);
                let max_severity = group.iter().map(|f| f.severity).max().unwrap();
                let mut base = group[0].clone();
                for other in &group[1..] {
                    base = base.merge_with(other, max_confidence);
                }
                base.severity = max_severity;
                base
            }
        }
    }

    /// The strongest registered weight among `provenance`'s detectors, or
    /// `1.0` if none of them are currently registered (e.g. a stale
    /// provenance tag from a detector that has since been disabled).
    fn weight_for(&self, provenance: &[DetectorKind]) -> f32 {
        let found = provenance
            .iter()
            .filter_map(|kind| {
                self.detectors
                    .iter()
                    .find(|d| detector_kind_for(d.detector.name()) == Some(*kind))
                    .map(|d| d.weight)
            })
            .fold(0.0_f32, f32::max);
        if found > 0.0 {
            found
        } else {
            1.0
        }
    }

    fn dedup(&self, findings: Vec<Finding>) -> Vec<Finding> {
        match self.dedup_strategy {
            DedupStrategy::None => findings,
            DedupStrategy::ExactMatch => {
                let mut seen = std::collections::HashSet::new();
                findings
                    .into_iter()
                    .filter(|f| {
                        let key = (
                            f.location.absolute_path.clone(),
                            f.location.line,
                            f.secret.rule_name.clone(),
                        );
                        seen.insert(key)
                    })
                    .collect()
            }
            DedupStrategy::PositionBased => {
                let mut best: HashMap<(std::path::PathBuf, usize), Finding> = HashMap::new();
                for finding in findings {
                    let key = (finding.location.absolute_path.clone(), finding.location.line);
                    best.entry(key)
                        .and_modify(|existing| {
                            if finding.confidence > existing.confidence {
                                *existing = finding.clone();
                            }
                        })
                        .or_insert(finding);
                }
                best.into_values().collect()
            }
            DedupStrategy::PositionAndContent => {
                let mut seen = std::collections::HashSet::new();
                findings
                    .into_iter()
                    .filter(|f| {
                        let key = (
                            f.location.absolute_path.clone(),
                            f.location.line,
                            f.location.col_start,
                            f.secret.value.clone(),
                        );
                        seen.insert(key)
                    })
                    .collect()
            }
            DedupStrategy::SmartMerge => smart_merge(findings),
        }
    }
}

fn detector_kind_for(name: &str) -> Option<DetectorKind> {
    match name {
        "pattern" => Some(DetectorKind::Pattern),
        "entropy" => Some(DetectorKind::Entropy),
        "context" => Some(DetectorKind::Context),
        _ => None,
    }
}

fn columns_overlap_or_adjacent(a: &Location, b: &Location) -> bool {
    let delta = a.col_start.abs_diff(b.col_start);
    delta <= 3 || (a.col_start <= b.col_end && b.col_start <= a.col_end)
}

/// Connected components over position-proximity: two findings in the same
/// component if they are pairwise adjacent per [`columns_overlap_or_adjacent`]
/// transitively through the group.
fn smart_merge(findings: Vec<Finding>) -> Vec<Finding> {
    let mut remaining = findings;
    let mut result = Vec::new();

    while let Some(seed) = remaining.pop() {
        let mut component = vec![seed];
        loop {
            let mut grew = false;
            let mut i = 0;
            while i < remaining.len() {
                let joins = component.iter().any(|member| {
                    member.location.absolute_path == remaining[i].location.absolute_path
                        && member.location.line == remaining[i].location.line
                        && columns_overlap_or_adjacent(&member.location, &remaining[i].location)
                });
                if joins {
                    component.push(remaining.remove(i));
                    grew = true;
                } else {
                    i += 1;
                }
            }
            if !grew {
                break;
            }
        }

        let rule_ids: Vec<String> = component.iter().map(|f| f.secret.rule_name.clone()).collect();
        let max_confidence = component.iter().map(|f| f.confidence).fold(0.0_f32, f32::max);
        let mut base = component[0].clone();
        for other in &component[1..] {
            base = base.merge_with(other, max_confidence);
        }
        base.secret.rule_name = rule_ids.join("+");
        result.push(base);
    }

    result
}

/// A zero-confidence, info-severity marker recording that a detector
/// failed or timed out on this file. Never treated as a real secret; the
/// engine separates these out into the per-file error list rather than
/// the findings list (spec: "a finding is never fabricated to represent
/// an error").
fn synthetic_error_finding(ctx: &ScanContext<'_>, detector_name: &str, message: &str) -> Finding {
    Finding::new(
        Location {
            absolute_path: ctx.absolute_path.to_path_buf(),
            relative_path: ctx.relative_path.to_path_buf(),
            line: 1,
            col_start: 0,
            col_end: 0,
            line_text: String::new(),
        },
        SecretInfo {
            value: message.to_string(),
            secret_type: SecretType::Unknown,
            entropy: None,
            rule_name: format!("detector-error:{detector_name}"),
        },
        ContextFlags::default(),
        Severity::Info,
        0.0,
        vec![DetectorKind::Composite],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Detector, ScanContext};

    struct AlwaysFindsOne {
        confidence: f32,
        kind: DetectorKind,
    }

    impl Detector for AlwaysFindsOne {
        fn name(&self) -> &str {
            match self.kind {
                DetectorKind::Pattern => "pattern",
                DetectorKind::Entropy => "entropy",
                DetectorKind::Context => "context",
                DetectorKind::Composite => "composite",
            }
        }

        fn detect(&self, ctx: &ScanContext<'_>, _cancel: &Arc<AtomicBool>) -> Result<Vec<Finding>, ScanError> {
            Ok(vec![Finding::new(
                Location {
                    absolute_path: ctx.absolute_path.to_path_buf(),
                    relative_path: ctx.relative_path.to_path_buf(),
                    line: 1,
                    col_start: 0,
                    col_end: 5,
                    line_text: "hello".to_string(),
                },
                SecretInfo {
                    value: "hello".to_string(),
                    secret_type: SecretType::Unknown,
                    entropy: None,
                    rule_name: "stub".to_string(),
                },
                ContextFlags::default(),
                Severity::Medium,
                self.confidence,
                vec![self.kind],
            )])
        }
    }

    fn sample_ctx<'a>(abs: &'a std::path::Path, rel: &'a std::path::Path, content: &'a str, lines: &'a [&'a str]) -> ScanContext<'a> {
        ScanContext {
            absolute_path: abs,
            relative_path: rel,
            content,
            lines,
            is_test_file: false,
            extension: Some("rs"),
        }
    }

    #[test]
    fn union_keeps_all_findings_separate() {
        let mut composite = CompositeDetector::new(
            ExecutionMode::Sequential,
            MergeStrategy::Union,
            DedupStrategy::None,
            Duration::from_secs(1),
            8,
        );
        composite.register(Box::new(AlwaysFindsOne { confidence: 0.6, kind: DetectorKind::Pattern }), 10, 1.0);
        composite.register(Box::new(AlwaysFindsOne { confidence: 0.4, kind: DetectorKind::Entropy }), 5, 1.0);

        let abs = std::path::PathBuf::from("/repo/a.rs");
        let rel = std::path::PathBuf::from("a.rs");
        let lines = ["hello"];
        let ctx = sample_ctx(&abs, &rel, "hello", &lines);
        let cancel = Arc::new(AtomicBool::new(false));
        let findings = composite.detect_file(&ctx, &cancel);
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn conservative_merge_requires_two_detectors_or_high_confidence() {
        let mut composite = CompositeDetector::new(
            ExecutionMode::Sequential,
            MergeStrategy::Conservative,
            DedupStrategy::None,
            Duration::from_secs(1),
            8,
        );
        composite.register(Box::new(AlwaysFindsOne { confidence: 0.5, kind: DetectorKind::Pattern }), 10, 1.0);
        composite.register(Box::new(AlwaysFindsOne { confidence: 0.5, kind: DetectorKind::Entropy }), 5, 1.0);

        let abs = std::path::PathBuf::from("/repo/a.rs");
        let rel = std::path::PathBuf::from("a.rs");
        let lines = ["hello"];
        let ctx = sample_ctx(&abs, &rel, "hello", &lines);
        let cancel = Arc::new(AtomicBool::new(false));
        let findings = composite.detect_file(&ctx, &cancel);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].confidence > 0.5);
    }

    #[test]
    fn cache_returns_identical_findings_for_unchanged_content() {
        let mut composite = CompositeDetector::new(
            ExecutionMode::Sequential,
            MergeStrategy::Union,
            DedupStrategy::None,
            Duration::from_secs(1),
            8,
        );
        composite.register(Box::new(AlwaysFindsOne { confidence: 0.6, kind: DetectorKind::Pattern }), 10, 1.0);

        let abs = std::path::PathBuf::from("/repo/a.rs");
        let rel = std::path::PathBuf::from("a.rs");
        let lines = ["hello"];
        let ctx = sample_ctx(&abs, &rel, "hello", &lines);
        let cancel = Arc::new(AtomicBool::new(false));
        let first = composite.detect_file(&ctx, &cancel);
        let second = composite.detect_file(&ctx, &cancel);
        assert_eq!(first, second);
    }
}
