//! High-entropy substring extraction, grounded in
//! `deepbrainspace-guardy/src/scanner/core.rs`'s candidate-gathering
//! helpers, scored via [`crate::entropy`]'s charset-aware thresholds.

use super::{contains_placeholder, is_cancelled, Detector, ScanContext};
use crate::entropy::{
    classify_charset, has_repeating_substring, is_sequential, normalized_entropy, unique_char_ratio,
};
use crate::error::ScanError;
use crate::finding::{ContextFlags, DetectorKind, Finding, Location, SecretInfo, SecretType, Severity};
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct EntropyDetector {
    min_length: usize,
    max_length: usize,
    confidence_floor: f32,
    /// Global entropy-threshold override from configuration; a candidate
    /// must clear both this and its charset's own threshold.
    threshold_override: f64,
    quoted_string: Regex,
    named_assignment: Regex,
    url_query_param: Regex,
    json_value: Regex,
    long_run: Regex,
}

impl EntropyDetector {
    pub fn new(min_length: usize, max_length: usize, confidence_floor: f32) -> Self {
        Self::with_threshold(min_length, max_length, confidence_floor, 0.0)
    }

    pub fn with_threshold(
        min_length: usize,
        max_length: usize,
        confidence_floor: f32,
        threshold_override: f64,
    ) -> Self {
        EntropyDetector {
            min_length,
            max_length,
            confidence_floor,
            threshold_override,
            quoted_string: Regex::new(r#"["']([^"']{8,})["']"#).unwrap(),
            named_assignment: Regex::new(
                r#"(?i)\b(api[_-]?key|token|secret|password|auth)\w*\s*[:=]\s*["']?([A-Za-z0-9+/=_.\-]{8,})["']?"#,
            )
            .unwrap(),
            url_query_param: Regex::new(r"(?i)[?&](?:token|key|auth|secret)=([A-Za-z0-9+/=_.\-]{8,})")
                .unwrap(),
            json_value: Regex::new(
                r#"(?i)"(api[_-]?key|token|secret|password|auth)\w*"\s*:\s*"([A-Za-z0-9+/=_.\-]{8,})""#,
            )
            .unwrap(),
            long_run: Regex::new(r"[A-Za-z0-9+/=_-]{16,}").unwrap(),
        }
    }

    fn in_length_range(&self, s: &str) -> bool {
        let len = s.chars().count();
        len >= self.min_length && len <= self.max_length
    }

    fn charset_multiplier(normalized: f64) -> f32 {
        normalized as f32
    }

    fn length_multiplier(len: usize) -> f32 {
        (1.0 + (len as f32 / 100.0)).min(1.5)
    }

    fn candidate_confidence(&self, value: &str) -> f32 {
        let charset = classify_charset(value);
        let normalized = normalized_entropy(value);
        let raw_entropy = crate::entropy::shannon_entropy(value);
        let threshold = charset.detection_threshold().max(self.threshold_override);
        if raw_entropy < threshold {
            return 0.0;
        }
        let mut confidence = Self::charset_multiplier(normalized) * Self::length_multiplier(value.len());
        if is_sequential(value, 0.7) || has_repeating_substring(value, 0.5) {
            confidence *= 0.2;
        }
        if contains_placeholder(value) {
            confidence *= 0.2;
        }
        confidence.clamp(0.0, 1.0)
    }

    fn collect_candidates(&self, content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        let mut push = |value: String, seen: &mut HashSet<String>, out: &mut Vec<String>| {
            if !seen.contains(&value) {
                seen.insert(value.clone());
                out.push(value);
            }
        };

        for cap in self.quoted_string.captures_iter(content) {
            let value = cap[1].to_string();
            if self.in_length_range(&value) {
                push(value, &mut seen, &mut candidates);
            }
        }
        for cap in self.named_assignment.captures_iter(content) {
            let value = cap[2].to_string();
            if self.in_length_range(&value) {
                push(value, &mut seen, &mut candidates);
            }
        }
        for cap in self.url_query_param.captures_iter(content) {
            let value = cap[1].to_string();
            if self.in_length_range(&value) {
                push(value, &mut seen, &mut candidates);
            }
        }
        for cap in self.json_value.captures_iter(content) {
            let value = cap[2].to_string();
            if self.in_length_range(&value) {
                push(value, &mut seen, &mut candidates);
            }
        }
        for m in self.long_run.find_iter(content) {
            let value = m.as_str().to_string();
            if self.in_length_range(&value) && unique_char_ratio(&value) > 0.3 {
                push(value, &mut seen, &mut candidates);
            }
        }

        candidates
    }

    fn locate(content: &str, value: &str) -> Option<(usize, usize)> {
        let byte_offset = content.find(value)?;
        let mut line = 1usize;
        let mut last_newline = 0usize;
        for (idx, b) in content.as_bytes().iter().enumerate().take(byte_offset) {
            if *b == b'\n' {
                line += 1;
                last_newline = idx + 1;
            }
        }
        Some((line, byte_offset - last_newline))
    }
}

impl Detector for EntropyDetector {
    fn name(&self) -> &str {
        "entropy"
    }

    fn detect(&self, ctx: &ScanContext<'_>, cancel: &Arc<AtomicBool>) -> Result<Vec<Finding>, ScanError> {
        let mut findings = Vec::new();
        let candidates = self.collect_candidates(ctx.content);

        for value in candidates {
            if is_cancelled(cancel) {
                break;
            }
            let confidence = self.candidate_confidence(&value);
            if confidence < self.confidence_floor {
                continue;
            }
            let Some((line_no, col_start)) = Self::locate(ctx.content, &value) else {
                continue;
            };
            let line_text = ctx
                .lines
                .get(line_no.saturating_sub(1))
                .copied()
                .unwrap_or_default();
            let entropy = crate::entropy::shannon_entropy(&value);

            let location = Location {
                absolute_path: ctx.absolute_path.to_path_buf(),
                relative_path: ctx.relative_path.to_path_buf(),
                line: line_no,
                col_start,
                col_end: col_start + value.len(),
                line_text: line_text.to_string(),
            };
            let secret = SecretInfo {
                value,
                secret_type: SecretType::HighEntropy,
                entropy: Some(entropy),
                rule_name: "high-entropy-candidate".to_string(),
            };
            let context = ContextFlags {
                in_test_file: ctx.is_test_file,
                ..ContextFlags::default()
            };
            let severity = if confidence > 0.8 {
                Severity::High
            } else if confidence > 0.5 {
                Severity::Medium
            } else {
                Severity::Low
            };

            findings.push(Finding::new(
                location,
                secret,
                context,
                severity,
                confidence,
                vec![DetectorKind::Entropy],
            ));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> Vec<Finding> {
        let detector = EntropyDetector::new(12, 256, 0.3);
        let lines: Vec<&str> = content.lines().collect();
        let abs = std::path::PathBuf::from("/repo/app.kt");
        let rel = std::path::PathBuf::from("app.kt");
        let scan_ctx = ScanContext {
            absolute_path: &abs,
            relative_path: &rel,
            content,
            lines: &lines,
            is_test_file: false,
            extension: Some("kt"),
        };
        let cancel = Arc::new(AtomicBool::new(false));
        detector.detect(&scan_ctx, &cancel).unwrap()
    }

    #[test]
    fn high_entropy_base64_token_is_found() {
        let findings = run(
            "val token = \"dGhpc2lzYXJlYWxseWxvbmdyYW5kb21sb29raW5ndG9rZW4xMjM0NTY3ODkw\"\n",
        );
        assert!(!findings.is_empty());
        assert!(findings.iter().any(|f| f.confidence >= 0.3));
    }

    #[test]
    fn sequential_string_is_suppressed() {
        let findings = run("val filler = \"abcdefghijklmnopqrstuvwxyz0123456789\"\n");
        assert!(findings.iter().all(|f| f.confidence < 0.3) || findings.is_empty());
    }

    #[test]
    fn placeholder_value_is_suppressed() {
        let findings = run("val token = \"example_placeholder_dummy_value_xxx\"\n");
        assert!(findings.is_empty() || findings.iter().all(|f| f.confidence < 0.3));
    }
}
