//! Code-structure-sensitive classification, grounded in
//! `deepbrainspace-guardy/src/scanner/core.rs`'s assignment-line parsing and
//! `scanner/test_detection.rs`'s enclosing-scope heuristics and test-block
//! range detection.

use super::{contains_placeholder, is_cancelled, is_comment_line, Detector, ScanContext};
use crate::error::ScanError;
use crate::finding::{ContextFlags, DetectorKind, Finding, Location, SecretInfo, SecretType, Severity};
use regex::Regex;
use std::ops::Range;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Glob-ish (single `*` wildcard) markers that open a test function/module:
/// Rust attributes, Python `def test_*`/`class Test*`/decorators, and the
/// common JS/TS `it(`/`test(`/`describe(` call forms.
const TEST_BLOCK_STARTERS: &[&str] = &[
    "#[*test]",
    "#[bench]",
    "#[cfg(test)]",
    "def test_*",
    "class Test*",
    "@pytest.*",
    "it(*",
    "test(*",
    "describe(*",
];

fn matches_test_starter(trimmed: &str) -> bool {
    TEST_BLOCK_STARTERS.iter().any(|pattern| match pattern.split_once('*') {
        Some((prefix, suffix)) => trimmed.starts_with(prefix) && trimmed.ends_with(suffix),
        None => trimmed == *pattern,
    })
}

fn line_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Finds the end of a brace-delimited block opened at `start_line`.
fn find_brace_block_end(lines: &[&str], start_line: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut opened = false;
    for (offset, line) in lines[start_line..].iter().enumerate() {
        depth += line.matches('{').count() as i32;
        depth -= line.matches('}').count() as i32;
        if line.contains('{') {
            opened = true;
        }
        if opened && depth == 0 {
            return Some(start_line + offset);
        }
    }
    None
}

/// Finds the end of an indentation-delimited block (Python) opened at
/// `start_line`.
fn find_indent_block_end(lines: &[&str], start_line: usize) -> usize {
    let start_indent = line_indent(lines[start_line]);
    for (idx, line) in lines.iter().enumerate().skip(start_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if line_indent(line) <= start_indent {
            return idx - 1;
        }
    }
    lines.len() - 1
}

/// Builds the line ranges (0-based, inclusive) covered by test functions or
/// modules embedded in an otherwise-ordinary source file, so findings inside
/// them can be downweighted without excluding the rest of the file the way
/// the test-file policy does for whole paths.
fn build_test_block_ranges(lines: &[&str], extension: Option<&str>) -> Vec<Range<usize>> {
    let python_style = matches!(extension, Some("py"));
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if matches_test_starter(trimmed) {
            let end = if python_style {
                find_indent_block_end(lines, i)
            } else {
                find_brace_block_end(lines, i).unwrap_or(i)
            };
            ranges.push(i..end + 1);
            i = end + 1;
        } else {
            i += 1;
        }
    }
    ranges
}

/// A match regarded as trustworthy even inside an otherwise-suppressing
/// context (comment, test file): PEM blocks, long hex runs, long base64
/// runs.
pub(crate) fn is_high_confidence_pattern(value: &str) -> bool {
    value.starts_with("-----BEGIN")
        || (value.len() >= 32 && value.chars().all(|c| c.is_ascii_hexdigit()))
        || (value.len() >= 32
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')))
}

struct Classification {
    secret_type: SecretType,
    base_confidence: f32,
}

fn classify(value: &str, variable_name: Option<&str>) -> Classification {
    use SecretType::*;
    if value.starts_with("-----BEGIN") {
        return Classification { secret_type: PrivateKey, base_confidence: 0.9 };
    }
    if value.contains("CERTIFICATE") {
        return Classification { secret_type: Certificate, base_confidence: 0.9 };
    }
    if value.starts_with("jdbc:")
        || value.starts_with("mongodb://")
        || value.starts_with("mongodb+srv://")
        || value.starts_with("postgres://")
        || value.starts_with("postgresql://")
        || value.starts_with("redis://")
    {
        return Classification { secret_type: DatabaseUrl, base_confidence: 0.8 };
    }
    if let Some(name) = variable_name {
        let lower = name.to_lowercase();
        if lower.contains("password") {
            return Classification { secret_type: Password, base_confidence: 0.6 };
        }
        if lower.contains("key") || lower.contains("token") {
            return Classification { secret_type: ApiKey, base_confidence: 0.7 };
        }
    }
    let entropy = crate::entropy::shannon_entropy(value);
    if entropy > 4.0 {
        return Classification {
            secret_type: HighEntropy,
            base_confidence: (entropy / 8.0) as f32,
        };
    }
    Classification { secret_type: Unknown, base_confidence: 0.3 }
}

pub struct ContextAwareDetector {
    assignment: Regex,
    quoted_value: Regex,
}

impl ContextAwareDetector {
    pub fn new() -> Self {
        ContextAwareDetector {
            assignment: Regex::new(
                r#"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\s*[:=]\s*["']([^"']{4,})["']"#,
            )
            .unwrap(),
            quoted_value: Regex::new(r#"["']([^"']{8,})["']"#).unwrap(),
        }
    }

    fn enclosing_name(ctx: &ScanContext<'_>, line_no: usize) -> Option<String> {
        let decl = Regex::new(r"(?:fn|def|function|class|struct|impl)\s+([A-Za-z_][A-Za-z0-9_]*)").ok()?;
        for idx in (0..line_no.saturating_sub(1)).rev() {
            if let Some(caps) = decl.captures(ctx.lines.get(idx)?) {
                return Some(caps[1].to_string());
            }
        }
        None
    }
}

impl Default for ContextAwareDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ContextAwareDetector {
    fn name(&self) -> &str {
        "context"
    }

    fn detect(&self, ctx: &ScanContext<'_>, cancel: &Arc<AtomicBool>) -> Result<Vec<Finding>, ScanError> {
        let mut findings = Vec::new();
        let test_block_ranges = build_test_block_ranges(ctx.lines, ctx.extension);

        for (idx, line) in ctx.lines.iter().enumerate() {
            if is_cancelled(cancel) {
                break;
            }
            let line_no = idx + 1;
            let trimmed = line.trim_start();
            let in_comment = is_comment_line(trimmed);
            let in_test_block = test_block_ranges.iter().any(|r| r.contains(&idx));

            let mut seen_values = std::collections::HashSet::new();
            let mut candidates: Vec<(Option<String>, String, usize)> = Vec::new();
            for caps in self.assignment.captures_iter(line) {
                let name = caps[1].to_string();
                let value = caps[2].to_string();
                let col = caps.get(2).map(|m| m.start()).unwrap_or(0);
                if seen_values.insert(value.clone()) {
                    candidates.push((Some(name), value, col));
                }
            }
            for m in self.quoted_value.captures_iter(line) {
                let value = m[1].to_string();
                let col = m.get(1).map(|mm| mm.start()).unwrap_or(0);
                if seen_values.insert(value.clone()) {
                    candidates.push((None, value, col));
                }
            }

            for (variable_name, value, col_start) in candidates {
                let classification = classify(&value, variable_name.as_deref());
                let mut confidence = classification.base_confidence;
                let high_confidence_pattern = is_high_confidence_pattern(&value);

                if in_comment && !high_confidence_pattern {
                    confidence *= 0.3;
                }
                if ctx.is_test_file {
                    confidence *= 0.4;
                }
                if in_test_block && !high_confidence_pattern {
                    confidence *= 0.4;
                }
                if let Some(name) = &variable_name {
                    let lower = name.to_lowercase();
                    if lower.contains("secret")
                        || lower.contains("key")
                        || lower.contains("token")
                        || lower.contains("password")
                        || lower.contains("credential")
                    {
                        confidence *= 1.5;
                    }
                    if lower.contains("test") || lower.contains("mock") || lower.contains("example") {
                        confidence *= 0.3;
                    }
                }
                if contains_placeholder(&value) {
                    confidence *= 0.1;
                }
                let path_str = ctx.relative_path.to_string_lossy().to_lowercase();
                if path_str.contains("config") || path_str.contains("env") {
                    confidence *= 1.2;
                } else if path_str.contains("test") || path_str.contains("mock") {
                    confidence *= 0.5;
                } else if path_str.contains("example") || path_str.contains("sample") {
                    confidence *= 0.3;
                }

                let confidence = confidence.clamp(0.0, 1.0);
                if confidence <= 0.3 {
                    continue;
                }

                let severity = match classification.secret_type {
                    SecretType::PrivateKey | SecretType::Certificate => Severity::Critical,
                    SecretType::DatabaseUrl | SecretType::ApiKey | SecretType::AccessToken => Severity::High,
                    SecretType::Password => Severity::Medium,
                    SecretType::HighEntropy => Severity::Medium,
                    _ => Severity::Low,
                };

                let location = Location {
                    absolute_path: ctx.absolute_path.to_path_buf(),
                    relative_path: ctx.relative_path.to_path_buf(),
                    line: line_no,
                    col_start,
                    col_end: col_start + value.len(),
                    line_text: (*line).to_string(),
                };
                let secret = SecretInfo {
                    value,
                    secret_type: classification.secret_type,
                    entropy: None,
                    rule_name: "context-classification".to_string(),
                };
                let context = ContextFlags {
                    in_comment,
                    in_test_file: ctx.is_test_file,
                    in_test_block,
                    in_config_file: path_str.contains("config") || path_str.contains("env"),
                    enclosing_name: Self::enclosing_name(ctx, line_no),
                    ..ContextFlags::default()
                };

                findings.push(Finding::new(
                    location,
                    secret,
                    context,
                    severity,
                    confidence,
                    vec![DetectorKind::Context],
                ));
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str, path: &str, is_test_file: bool) -> Vec<Finding> {
        run_with_ext(content, path, is_test_file, None)
    }

    fn run_with_ext(content: &str, path: &str, is_test_file: bool, extension: Option<&str>) -> Vec<Finding> {
        let detector = ContextAwareDetector::new();
        let lines: Vec<&str> = content.lines().collect();
        let abs = std::path::PathBuf::from(format!("/repo/{path}"));
        let rel = std::path::PathBuf::from(path);
        let scan_ctx = ScanContext {
            absolute_path: &abs,
            relative_path: &rel,
            content,
            lines: &lines,
            is_test_file,
            extension,
        };
        let cancel = Arc::new(AtomicBool::new(false));
        detector.detect(&scan_ctx, &cancel).unwrap()
    }

    #[test]
    fn secret_named_variable_boosts_confidence() {
        let findings = run("let api_secret = \"s0meLongRandomValueHere\";\n", "src/app.rs", false);
        assert!(findings.iter().any(|f| f.confidence > 0.3));
    }

    #[test]
    fn test_file_downweights_confidence() {
        let non_test = run("let api_secret = \"s0meLongRandomValueHere\";\n", "src/app.rs", false);
        let test = run("let api_secret = \"s0meLongRandomValueHere\";\n", "src/app_test.rs", true);
        let best_non_test = non_test.iter().map(|f| f.confidence).fold(0.0_f32, f32::max);
        let best_test = test.iter().map(|f| f.confidence).fold(0.0_f32, f32::max);
        assert!(best_test < best_non_test || test.is_empty());
    }

    #[test]
    fn rust_test_block_is_found_and_downweighted() {
        let lines = vec![
            "let api_key = \"sk_live_real_secret_value\";",
            "",
            "#[test]",
            "fn test_function() {",
            "    let secret_token = \"sk_live_nested_secret_value\";",
            "    assert_eq!(1, 1);",
            "}",
            "",
            "let another_key = \"sk_live_another_secret_value\";",
        ];
        let ranges = build_test_block_ranges(&lines, Some("rs"));
        assert_eq!(ranges, vec![2..7]);

        let content = lines.join("\n");
        let findings = run_with_ext(&content, "src/app.rs", false, Some("rs"));
        let outside = findings
            .iter()
            .find(|f| f.secret.value.contains("real_secret"))
            .expect("finding outside the test block");
        let inside = findings
            .iter()
            .find(|f| f.secret.value.contains("nested_secret"))
            .expect("finding inside the test block");
        assert!(!outside.context.in_test_block);
        assert!(inside.context.in_test_block);
        assert!(inside.confidence < outside.confidence);
    }

    #[test]
    fn python_test_block_is_found_by_indentation() {
        let lines = vec![
            "api_key = \"sk_live_real_secret_value\"",
            "",
            "def test_function():",
            "    secret = \"sk_live_test_secret_value\"",
            "    assert True",
            "",
            "final_key = \"sk_live_final_secret_value\"",
        ];
        let ranges = build_test_block_ranges(&lines, Some("py"));
        assert_eq!(ranges, vec![2..6]);
    }

    #[test]
    fn typescript_describe_block_is_found() {
        let lines = vec![
            "const apiKey = \"sk_live_real_secret_value\";",
            "",
            "describe(\"my test\", () => {",
            "    const testSecret = \"sk_live_test_secret_value\";",
            "});",
            "",
            "const finalKey = \"sk_live_final_secret_value\";",
        ];
        let ranges = build_test_block_ranges(&lines, Some("ts"));
        assert_eq!(ranges, vec![2..5]);
    }
}
