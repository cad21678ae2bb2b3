//! Console-styled human output, adapted from
//! `deepbrainspace-guardy/src/cli/output.rs`'s `Output` struct — same
//! `console` + `indicatif` styling, narrowed to what the scan report needs.

use crate::engine::ScanResult;
use crate::finding::Severity;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

pub struct Output {
    debug: bool,
}

impl Output {
    pub fn new(debug: bool) -> Self {
        Output { debug }
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn debug(&self, message: &str) {
        if self.debug {
            println!("{} {}", style("›").dim(), style(message).dim());
        }
    }

    pub fn progress_bar(&self, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    }

    fn severity_style(severity: Severity, text: &str) -> console::StyledObject<&str> {
        match severity {
            Severity::Critical => style(text).red().bold(),
            Severity::High => style(text).red(),
            Severity::Medium => style(text).yellow(),
            Severity::Low => style(text).cyan(),
            Severity::Info => style(text).dim(),
        }
    }

    pub fn report(&self, result: &ScanResult) {
        println!(
            "\n{}",
            style(format!(
                "Scanned {} files in {:.2}s ({:.1} files/sec)",
                result.perf.files_scanned,
                result.perf.total_duration.as_secs_f64(),
                result.perf.files_per_second
            ))
            .bold()
        );

        if result.findings.is_empty() {
            println!("{} no findings", style("✔").green());
        } else {
            for finding in &result.findings {
                let severity_label = finding.severity.to_string();
                println!(
                    "{} {}:{}:{}  {}  {} (confidence {:.2})",
                    Self::severity_style(finding.severity, &severity_label),
                    finding.location.relative_path.display(),
                    finding.location.line,
                    finding.location.col_start,
                    finding.secret.rule_name,
                    finding.masked_value(),
                    finding.confidence,
                );
            }
        }

        if !result.errors.is_empty() {
            self.warning(&format!("{} file(s) reported errors", result.errors.len()));
            for error in &result.errors {
                self.debug(&format!("{}: {}", error.path.display(), error.message));
            }
        }
    }

    pub fn report_json(&self, result: &ScanResult) -> serde_json::Value {
        serde_json::json!({
            "files_scanned": result.perf.files_scanned,
            "duration_seconds": result.perf.total_duration.as_secs_f64(),
            "findings": result.findings.iter().map(|f| serde_json::json!({
                "id": f.id,
                "file": f.location.relative_path,
                "line": f.location.line,
                "column": f.location.col_start,
                "severity": f.severity.to_string(),
                "type": format!("{:?}", f.secret.secret_type),
                "pattern_id": f.secret.rule_name,
                "detector": f.provenance.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
                "confidence": f.confidence,
                "masked_value": f.masked_value(),
            })).collect::<Vec<_>>(),
            "errors": result.errors.iter().map(|e| serde_json::json!({
                "file": e.path,
                "message": e.message,
            })).collect::<Vec<_>>(),
        })
    }
}
