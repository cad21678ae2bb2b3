//! Test-file policy, grounded in `scanner/test_detection.rs`'s
//! `TestDetector` and `scanner/types.rs`'s `ignore_test_code` /
//! `test_attributes` / `test_modules` fields.

use super::FileFilter;
use std::path::Path;

/// How the scan should treat files and code blocks recognized as tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFilePolicy {
    /// Test files are scanned like any other file.
    IncludeAll,
    /// Test files are skipped entirely.
    ExcludeAll,
    /// Test files are scanned but findings inside them are downgraded in
    /// the context stage rather than dropped here.
    Relaxed,
    /// Only integration-test paths (conventionally `tests/`) are scanned;
    /// unit-test modules embedded in source files are skipped.
    IntegrationOnly,
}

pub struct TestFileFilter {
    policy: TestFilePolicy,
}

impl TestFileFilter {
    pub fn new(policy: TestFilePolicy) -> Self {
        TestFileFilter { policy }
    }

    /// Conventional test-path heuristics: a `tests/` directory component,
    /// a `_test`/`test_`/`.test.` filename fragment, or `_spec`/`spec.` for
    /// ecosystems that use that convention.
    pub fn looks_like_test_path(path: &Path) -> bool {
        if path
            .components()
            .any(|c| matches!(c.as_os_str().to_str(), Some("tests") | Some("test") | Some("__tests__")))
        {
            return true;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        stem.starts_with("test_")
            || stem.ends_with("_test")
            || stem.ends_with(".test")
            || stem.ends_with("_spec")
            || stem.ends_with(".spec")
    }

    fn is_integration_path(path: &Path) -> bool {
        path.components()
            .any(|c| c.as_os_str().to_str() == Some("tests"))
    }
}

impl FileFilter for TestFileFilter {
    fn includes_file(&self, path: &Path, is_test_file: bool) -> bool {
        if !is_test_file {
            return true;
        }
        match self.policy {
            TestFilePolicy::IncludeAll | TestFilePolicy::Relaxed => true,
            TestFilePolicy::ExcludeAll => false,
            TestFilePolicy::IntegrationOnly => Self::is_integration_path(path),
        }
    }

    fn priority(&self) -> i32 {
        80
    }

    fn describe(&self) -> &str {
        "test-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_all_rejects_test_files_only() {
        let filter = TestFileFilter::new(TestFilePolicy::ExcludeAll);
        assert!(!filter.includes_file(Path::new("tests/scan.rs"), true));
        assert!(filter.includes_file(Path::new("src/main.rs"), false));
    }

    #[test]
    fn integration_only_rejects_embedded_unit_tests() {
        let filter = TestFileFilter::new(TestFilePolicy::IntegrationOnly);
        assert!(filter.includes_file(Path::new("tests/scan.rs"), true));
        assert!(!filter.includes_file(Path::new("src/engine_test.rs"), true));
    }

    #[test]
    fn path_heuristics_recognize_common_conventions() {
        assert!(TestFileFilter::looks_like_test_path(Path::new(
            "tests/integration.rs"
        )));
        assert!(TestFileFilter::looks_like_test_path(Path::new(
            "src/scanner_test.rs"
        )));
        assert!(TestFileFilter::looks_like_test_path(Path::new(
            "lib/__tests__/util.js"
        )));
        assert!(!TestFileFilter::looks_like_test_path(Path::new(
            "src/lib.rs"
        )));
    }
}
