//! The filter chain: a capability set run in priority order, any reject
//! short-circuiting, grounded in `deepbrainspace-guardy/src/security/scanner.rs`'s
//! `should_scan_file` (extension gate) and `shared/glob.rs`'s globset-based
//! matching, generalized into a polymorphic, priority-ordered chain.

mod extension;
mod path;
mod test_file;
mod whitelist;

pub use extension::ExtensionFilter;
pub use path::PathFilter;
pub use test_file::{TestFileFilter, TestFilePolicy};
pub use whitelist::WhitelistFilter;

use std::path::Path;

/// Binary file extensions that are always excluded, regardless of
/// configuration. Grounded in `packages/guardy`'s
/// `static_data::binary_extensions` table.
pub static BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", "zip",
    "tar", "gz", "bz2", "7z", "rar", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "mp3",
    "mp4", "avi", "mov", "wav", "flac", "ttf", "otf", "woff", "woff2", "class", "pyc", "o", "a",
    "lib", "jar", "wasm",
];

/// A file-level include/exclude decision.
pub trait FileFilter: Send + Sync {
    fn includes_file(&self, path: &Path, is_test_file: bool) -> bool;
    /// Optional line-level veto; most filters accept every line.
    fn includes_line(&self, _text: &str, _line_no: usize, _path: &Path) -> bool {
        true
    }
    /// Higher runs first.
    fn priority(&self) -> i32;
    fn describe(&self) -> &str;
}

/// Runs filters in priority order (highest first); the first reject wins.
/// If any "include" patterns exist in the chain's path filters, one of them
/// must also match or the file is rejected.
pub struct FilterChain {
    filters: Vec<Box<dyn FileFilter>>,
}

impl FilterChain {
    pub fn new(mut filters: Vec<Box<dyn FileFilter>>) -> Self {
        filters.sort_by(|a, b| b.priority().cmp(&a.priority()));
        FilterChain { filters }
    }

    pub fn includes_file(&self, path: &Path, is_test_file: bool) -> bool {
        self.filters
            .iter()
            .all(|f| f.includes_file(path, is_test_file))
    }

    pub fn includes_line(&self, text: &str, line_no: usize, path: &Path) -> bool {
        self.filters
            .iter()
            .all(|f| f.includes_line(text, line_no, path))
    }

    pub fn describe_all(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.describe()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFilter {
        priority: i32,
        accept: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FileFilter for CountingFilter {
        fn includes_file(&self, _path: &Path, _is_test_file: bool) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.accept
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn describe(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn rejection_short_circuits_lower_priority_filters() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let chain = FilterChain::new(vec![
            Box::new(CountingFilter {
                priority: 10,
                accept: false,
                calls: first_calls.clone(),
            }),
            Box::new(CountingFilter {
                priority: 1,
                accept: true,
                calls: second_calls.clone(),
            }),
        ]);

        assert!(!chain.includes_file(Path::new("x.rs"), false));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }
}
