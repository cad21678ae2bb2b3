//! Extension-based accept/reject, grounded in
//! `security/scanner.rs::should_scan_file`'s text-extension allow-list,
//! inverted here into a deny-list over `BINARY_EXTENSIONS` plus an optional
//! explicit allow-list for configs that want to narrow scanning further.

use super::{FileFilter, BINARY_EXTENSIONS};
use std::collections::HashSet;
use std::path::Path;

pub struct ExtensionFilter {
    deny: HashSet<String>,
    allow: Option<HashSet<String>>,
}

impl ExtensionFilter {
    /// Always excludes `BINARY_EXTENSIONS`; `extra_deny` adds more, and
    /// `allow_only` (if non-empty) restricts scanning to just those
    /// extensions.
    pub fn new(extra_deny: &[String], allow_only: &[String]) -> Self {
        let mut deny: HashSet<String> = BINARY_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        deny.extend(extra_deny.iter().map(|s| s.to_lowercase()));
        let allow = if allow_only.is_empty() {
            None
        } else {
            Some(allow_only.iter().map(|s| s.to_lowercase()).collect())
        };
        ExtensionFilter { deny, allow }
    }

    fn extension_of(path: &Path) -> Option<String> {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

impl FileFilter for ExtensionFilter {
    fn includes_file(&self, path: &Path, _is_test_file: bool) -> bool {
        match Self::extension_of(path) {
            Some(ext) => {
                if self.deny.contains(&ext) {
                    return false;
                }
                match &self.allow {
                    Some(allow) => allow.contains(&ext),
                    None => true,
                }
            }
            // No extension (e.g. `Dockerfile`, `Makefile`): allowed unless
            // an explicit allow-list is in force.
            None => self.allow.is_none(),
        }
    }

    fn priority(&self) -> i32 {
        100
    }

    fn describe(&self) -> &str {
        "extension"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_extensions_always_rejected() {
        let filter = ExtensionFilter::new(&[], &[]);
        assert!(!filter.includes_file(Path::new("logo.png"), false));
        assert!(!filter.includes_file(Path::new("archive.zip"), false));
    }

    #[test]
    fn text_extensions_pass_by_default() {
        let filter = ExtensionFilter::new(&[], &[]);
        assert!(filter.includes_file(Path::new("main.rs"), false));
        assert!(filter.includes_file(Path::new("Dockerfile"), false));
    }

    #[test]
    fn allow_only_restricts_scope() {
        let filter = ExtensionFilter::new(&[], &["rs".to_string(), "toml".to_string()]);
        assert!(filter.includes_file(Path::new("main.rs"), false));
        assert!(!filter.includes_file(Path::new("readme.md"), false));
        assert!(!filter.includes_file(Path::new("Dockerfile"), false));
    }

    #[test]
    fn extra_deny_extends_binary_list() {
        let filter = ExtensionFilter::new(&["lock".to_string()], &[]);
        assert!(!filter.includes_file(Path::new("Cargo.lock"), false));
    }
}
