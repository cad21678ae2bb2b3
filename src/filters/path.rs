//! Glob-based path include/exclude, grounded in
//! `deepbrainspace-guardy/src/shared/glob.rs`'s `build_globset_with_options`
//! and `process_ignore_patterns`.

use super::FileFilter;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self, globset::Error> {
        let include = if include_patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in include_patterns {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            exclude_builder.add(Glob::new(pattern)?);
        }
        let exclude = exclude_builder.build()?;

        Ok(PathFilter { include, exclude })
    }
}

impl FileFilter for PathFilter {
    fn includes_file(&self, path: &Path, _is_test_file: bool) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(globset) => globset.is_match(path),
            None => true,
        }
    }

    fn priority(&self) -> i32 {
        90
    }

    fn describe(&self) -> &str {
        "path"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_wins_over_include() {
        let filter = PathFilter::new(
            &["**/*.rs".to_string()],
            &["**/vendor/**".to_string()],
        )
        .unwrap();
        assert!(filter.includes_file(Path::new("src/main.rs"), false));
        assert!(!filter.includes_file(Path::new("vendor/crate/lib.rs"), false));
    }

    #[test]
    fn no_include_patterns_means_everything_passes() {
        let filter = PathFilter::new(&[], &["**/target/**".to_string()]).unwrap();
        assert!(filter.includes_file(Path::new("src/lib.rs"), false));
        assert!(!filter.includes_file(Path::new("target/debug/build"), false));
    }

    #[test]
    fn include_patterns_narrow_scope() {
        let filter = PathFilter::new(&["src/**".to_string()], &[]).unwrap();
        assert!(filter.includes_file(Path::new("src/main.rs"), false));
        assert!(!filter.includes_file(Path::new("docs/readme.md"), false));
    }
}
