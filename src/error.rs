//! Error types for the scanning engine.
//!
//! Five kinds, matching the fatal/local split the engine relies on:
//! pattern-compilation and configuration errors abort the scan before any
//! file is touched; file-read, resource, and timeout errors are recorded
//! against the offending path and scanning continues.

use std::path::PathBuf;

/// Result type alias for engine operations.
pub type ScanEngineResult<T> = Result<T, ScanError>;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// I/O or decoding failure on a single file. Local: recorded per-path.
    #[error("failed to read {path}: {message}")]
    FileRead {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A user-supplied regex failed to compile. Fatal.
    #[error("invalid pattern {pattern:?}: {source}")]
    PatternCompilation {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Contradictory or invalid configuration. Fatal.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Out-of-memory or oversized content. Local: recorded per-path.
    #[error("resource limit exceeded for {path}: {message}")]
    Resource { path: PathBuf, message: String },

    /// A detector exceeded its per-file timeout. Local: recorded per-path.
    #[error("detector {detector} timed out scanning {path}")]
    Timeout { path: PathBuf, detector: String },
}

impl ScanError {
    /// Fatal errors abort the scan before any file is processed; local
    /// errors are recorded against the offending path and scanning
    /// continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::PatternCompilation { .. } | ScanError::Configuration { .. }
        )
    }

    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = source.to_string();
        ScanError::FileRead {
            path: path.into(),
            message,
            source: Some(source),
        }
    }

    pub fn resource(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ScanError::Resource {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn timeout(path: impl Into<PathBuf>, detector: impl Into<String>) -> Self {
        ScanError::Timeout {
            path: path.into(),
            detector: detector.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ScanError::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_vs_local() {
        assert!(ScanError::configuration("bad").is_fatal());
        assert!(ScanError::PatternCompilation {
            pattern: "(".into(),
            source: regex::Regex::new("(").unwrap_err(),
        }
        .is_fatal());

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!ScanError::file_read("foo.rs", io_err).is_fatal());
        assert!(!ScanError::resource("foo.rs", "too big").is_fatal());
        assert!(!ScanError::timeout("foo.rs", "entropy").is_fatal());
    }
}
