//! Layered configuration loading: built-in defaults, then an optional file,
//! then `LEAKGUARD_`-prefixed environment variables — the same
//! defaults-then-file-then-env order as
//! `deepbrainspace-guardy/src/config/core.rs::GuardyConfig::load_with_custom_config`,
//! renamed from that file's `GUARDY_` prefix.

use super::ScanConfig;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use figment::Figment;
use std::path::Path;

const DEFAULTS_TOML: &str = r#"
entropy_threshold = 3.5
min_candidate_length = 12
max_candidate_length = 256
confidence_floor = 0.3
failure_threshold = "high"
max_concurrency = 8
max_file_bytes = 10485760
max_line_bytes = 10000
allow_long_lines = false
enable_caching = true
cache_capacity = 4096
test_file_policy = "relaxed"
follow_symlinks = false
progress_interval = 50
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] figment::Error),
}

/// Loads a [`ScanConfig`] for `root`, optionally overlaying `config_file`
/// (TOML, JSON, or YAML by extension) and `LEAKGUARD_`-prefixed environment
/// variables, in that priority order.
pub fn load_config(root: &Path, config_file: Option<&Path>) -> Result<ScanConfig, ConfigLoadError> {
    let mut figment = Figment::new().merge(Toml::string(DEFAULTS_TOML));

    if let Some(path) = config_file {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => figment = figment.merge(Json::file(path)),
            Some("yaml") | Some("yml") => figment = figment.merge(Yaml::file(path)),
            _ => figment = figment.merge(Toml::file(path)),
        }
    }

    figment = figment.merge(Env::prefixed("LEAKGUARD_").split("__"));

    let mut config: ScanConfig = figment.extract()?;
    config.root = root.to_path_buf();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_config_file() {
        let config = load_config(Path::new("/repo"), None).unwrap();
        assert_eq!(config.root, Path::new("/repo"));
        assert_eq!(config.max_concurrency, 8);
        assert!((config.confidence_floor - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn env_var_overrides_default() {
        std::env::set_var("LEAKGUARD_MAX_CONCURRENCY", "2");
        let config = load_config(Path::new("/repo"), None).unwrap();
        std::env::remove_var("LEAKGUARD_MAX_CONCURRENCY");
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn toml_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("leakguard.toml");
        std::fs::write(&file_path, "confidence_floor = 0.5\n").unwrap();
        let config = load_config(dir.path(), Some(&file_path)).unwrap();
        assert!((config.confidence_floor - 0.5).abs() < f32::EPSILON);
    }
}
