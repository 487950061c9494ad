//! Engine configuration loader.
//!
//! Reads `config.toml` (`~/.taskweave/config.toml` unless a path is given)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use taskweave_types::config::EngineConfig;

/// Default data directory name under the user's home.
const DATA_DIR_NAME: &str = ".taskweave";

/// `~/.taskweave/config.toml`, or `./.taskweave/config.toml` when the home
/// directory cannot be determined.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join("config.toml")
}

/// Load engine configuration from `path`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_engine_config(path: &Path) -> EngineConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}

/// Resolve the concurrency bound for one run.
///
/// Priority:
/// 1. Command-line override
/// 2. The definition file's `max_concurrent_tasks`
/// 3. `max_concurrent_tasks` from `config.toml`
///
/// A floor of 1 is enforced regardless of source.
pub fn resolve_max_concurrent(
    config: &EngineConfig,
    definition: Option<usize>,
    cli_override: Option<usize>,
) -> usize {
    cli_override
        .or(definition)
        .unwrap_or(config.max_concurrent_tasks)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config.max_concurrent_tasks, 4);
        assert!(!config.audit.enabled);
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
max_concurrent_tasks = 8
default_timeout_secs = 30

[audit]
enabled = true
path = "/var/log/weave.jsonl"
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(&path).await;
        assert_eq!(config.max_concurrent_tasks, 8);
        assert_eq!(config.default_timeout_secs, 30);
        assert_eq!(config.default_retry_delay_ms, 1000);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.path, PathBuf::from("/var/log/weave.jsonl"));
    }

    #[tokio::test]
    async fn invalid_toml_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "max_concurrent_tasks = \"many\"").await.unwrap();
        let config = load_engine_config(&path).await;
        assert_eq!(config.max_concurrent_tasks, 4);
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = default_config_path();
        assert!(path.ends_with(".taskweave/config.toml"));
    }

    #[test]
    fn concurrency_resolution_order() {
        let config = EngineConfig::default();
        assert_eq!(resolve_max_concurrent(&config, None, None), 4);
        assert_eq!(resolve_max_concurrent(&config, Some(2), None), 2);
        assert_eq!(resolve_max_concurrent(&config, Some(2), Some(6)), 6);
        assert_eq!(resolve_max_concurrent(&config, Some(0), None), 1);
    }
}
