//! Configuration loading.
//!
//! Reads `{data_dir}/config.toml` into `PalaverConfig`. Missing or broken
//! files never stop the bot: they fall back to defaults with a log line.

use std::path::Path;

use palaver_types::config::PalaverConfig;

/// Path of the config file inside a data directory.
pub fn config_path(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// Returns `PalaverConfig::default()` if the file is missing, unreadable, or
/// malformed.
pub async fn load_config(data_dir: &Path) -> PalaverConfig {
    let path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return PalaverConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return PalaverConfig::default();
        }
    };

    match toml::from_str::<PalaverConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            PalaverConfig::default()
        }
    }
}

/// Render a config as TOML, e.g. for `palaver config show`.
pub fn render_config(config: &PalaverConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.queue.max_pending, 5);
        assert!(config.access.allowed_users.is_empty());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            config_path(tmp.path()),
            r#"
[access]
allowed_users = ["111", "222"]

[rate_limit]
max_requests = 3

[session]
compaction_threshold = 40

[model]
provider = "ollama"
id = "llama3"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.access.allowed_users, vec!["111", "222"]);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.session.compaction_threshold, 40);
        assert_eq!(config.session.compaction_keep, 8);
        assert_eq!(config.timeouts.for_model(&config.model).as_secs(), 600);
    }

    #[tokio::test]
    async fn malformed_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(config_path(tmp.path()), "[queue\nmax_pending = ")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.queue.max_pending, 5);
    }

    #[test]
    fn rendered_config_parses_back() {
        let rendered = render_config(&PalaverConfig::default()).unwrap();
        let parsed: PalaverConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.session.compaction_keep, 8);
        assert_eq!(parsed.timeouts.default_secs, 180);
    }
}
