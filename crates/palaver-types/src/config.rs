//! Configuration types for Palaver.
//!
//! `PalaverConfig` represents the top-level `config.toml`. Every section and
//! field has a default, so an empty file (or no file at all) yields a working
//! configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::ModelConfig;

/// Top-level configuration for the Palaver session core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PalaverConfig {
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Who may talk to the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// User ids allowed to use the bot. Empty means everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Per-user request rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Per-channel pending request queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
        }
    }
}

/// Session log shaping: compaction and load-time context engineering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Compact once the log holds more than this many records.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,
    /// Records kept verbatim after a compaction.
    #[serde(default = "default_compaction_keep")]
    pub compaction_keep: usize,
    /// Token budget for history handed to an agent.
    #[serde(default = "default_load_budget_tokens")]
    pub load_budget_tokens: usize,
    /// Context engineering only applies above this many messages.
    #[serde(default = "default_engineer_above")]
    pub engineer_above: usize,
}

fn default_compaction_threshold() -> usize {
    20
}

fn default_compaction_keep() -> usize {
    8
}

fn default_load_budget_tokens() -> usize {
    4000
}

fn default_engineer_above() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: default_compaction_threshold(),
            compaction_keep: default_compaction_keep(),
            load_budget_tokens: default_load_budget_tokens(),
            engineer_above: default_engineer_above(),
        }
    }
}

/// Timeout classes for agent calls, keyed by provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_secs")]
    pub default_secs: u64,
    #[serde(default = "default_provider_timeouts")]
    pub providers: HashMap<String, u64>,
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_provider_timeouts() -> HashMap<String, u64> {
    // Local runtimes are slow to first token; hosted fast models are not.
    HashMap::from([
        ("ollama".to_string(), 600),
        ("lmstudio".to_string(), 600),
        ("groq".to_string(), 60),
    ])
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: default_timeout_secs(),
            providers: default_provider_timeouts(),
        }
    }
}

impl TimeoutConfig {
    /// Timeout for a call to the given model.
    pub fn for_model(&self, model: &ModelConfig) -> Duration {
        let secs = self
            .providers
            .get(&model.provider.to_lowercase())
            .copied()
            .unwrap_or(self.default_secs);
        Duration::from_secs(secs)
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            otel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PalaverConfig::default();
        assert!(config.access.allowed_users.is_empty());
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.queue.max_pending, 5);
        assert_eq!(config.session.compaction_threshold, 20);
        assert_eq!(config.session.compaction_keep, 8);
        assert_eq!(config.session.load_budget_tokens, 4000);
        assert_eq!(config.session.engineer_above, 6);
        assert_eq!(config.timeouts.default_secs, 180);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: PalaverConfig = toml::from_str("").unwrap();
        assert_eq!(config.queue.max_pending, 5);
        assert_eq!(config.model.provider, "anthropic");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: PalaverConfig = toml::from_str(
            r#"
[access]
allowed_users = ["111", "222"]

[rate_limit]
max_requests = 3

[model]
provider = "ollama"
id = "llama3.1"

[timeouts]
default_secs = 90
"#,
        )
        .unwrap();

        assert_eq!(config.access.allowed_users, vec!["111", "222"]);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.model.id, "llama3.1");
        assert_eq!(config.timeouts.default_secs, 90);
        // providers table absent -> built-in classes
        assert_eq!(
            config.timeouts.for_model(&config.model),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_timeout_falls_back_to_default() {
        let timeouts = TimeoutConfig::default();
        let model = ModelConfig {
            provider: "Anthropic".to_string(),
            id: "claude".to_string(),
        };
        assert_eq!(timeouts.for_model(&model), Duration::from_secs(180));

        let fast = ModelConfig {
            provider: "GROQ".to_string(),
            id: "llama".to_string(),
        };
        assert_eq!(timeouts.for_model(&fast), Duration::from_secs(60));
    }
}
