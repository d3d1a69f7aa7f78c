//! Portal configuration: env vars with defaults, optional TOML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Connection details for the OpenAI-compatible urgency scorer.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerConfig {
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Top-level portal configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalConfig {
    /// Scorer endpoint; when absent the keyword heuristic is used.
    #[serde(default)]
    pub scorer: Option<ScorerConfig>,

    /// Interval of the periodic SLA sweep in seconds; absent = no sweep.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl PortalConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Self {
        let scorer = std::env::var("PORTAL_SCORER_URL").ok().map(|url| ScorerConfig {
            url,
            model: std::env::var("PORTAL_SCORER_MODEL").unwrap_or_else(|_| default_model()),
            api_key: std::env::var("PORTAL_SCORER_API_KEY").ok(),
        });

        let sweep_interval_secs = std::env::var("PORTAL_SWEEP_SECS")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            scorer,
            sweep_interval_secs,
        }
    }

    /// Load from a TOML file if given, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            None => Ok(Self::from_env()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config: PortalConfig = toml::from_str(
            r#"
            sweep_interval_secs = 300

            [scorer]
            url = "http://localhost:8080/v1/chat/completions"
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.sweep_interval_secs, Some(300));
        let scorer = config.scorer.unwrap();
        assert_eq!(scorer.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(scorer.model, "gpt-4o-mini");
        assert_eq!(scorer.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: PortalConfig = toml::from_str("").unwrap();
        assert!(config.scorer.is_none());
        assert!(config.sweep_interval_secs.is_none());
    }
}
