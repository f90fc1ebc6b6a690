//! Service configuration.
//!
//! Loaded from a YAML file, then overridden from the environment. Secrets
//! (API keys) are expected to come from the environment only.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub reasoning: ReasoningConfig,
    pub investigation: InvestigationConfig,
}

/// HTTP front door settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whole-request timeout; must exceed [`Config::worst_case_run_secs`]
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 480,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Backend serving the reasoning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningProvider {
    #[default]
    Ollama,
    OpenAi,
    Anthropic,
}

impl ReasoningProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "mistral:latest",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
        }
    }
}

impl std::fmt::Display for ReasoningProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Reasoning-service client settings.
///
/// `model` and `base_url` left out of a config file take the provider's
/// defaults, see [`ReasoningConfig::fill_provider_defaults`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub provider: ReasoningProvider,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Per-call timeout, enforced by the investigators and synthesizer
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: ReasoningProvider::Ollama,
            model: ReasoningProvider::Ollama.default_model().to_string(),
            base_url: ReasoningProvider::Ollama.default_base_url().to_string(),
            api_key: None,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl ReasoningConfig {
    /// Fill an empty `model` or `base_url` from the provider's defaults.
    pub fn fill_provider_defaults(&mut self) {
        if self.model.trim().is_empty() {
            self.model = self.provider.default_model().to_string();
        }
        if self.base_url.trim().is_empty() {
            self.base_url = self.provider.default_base_url().to_string();
        }
    }
}

impl std::fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Investigation windows and fetch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigationConfig {
    pub logs_window_minutes: i64,
    pub metrics_window_minutes: i64,
    pub deploy_lookback_hours: i64,
    /// Per-call timeout for telemetry fetches
    pub fetch_timeout_secs: u64,
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            logs_window_minutes: 15,
            metrics_window_minutes: 15,
            deploy_lookback_hours: 24,
            fetch_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from a YAML file. Fields left out take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content).map_err(|e| {
            Error::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.reasoning.fill_provider_defaults();
        config.validate()?;
        debug!(path = %path.display(), "configuration file loaded");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("COMMANDER_LLM_PROVIDER") {
            let parsed = ReasoningProvider::parse(&provider).ok_or_else(|| {
                Error::config(format!("unknown reasoning provider: {}", provider))
            })?;
            if parsed != self.reasoning.provider {
                info!(provider = %parsed, "reasoning provider overridden from environment");
                self.reasoning.provider = parsed;
                self.reasoning.model = parsed.default_model().to_string();
                self.reasoning.base_url = parsed.default_base_url().to_string();
            }
        }

        if let Some(model) = lookup("COMMANDER_LLM_MODEL") {
            self.reasoning.model = model;
        }

        match self.reasoning.provider {
            ReasoningProvider::Ollama => {
                if let Some(url) = lookup("OLLAMA_BASE_URL") {
                    self.reasoning.base_url = url;
                }
            }
            ReasoningProvider::OpenAi => {
                if let Some(key) = lookup("OPENAI_API_KEY") {
                    self.reasoning.api_key = Some(key);
                }
            }
            ReasoningProvider::Anthropic => {
                if let Some(key) = lookup("ANTHROPIC_API_KEY") {
                    self.reasoning.api_key = Some(key);
                }
            }
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config(format!("invalid PORT: {}", port)))?;
        }

        self.validate()
    }

    /// Longest a run can take before its own timeouts stop it: the parallel
    /// and correlate stages each wait on one fetch and one reasoning call,
    /// then synthesis makes one more reasoning call.
    pub fn worst_case_run_secs(&self) -> u64 {
        let investigator = self
            .investigation
            .fetch_timeout_secs
            .saturating_add(self.reasoning.timeout_secs);
        investigator
            .saturating_mul(2)
            .saturating_add(self.reasoning.timeout_secs)
    }

    /// Check values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.reasoning.model.trim().is_empty() {
            return Err(Error::config("reasoning.model must not be empty"));
        }
        if self.reasoning.base_url.trim().is_empty() {
            return Err(Error::config("reasoning.base_url must not be empty"));
        }
        if self.reasoning.timeout_secs == 0 {
            return Err(Error::config("reasoning.timeout_secs must be positive"));
        }
        if self.investigation.fetch_timeout_secs == 0 {
            return Err(Error::config("investigation.fetch_timeout_secs must be positive"));
        }
        if self.investigation.logs_window_minutes <= 0
            || self.investigation.metrics_window_minutes <= 0
            || self.investigation.deploy_lookback_hours <= 0
        {
            return Err(Error::config("investigation windows must be positive"));
        }
        let budget = self.worst_case_run_secs();
        if self.server.request_timeout_secs <= budget {
            return Err(Error::config(format!(
                "server.request_timeout_secs ({}) must exceed the worst-case run time of {}s",
                self.server.request_timeout_secs, budget
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reasoning.provider, ReasoningProvider::Ollama);
        assert_eq!(config.reasoning.model, "mistral:latest");
        assert_eq!(config.investigation.logs_window_minutes, 15);
        assert_eq!(config.investigation.deploy_lookback_hours, 24);
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9090\nreasoning:\n  provider: openai\n  model: gpt-4o-mini\n  base_url: https://api.openai.com"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.reasoning.provider, ReasoningProvider::OpenAi);
        assert_eq!(config.investigation.metrics_window_minutes, 15);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped: Config =
            serde_yaml::from_str(include_str!("../../../config/commander.yaml")).unwrap();
        let defaults = Config::default();

        assert_eq!(shipped.server.port, defaults.server.port);
        assert_eq!(shipped.reasoning.provider, defaults.reasoning.provider);
        assert_eq!(shipped.reasoning.model, defaults.reasoning.model);
        assert_eq!(shipped.reasoning.base_url, defaults.reasoning.base_url);
        assert_eq!(
            shipped.investigation.fetch_timeout_secs,
            defaults.investigation.fetch_timeout_secs
        );
        assert_eq!(
            shipped.server.request_timeout_secs,
            defaults.server.request_timeout_secs
        );
        assert!(shipped.validate().is_ok());
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, map").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("COMMANDER_LLM_PROVIDER", "anthropic"),
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("OPENAI_API_KEY", "ignored"),
                ("PORT", "8080"),
            ]))
            .unwrap();

        assert_eq!(config.reasoning.provider, ReasoningProvider::Anthropic);
        assert_eq!(config.reasoning.base_url, "https://api.anthropic.com");
        assert_eq!(config.reasoning.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_provider_switch_picks_provider_model() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("COMMANDER_LLM_PROVIDER", "anthropic"),
                ("ANTHROPIC_API_KEY", "k"),
            ]))
            .unwrap();
        assert_eq!(config.reasoning.model, "claude-3-haiku-20240307");

        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("COMMANDER_LLM_PROVIDER", "openai"),
                ("COMMANDER_LLM_MODEL", "gpt-4o"),
            ]))
            .unwrap();
        assert_eq!(config.reasoning.model, "gpt-4o");
        assert_eq!(config.reasoning.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_from_file_provider_without_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reasoning:\n  provider: anthropic").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.reasoning.model, "claude-3-haiku-20240307");
        assert_eq!(config.reasoning.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_request_timeout_must_cover_worst_case_run() {
        let mut config = Config::default();
        assert_eq!(config.worst_case_run_secs(), 420);
        assert!(config.server.request_timeout_secs > config.worst_case_run_secs());

        config.server.request_timeout_secs = 300;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.reasoning.timeout_secs = 60;
        assert_eq!(config.worst_case_run_secs(), 240);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::default();
        config.reasoning.api_key = Some("sk-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(lookup(&[("COMMANDER_LLM_PROVIDER", "bard")]))
            .is_err());
        assert!(config.apply_overrides(lookup(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.reasoning.api_key = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }
}
