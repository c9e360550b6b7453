use crate::domain::FailurePolicy;
use crate::generation::ModelRole;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides every role's API key when set.
pub const API_KEY_ENV_OVERRIDE: &str = "ADSCRIPT_API_KEY";
/// Overrides every role's base URL when set.
pub const BASE_URL_ENV_OVERRIDE: &str = "ADSCRIPT_BASE_URL";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    pub models: ModelConfigs,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    /// Whole-traversal retry policy used by the application runner.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model settings for each role that calls the generation service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfigs {
    pub audience_insight: ModelConfig,
    pub creative_strategy: ModelConfig,
    pub script_generation: ModelConfig,
    pub evaluation_and_refinement: ModelConfig,
}

impl ModelConfigs {
    pub fn for_role(&self, role: ModelRole) -> &ModelConfig {
        match role {
            ModelRole::AudienceInsight => &self.audience_insight,
            ModelRole::CreativeStrategy => &self.creative_strategy,
            ModelRole::ScriptGeneration => &self.script_generation,
            ModelRole::EvaluationAndRefinement => &self.evaluation_and_refinement,
        }
    }

    fn iter_mut(&mut self) -> [(&'static str, &mut ModelConfig); 4] {
        [
            ("audience_insight", &mut self.audience_insight),
            ("creative_strategy", &mut self.creative_strategy),
            ("script_generation", &mut self.script_generation),
            ("evaluation_and_refinement", &mut self.evaluation_and_refinement),
        ]
    }

    fn iter(&self) -> [(&'static str, &ModelConfig); 4] {
        [
            ("audience_insight", &self.audience_insight),
            ("creative_strategy", &self.creative_strategy),
            ("script_generation", &self.script_generation),
            ("evaluation_and_refinement", &self.evaluation_and_refinement),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    /// Reads the API key, preferring the global override.
    pub fn resolve_api_key(&self) -> Option<String> {
        [API_KEY_ENV_OVERRIDE, self.api_key_env.as_str()]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EvaluationSettings {
    /// Treat a rejection that carries no recommendations as malformed output.
    #[serde(default)]
    pub require_recommendations_on_rejection: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Where per-run event logs go. Defaults to `~/.ad-script-agent/runs`.
    #[serde(default)]
    pub events_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            events_dir: None,
        }
    }
}

impl WorkflowConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Result<Self> {
        const DEFAULT_WORKFLOW_YAML: &str = include_str!("../workflow.yaml");

        let mut config: Self = serde_yaml::from_str(DEFAULT_WORKFLOW_YAML)
            .context("Failed to parse embedded workflow.yaml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies `ADSCRIPT_BASE_URL` to every role.
    ///
    /// `ADSCRIPT_API_KEY` is read at call time by [`ModelConfig::resolve_api_key`].
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV_OVERRIDE) {
            if !base_url.trim().is_empty() {
                for (_, model) in self.models.iter_mut() {
                    model.base_url = base_url.clone();
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (role, model) in self.models.iter() {
            if model.model.trim().is_empty() {
                anyhow::bail!("models.{}.model must not be empty", role);
            }
            if model.base_url.trim().is_empty() {
                anyhow::bail!("models.{}.base_url must not be empty", role);
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                anyhow::bail!(
                    "models.{}.temperature {} is outside 0.0-2.0",
                    role,
                    model.temperature
                );
            }
            if model.timeout_secs == 0 {
                anyhow::bail!("models.{}.timeout_secs must be greater than zero", role);
            }
        }
        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
