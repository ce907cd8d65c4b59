//! Oracle configuration and provider selection.

use std::path::Path;

use knapsack_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{CompletionParams, OracleProvider, OracleStatus, ResolvedProvider};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

const NO_PROVIDER: &str =
    "No oracle provider configured (set ANTHROPIC_API_KEY, GROQ_API_KEY or OPENAI_API_KEY)";

/// Oracle configuration, read from an optional JSON file with env fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    /// Low by default; candidate proposals should be stable-ish.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_tokens() -> usize {
    4096
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl OracleConfig {
    /// Load config from an optional file, falling back to env vars and defaults.
    pub fn load(config_path: Option<&Path>) -> Self {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`OracleConfig::load`] with an explicit env lookup.
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: OracleConfig = match config_path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(s) => match serde_json::from_str(&s) {
                    Ok(c) => {
                        info!("Loaded oracle config from {}", path.display());
                        c
                    }
                    Err(e) => {
                        warn!("Ignoring unreadable oracle config {}: {}", path.display(), e);
                        OracleConfig::default()
                    }
                },
                Err(e) => {
                    warn!("Oracle config {} not loaded: {}", path.display(), e);
                    OracleConfig::default()
                }
            },
            None => OracleConfig::default(),
        };

        // Env vars as fallback
        if config.openai_api_key.is_none() {
            config.openai_api_key = non_empty(lookup("OPENAI_API_KEY"));
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = non_empty(lookup("ANTHROPIC_API_KEY"));
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = non_empty(lookup("GROQ_API_KEY"));
        }
        if let Some(p) = non_empty(lookup("KNAPSACK_ORACLE_PROVIDER")) {
            config.preferred_provider = p.to_lowercase();
        }
        if let Some(m) = non_empty(lookup("KNAPSACK_OPENAI_MODEL")) {
            config.openai_model = m;
        }
        if let Some(m) = non_empty(lookup("KNAPSACK_ANTHROPIC_MODEL")) {
            config.anthropic_model = m;
        }
        if let Some(m) = non_empty(lookup("KNAPSACK_GROQ_MODEL")) {
            config.groq_model = m;
        }

        config
    }

    /// Resolve which provider and model to use.
    ///
    /// An unknown provider name, or a provider with no key, is a `Config` error.
    pub fn resolve_provider(&self) -> Result<ResolvedProvider> {
        let openai = || {
            self.openai_api_key.as_ref().map(|k| ResolvedProvider {
                provider: OracleProvider::OpenAI,
                model: self.openai_model.clone(),
                api_key: k.clone(),
            })
        };
        let anthropic = || {
            self.anthropic_api_key.as_ref().map(|k| ResolvedProvider {
                provider: OracleProvider::Anthropic,
                model: self.anthropic_model.clone(),
                api_key: k.clone(),
            })
        };
        let groq = || {
            self.groq_api_key.as_ref().map(|k| ResolvedProvider {
                provider: OracleProvider::Groq,
                model: self.groq_model.clone(),
                api_key: k.clone(),
            })
        };

        let missing_key = |var: &str| {
            Error::Config(format!(
                "Oracle provider '{}' selected but {} is not set",
                self.preferred_provider, var
            ))
        };

        match self.preferred_provider.to_ascii_lowercase().as_str() {
            "openai" => openai().ok_or_else(|| missing_key("OPENAI_API_KEY")),
            "anthropic" => anthropic().ok_or_else(|| missing_key("ANTHROPIC_API_KEY")),
            "groq" => groq().ok_or_else(|| missing_key("GROQ_API_KEY")),
            // Auto mode: Anthropic > Groq > OpenAI
            "auto" => anthropic()
                .or_else(groq)
                .or_else(openai)
                .ok_or_else(|| Error::Config(NO_PROVIDER.into())),
            other => Err(Error::Config(format!(
                "Unknown oracle provider '{}' (expected auto, anthropic, openai or groq)",
                other
            ))),
        }
    }

    pub fn params(&self) -> CompletionParams {
        CompletionParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Build the public status (no API keys exposed).
    pub fn status(&self) -> OracleStatus {
        match self.resolve_provider() {
            Ok(resolved) => OracleStatus {
                provider: resolved.provider.to_string(),
                model: resolved.model,
                configured: true,
            },
            Err(_) => OracleStatus {
                provider: self.preferred_provider.clone(),
                model: String::new(),
                configured: false,
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
