//! Oracle types.

use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleProvider::OpenAI => write!(f, "openai"),
            OracleProvider::Anthropic => write!(f, "anthropic"),
            OracleProvider::Groq => write!(f, "groq"),
        }
    }
}

/// A single prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Oracle reply after JSON parsing. Shape is not trusted.
pub type RawOracleOutput = serde_json::Value;

/// A provider, model and key resolved from configuration.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub provider: OracleProvider,
    pub model: String,
    pub api_key: String,
}

/// Sampling parameters for a single oracle call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f64,
    pub max_tokens: usize,
}

/// Public oracle status (no API keys).
#[derive(Debug, Clone, Serialize)]
pub struct OracleStatus {
    pub provider: String,
    pub model: String,
    pub configured: bool,
}
