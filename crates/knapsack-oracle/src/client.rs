//! Oracle client: the trait the matcher calls, and its HTTP implementation.

use async_trait::async_trait;
use knapsack_core::{Error, Need, Resource, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::OracleConfig;
use crate::prompt;
use crate::providers;
use crate::types::{CompletionParams, RawOracleOutput, ResolvedProvider};

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Something that proposes candidates for a need, as raw structured data.
///
/// One call is one oracle request; implementations do not retry.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn invoke(&self, need: &Need, resources: &[Resource]) -> Result<RawOracleOutput>;
}

/// Oracle backed by an external LLM API.
pub struct HttpOracle {
    client: Client,
    resolved: ResolvedProvider,
    params: CompletionParams,
}

impl HttpOracle {
    /// Build from configuration. Fails if no usable provider resolves.
    pub fn new(config: &OracleConfig, timeout: Duration) -> Result<Self> {
        let resolved = config.resolve_provider()?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Oracle: provider={}, model={}, timeout={}s",
            resolved.provider,
            resolved.model,
            timeout.as_secs()
        );

        Ok(Self {
            client,
            resolved,
            params: config.params(),
        })
    }

    /// Minimal request confirming the configured key is accepted.
    pub async fn test_connection(&self) -> Result<()> {
        providers::test_connection(&self.client, &self.resolved).await
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn invoke(&self, need: &Need, resources: &[Resource]) -> Result<RawOracleOutput> {
        let messages = prompt::build_messages(need, resources);
        debug!(
            "Invoking oracle for need {} with {} resources",
            need.id,
            resources.len()
        );

        let stream =
            providers::stream_completion(&self.client, &self.resolved, messages, self.params);
        let reply = providers::collect_reply(stream).await?;

        parse_reply(&reply)
    }
}

/// Turn reply text into structured data.
///
/// Uses the first fenced code block when there is one, else the whole text.
/// Text that is not JSON at all is `OracleMalformedResponse`; any JSON value,
/// whatever its shape, is returned for the extractor to judge.
pub fn parse_reply(reply: &str) -> Result<RawOracleOutput> {
    let body = FENCED_BLOCK
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply)
        .trim();

    serde_json::from_str(body).map_err(|e| {
        Error::OracleMalformedResponse(format!("{} (reply began: {:?})", e, preview(body, 80)))
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
