//! Process configuration, built once at startup.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Upper bound on `top_k` for a single match.
pub const MAX_TOP_K: usize = 50;
/// Upper bound on `top_k` for each need in a batch.
pub const MAX_BATCH_TOP_K: usize = 20;

/// Top-level Knapsack configuration.
#[derive(Debug, Clone, Serialize)]
pub struct KnapsackConfig {
    /// Bind address for the HTTP server.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// `top_k` used when a match request omits it.
    pub default_top_k: usize,
    /// `top_k` used when a batch request omits it.
    pub default_batch_top_k: usize,
    /// Candidates scoring below this are dropped before ranking. `None` keeps all.
    pub min_feasibility_score: Option<u8>,
    /// Maximum per-need matches in flight during a batch.
    pub batch_concurrency: usize,
    /// Deadline for a whole batch.
    pub batch_timeout: Duration,
    /// Per-call deadline for the oracle.
    pub oracle_timeout: Duration,
    /// Result cache capacity (0 disables the cache).
    pub cache_capacity: usize,
    /// Result cache entry lifetime.
    pub cache_ttl: Duration,
}

impl Default for KnapsackConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8003,
            default_top_k: 10,
            default_batch_top_k: 5,
            min_feasibility_score: None,
            batch_concurrency: 4,
            batch_timeout: Duration::from_secs(60),
            oracle_timeout: Duration::from_secs(30),
            cache_capacity: 0,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl KnapsackConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: lookup("KNAPSACK_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            default_top_k: parse_or(&lookup, "KNAPSACK_DEFAULT_TOP_K", defaults.default_top_k)?,
            default_batch_top_k: parse_or(
                &lookup,
                "KNAPSACK_DEFAULT_BATCH_TOP_K",
                defaults.default_batch_top_k,
            )?,
            min_feasibility_score: parse_opt(&lookup, "KNAPSACK_MIN_FEASIBILITY_SCORE")?,
            batch_concurrency: parse_or(
                &lookup,
                "KNAPSACK_BATCH_CONCURRENCY",
                defaults.batch_concurrency,
            )?,
            batch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "KNAPSACK_BATCH_TIMEOUT_SECS",
                defaults.batch_timeout.as_secs(),
            )?),
            oracle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "KNAPSACK_ORACLE_TIMEOUT_SECS",
                defaults.oracle_timeout.as_secs(),
            )?),
            cache_capacity: parse_or(&lookup, "KNAPSACK_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "KNAPSACK_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
        };

        config.validate()?;
        debug!(
            "Config: bind {}, top_k {}/{}, batch concurrency {}, cache {}",
            config.bind_addr(),
            config.default_top_k,
            config.default_batch_top_k,
            config.batch_concurrency,
            config.cache_capacity
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_TOP_K).contains(&self.default_top_k) {
            return Err(Error::Config(format!(
                "default top_k must be within 1..={}, got {}",
                MAX_TOP_K, self.default_top_k
            )));
        }
        if !(1..=MAX_BATCH_TOP_K).contains(&self.default_batch_top_k) {
            return Err(Error::Config(format!(
                "default batch top_k must be within 1..={}, got {}",
                MAX_BATCH_TOP_K, self.default_batch_top_k
            )));
        }
        if let Some(floor) = self.min_feasibility_score {
            if floor > 100 {
                return Err(Error::Config(format!(
                    "minimum feasibility score must be within 0..=100, got {}",
                    floor
                )));
            }
        }
        if self.batch_concurrency == 0 {
            return Err(Error::Config("batch concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, raw))),
        _ => Ok(None),
    }
}
