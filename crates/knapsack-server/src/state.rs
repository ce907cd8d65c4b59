//! Shared application state.

use std::sync::Arc;

use knapsack_core::KnapsackConfig;
use knapsack_match::{Matcher, MatchSettings, MemoryMatchCache};
use knapsack_oracle::{Oracle, OracleStatus};
use tracing::info;

/// Shared application state accessible from all route handlers.
///
/// Built once at startup; nothing in it changes while serving.
pub struct AppState {
    pub config: KnapsackConfig,
    pub matcher: Matcher,
    pub oracle_status: OracleStatus,
}

impl AppState {
    pub fn new(
        config: KnapsackConfig,
        oracle: Arc<dyn Oracle>,
        oracle_status: OracleStatus,
    ) -> Self {
        let mut matcher = Matcher::new(oracle, MatchSettings::from_config(&config));

        if config.cache_capacity > 0 {
            info!(
                "Result cache enabled: {} entries, {}s TTL",
                config.cache_capacity,
                config.cache_ttl.as_secs()
            );
            matcher = matcher.with_cache(Arc::new(MemoryMatchCache::new(
                config.cache_capacity,
                config.cache_ttl,
            )));
        }

        Self {
            config,
            matcher,
            oracle_status,
        }
    }
}
