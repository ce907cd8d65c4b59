//! Matcher — single-need and batch orchestration.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use knapsack_core::{Error, Need, Resource, Result, MAX_BATCH_TOP_K, MAX_TOP_K};
use knapsack_oracle::Oracle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::{cache_key, MatchCache};
use crate::extract::extract;
use crate::rank::rank_and_limit;
use crate::schema::{check_top_k, validate_need, validate_pool};
use crate::types::{BatchEntry, BatchResult, MatchResult, MatchSettings};

/// Runs needs against resource pools through the oracle.
pub struct Matcher {
    oracle: Arc<dyn Oracle>,
    settings: MatchSettings,
    cache: Option<Arc<dyn MatchCache>>,
}

impl Matcher {
    pub fn new(oracle: Arc<dyn Oracle>, settings: MatchSettings) -> Self {
        Self {
            oracle,
            settings,
            cache: None,
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn MatchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Match one need against a resource pool.
    ///
    /// Validate input → invoke oracle → extract → rank and limit. The first
    /// failing stage ends the match; nothing is retried.
    pub async fn match_need(
        &self,
        need: &Need,
        resources: &[Resource],
        top_k: usize,
    ) -> Result<MatchResult> {
        check_top_k(top_k, MAX_TOP_K)?;
        validate_need(need)?;
        let known_ids = validate_pool(resources)?;

        info!(
            "Matching need {} against {} resources (top_k={})",
            need.id,
            resources.len(),
            top_k
        );

        self.run(need, resources, &known_ids, top_k).await
    }

    /// Match every need against one shared resource pool.
    ///
    /// Request-level problems (no needs, bad `top_k`, bad pool, needs that
    /// cannot be keyed) fail the whole call. Anything that goes wrong for a
    /// single need is recorded against that need and the rest carry on.
    pub async fn batch_match(
        &self,
        needs: &[Need],
        resources: &[Resource],
        top_k: usize,
    ) -> Result<BatchResult> {
        if needs.is_empty() {
            return Err(Error::InvalidRequest("needs list is empty".into()));
        }
        check_top_k(top_k, MAX_BATCH_TOP_K)?;
        let known_ids = validate_pool(resources)?;

        let mut seen = HashSet::with_capacity(needs.len());
        for (i, need) in needs.iter().enumerate() {
            if need.id.is_empty() {
                return Err(Error::InvalidRequest(format!(
                    "need at position {} is missing an id",
                    i
                )));
            }
            if !seen.insert(need.id.as_str()) {
                return Err(Error::InvalidRequest(format!("duplicate need id {:?}", need.id)));
            }
        }

        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id);

        async {
            info!(
                "Batch matching {} needs against {} resources (top_k={}, concurrency={})",
                needs.len(),
                resources.len(),
                top_k,
                self.settings.batch_concurrency
            );

            let known_ids = &known_ids;
            let per_need: Vec<_> = needs
                .iter()
                .map(|need| async move {
                    let outcome = match validate_need(need) {
                        Ok(()) => self.run(need, resources, known_ids, top_k).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = &outcome {
                        warn!("Need {} failed: {}", need.id, e);
                    }
                    (need.id.clone(), BatchEntry::from(outcome))
                })
                .collect();

            let work = stream::iter(per_need)
                .buffer_unordered(self.settings.batch_concurrency)
                .collect::<BTreeMap<String, BatchEntry>>();

            // Dropping `work` on expiry abandons every in-flight oracle call.
            let entries = tokio::time::timeout(self.settings.batch_timeout, work)
                .await
                .map_err(|_| {
                    Error::Timeout(format!(
                        "batch of {} needs exceeded {}s",
                        needs.len(),
                        self.settings.batch_timeout.as_secs()
                    ))
                })?;

            let result = BatchResult { entries };
            info!(
                "Batch complete: {} matched, {} failed",
                result.len() - result.failed_count(),
                result.failed_count()
            );
            Ok::<_, Error>(result)
        }
        .instrument(span)
        .await
    }

    /// Everything after input validation, for one need.
    async fn run(
        &self,
        need: &Need,
        resources: &[Resource],
        known_ids: &HashSet<&str>,
        top_k: usize,
    ) -> Result<MatchResult> {
        let key = self
            .cache
            .as_ref()
            .map(|_| cache_key(need, resources, top_k));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                debug!("Cache hit for need {}", need.id);
                return Ok(hit);
            }
        }

        let raw = self.oracle.invoke(need, resources).await?;

        let mut candidates = extract(&raw, known_ids);
        if let Some(floor) = self.settings.min_feasibility_score {
            let before = candidates.len();
            candidates.retain(|c| c.feasibility_score() >= floor);
            if candidates.len() < before {
                debug!(
                    "Dropped {} candidates below feasibility {}",
                    before - candidates.len(),
                    floor
                );
            }
        }

        let result = MatchResult::new(rank_and_limit(candidates, top_k));
        debug!(
            "Need {}: {} candidates after ranking",
            need.id, result.total_candidates
        );

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, result.clone());
        }

        Ok(result)
    }
}
