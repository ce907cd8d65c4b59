//! Match and batch result types.

use std::collections::BTreeMap;
use std::time::Duration;

use knapsack_core::{Error, KnapsackConfig};
use serde::Serialize;

use crate::schema::Candidate;

/// Ranked candidates for one need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub candidates: Vec<Candidate>,
    pub total_candidates: usize,
}

impl MatchResult {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let total_candidates = candidates.len();
        Self {
            candidates,
            total_candidates,
        }
    }
}

/// Recorded failure for one need in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMarker {
    pub kind: String,
    pub message: String,
}

impl From<&Error> for ErrorMarker {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

/// Outcome for one need in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Matched(MatchResult),
    Failed { error: ErrorMarker },
}

impl BatchEntry {
    pub fn is_failed(&self) -> bool {
        matches!(self, BatchEntry::Failed { .. })
    }

    pub fn as_matched(&self) -> Option<&MatchResult> {
        match self {
            BatchEntry::Matched(result) => Some(result),
            BatchEntry::Failed { .. } => None,
        }
    }
}

impl From<knapsack_core::Result<MatchResult>> for BatchEntry {
    fn from(outcome: knapsack_core::Result<MatchResult>) -> Self {
        match outcome {
            Ok(result) => BatchEntry::Matched(result),
            Err(e) => BatchEntry::Failed {
                error: ErrorMarker::from(&e),
            },
        }
    }
}

/// One entry per submitted need, keyed by need id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub entries: BTreeMap<String, BatchEntry>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, need_id: &str) -> Option<&BatchEntry> {
        self.entries.get(need_id)
    }

    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_failed()).count()
    }
}

/// Matcher tuning, taken from process configuration.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Candidates below this score are dropped before ranking.
    pub min_feasibility_score: Option<u8>,
    pub batch_concurrency: usize,
    pub batch_timeout: Duration,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::from_config(&KnapsackConfig::default())
    }
}

impl MatchSettings {
    pub fn from_config(config: &KnapsackConfig) -> Self {
        Self {
            min_feasibility_score: config.min_feasibility_score,
            batch_concurrency: config.batch_concurrency.max(1),
            batch_timeout: config.batch_timeout,
        }
    }
}
