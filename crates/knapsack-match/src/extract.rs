//! Tolerant extraction of candidates from raw oracle output.

use std::collections::HashSet;

use knapsack_oracle::RawOracleOutput;
use tracing::{debug, warn};

use crate::schema::{validate_candidate, Candidate};

/// Pull every schema-valid candidate out of `raw`, in oracle order.
///
/// Never fails: a top-level value that is not an array yields nothing, and
/// records that fail validation are dropped.
pub fn extract(raw: &RawOracleOutput, known_ids: &HashSet<&str>) -> Vec<Candidate> {
    let records = match raw.as_array() {
        Some(records) => records,
        None => {
            debug!("Oracle output is not an array; no candidates");
            return Vec::new();
        }
    };

    let candidates: Vec<Candidate> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match validate_candidate(record, known_ids) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                warn!(index, "Dropping oracle candidate: {}", e);
                None
            }
        })
        .collect();

    debug!(
        "Extracted {} of {} oracle candidates",
        candidates.len(),
        records.len()
    );

    candidates
}
