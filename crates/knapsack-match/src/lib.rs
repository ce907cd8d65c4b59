//! Matching core — validates oracle proposals and ranks them.
//!
//! Pipeline for one need: validate input → invoke oracle → extract
//! schema-valid candidates → rank and truncate. Batches run that pipeline
//! per need with bounded concurrency and per-need failure isolation.

pub mod cache;
pub mod extract;
pub mod orchestrator;
pub mod rank;
pub mod schema;
pub mod types;

pub use cache::{cache_key, MatchCache, MemoryMatchCache};
pub use extract::extract;
pub use orchestrator::Matcher;
pub use rank::rank_and_limit;
pub use schema::{validate_candidate, Candidate, Confidence, ValidationError};
pub use types::*;
