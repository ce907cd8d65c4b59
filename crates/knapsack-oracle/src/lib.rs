//! Reasoning oracle adapter.
//!
//! Turns a need and a resource pool into a prompt, sends it to an external
//! LLM (OpenAI/Anthropic/Groq) and hands back the reply as untrusted JSON.
//! Nothing here judges whether the reply makes sense; that is the
//! matcher's job.

pub mod client;
pub mod config;
pub mod prompt;
pub mod providers;
pub mod types;

pub use client::{parse_reply, HttpOracle, Oracle};
pub use config::OracleConfig;
pub use types::*;
