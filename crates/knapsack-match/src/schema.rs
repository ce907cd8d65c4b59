//! Candidate schema and input validation.
//!
//! Oracle output is untrusted: every candidate is rebuilt field by field
//! from raw JSON and checked against the resource ids the caller supplied.
//! Inbound needs and resource pools are checked here too, but those
//! failures are request-level (`InvalidRequest`).

use std::collections::HashSet;
use std::str::FromStr;

use knapsack_core::{Error, Need, Resource, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Oracle's self-reported confidence in a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl FromStr for Confidence {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// A proposed combination of resources for one need.
///
/// Only [`validate_candidate`] builds these, so every instance references
/// known resources, scores within 0..=100 and carries a known confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    resource_ids: Vec<String>,
    feasibility_score: u8,
    explanation: String,
    gaps: Vec<String>,
    confidence: Confidence,
}

impl Candidate {
    pub fn resource_ids(&self) -> &[String] {
        &self.resource_ids
    }

    pub fn feasibility_score(&self) -> u8 {
        self.feasibility_score
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn gaps(&self) -> &[String] {
        &self.gaps
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

/// Why a single raw candidate was rejected. Names the first failing field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("candidate is not an object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// The offending field, if the failure is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::Missing(field) => Some(*field),
            ValidationError::Invalid { field, .. } => Some(*field),
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Build a [`Candidate`] from one raw record, or say why not.
pub fn validate_candidate(
    raw: &Value,
    known_ids: &HashSet<&str>,
) -> std::result::Result<Candidate, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let resource_ids = validate_resource_ids(required(obj, "resource_ids")?, known_ids)?;

    let feasibility_score = coerce_score(required(obj, "feasibility_score")?)?;

    let explanation = match required(obj, "explanation")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::String(_) => return Err(ValidationError::invalid("explanation", "empty")),
        _ => return Err(ValidationError::invalid("explanation", "not a string")),
    };

    let gaps = match obj.get("gaps") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|g| g.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ValidationError::invalid("gaps", "contains a non-string item"))?,
        Some(_) => return Err(ValidationError::invalid("gaps", "not an array")),
    };

    let confidence = match required(obj, "confidence")? {
        Value::String(s) => s.parse::<Confidence>().map_err(|_| {
            ValidationError::invalid("confidence", format!("unrecognized level {:?}", s))
        })?,
        _ => return Err(ValidationError::invalid("confidence", "not a string")),
    };

    Ok(Candidate {
        resource_ids,
        feasibility_score,
        explanation,
        gaps,
        confidence,
    })
}

/// A present, non-null field.
fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> std::result::Result<&'a Value, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing(field)),
        Some(v) => Ok(v),
    }
}

fn validate_resource_ids(
    value: &Value,
    known_ids: &HashSet<&str>,
) -> std::result::Result<Vec<String>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::invalid("resource_ids", "not an array"))?;
    if items.is_empty() {
        return Err(ValidationError::invalid("resource_ids", "empty"));
    }

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item
            .as_str()
            .ok_or_else(|| ValidationError::invalid("resource_ids", "contains a non-string item"))?;
        if !known_ids.contains(id) {
            return Err(ValidationError::invalid(
                "resource_ids",
                format!("unknown resource id {:?}", id),
            ));
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Integers, integral floats and integer strings; out-of-range is rejected, not clamped.
fn coerce_score(value: &Value) -> std::result::Result<u8, ValidationError> {
    let score = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ValidationError::invalid("feasibility_score", "not an integer"))?;

    if !(0..=100).contains(&score) {
        return Err(ValidationError::invalid(
            "feasibility_score",
            format!("{} is outside 0..=100", score),
        ));
    }
    Ok(score as u8)
}

/// Check `top_k` against the caller-specific upper bound.
pub fn check_top_k(top_k: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&top_k) {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!(
            "top_k must be between 1 and {}, got {}",
            max, top_k
        )))
    }
}

/// A need must carry an identifier and a description.
pub fn validate_need(need: &Need) -> Result<()> {
    if need.id.is_empty() {
        return Err(Error::InvalidRequest("need is missing an id".into()));
    }
    if need.description.trim().is_empty() {
        return Err(Error::InvalidRequest(format!(
            "need {} is missing a description",
            need.id
        )));
    }
    Ok(())
}

/// Check the resource pool and return its id set.
pub fn validate_pool(resources: &[Resource]) -> Result<HashSet<&str>> {
    if resources.is_empty() {
        return Err(Error::InvalidRequest("resource pool is empty".into()));
    }

    let mut ids = HashSet::with_capacity(resources.len());
    for (i, resource) in resources.iter().enumerate() {
        if resource.id.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "resource at position {} is missing an id",
                i
            )));
        }
        if !ids.insert(resource.id.as_str()) {
            return Err(Error::InvalidRequest(format!(
                "duplicate resource id {:?}",
                resource.id
            )));
        }
    }
    Ok(ids)
}
