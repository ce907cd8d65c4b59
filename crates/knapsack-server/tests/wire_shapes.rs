//! Response JSON produced by the match types must keep
//! the field names and types API clients rely on.

use std::collections::{BTreeMap, HashSet};

use knapsack_core::Error;
use knapsack_match::{
    extract, validate_candidate, BatchEntry, BatchResult, MatchResult,
};
use serde_json::{json, Value};

fn known() -> HashSet<&'static str> {
    ["res-1", "res-2", "res-3"].into_iter().collect()
}

/// Candidate: { resource_ids, feasibility_score, explanation, gaps, confidence }
#[test]
fn test_candidate_shape() {
    let candidate = validate_candidate(
        &json!({
            "resource_ids": ["res-1", "res-2"],
            "feasibility_score": "85",
            "explanation": "  Bread and cheese make a sandwich  ",
            "gaps": ["butter"],
            "confidence": "HIGH",
        }),
        &known(),
    )
    .unwrap();

    let wire = serde_json::to_value(&candidate).unwrap();
    let obj = wire.as_object().unwrap();
    assert_eq!(obj.len(), 5);
    assert_eq!(wire["resource_ids"], json!(["res-1", "res-2"]));
    assert_eq!(wire["feasibility_score"], 85);
    assert!(wire["feasibility_score"].is_u64());
    assert_eq!(wire["explanation"], "Bread and cheese make a sandwich");
    assert_eq!(wire["gaps"], json!(["butter"]));
    assert_eq!(wire["confidence"], "high");
}

/// MatchResult: { candidates: [...], total_candidates }
#[test]
fn test_match_result_shape() {
    let raw = json!([
        {
            "resource_ids": ["res-1"],
            "feasibility_score": 40,
            "explanation": "partial",
            "gaps": ["cheese"],
            "confidence": "low",
        },
        {
            "resource_ids": ["res-9"],
            "feasibility_score": 99,
            "explanation": "unknown id",
            "gaps": [],
            "confidence": "high",
        },
    ]);
    let result = MatchResult::new(extract(&raw, &known()));

    let wire = serde_json::to_value(&result).unwrap();
    assert!(wire["candidates"].is_array());
    assert_eq!(wire["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(wire["total_candidates"], 1);
}

/// Empty results still carry both fields.
#[test]
fn test_empty_match_result_shape() {
    let wire = serde_json::to_value(MatchResult::new(Vec::new())).unwrap();
    assert_eq!(wire, json!({ "candidates": [], "total_candidates": 0 }));
}

/// BatchResult: { <need_id>: MatchResult | { error: { kind, message } } }
#[test]
fn test_batch_result_shape() {
    let mut entries = BTreeMap::new();
    entries.insert(
        "need-1".to_string(),
        BatchEntry::from(Ok(MatchResult::new(Vec::new()))),
    );
    entries.insert(
        "need-2".to_string(),
        BatchEntry::from(Err(Error::OracleMalformedResponse("not JSON".into()))),
    );
    let batch = BatchResult { entries };

    let wire = serde_json::to_value(&batch).unwrap();
    let obj = wire.as_object().unwrap();
    assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["need-1", "need-2"]);
    assert_eq!(wire["need-1"]["total_candidates"], 0);
    assert!(wire["need-1"].get("error").is_none());

    let marker = &wire["need-2"]["error"];
    assert_eq!(marker["kind"], "oracle_malformed_response");
    assert!(marker["message"].as_str().unwrap().contains("not JSON"));
    assert!(wire["need-2"].get("candidates").is_none());
}

/// Client failures carry the same kind strings the HTTP error body uses.
#[test]
fn test_error_kind_strings() {
    let kinds: Vec<Value> = [
        Error::InvalidRequest("x".into()),
        Error::OracleUnavailable("x".into()),
        Error::OracleMalformedResponse("x".into()),
        Error::Timeout("x".into()),
    ]
    .iter()
    .map(|e| Value::from(e.kind()))
    .collect();

    assert_eq!(
        kinds,
        vec![
            json!("invalid_request"),
            json!("oracle_unavailable"),
            json!("oracle_malformed_response"),
            json!("timeout"),
        ]
    );
}
