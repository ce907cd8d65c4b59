//! Match routes: one need, or a batch of needs, against a resource pool.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use knapsack_core::{Error, Need, Resource};
use knapsack_match::{BatchResult, MatchResult};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/match", post(match_need))
        .route("/match/batch", post(batch_match))
}

/// Match a single need against available resources.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub need: Need,
    pub resources: Vec<Resource>,
    /// Defaults to the configured single-match `top_k`.
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// Match multiple needs against one resource pool.
#[derive(Debug, Deserialize)]
pub struct BatchMatchRequest {
    pub needs: Vec<Need>,
    pub resources: Vec<Resource>,
    /// Defaults to the configured batch `top_k`.
    #[serde(default)]
    pub top_k: Option<i64>,
}

/// Requested `top_k`, or the default. Range checks happen in the matcher.
fn resolve_top_k(requested: Option<i64>, default: usize) -> Result<usize, ApiError> {
    match requested {
        None => Ok(default),
        Some(k) => usize::try_from(k).map_err(|_| {
            ApiError(Error::InvalidRequest(format!(
                "top_k must be positive, got {}",
                k
            )))
        }),
    }
}

/// POST /match — ranked candidates for one need.
async fn match_need(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResult>, ApiError> {
    let Json(req) = payload?;
    let top_k = resolve_top_k(req.top_k, state.config.default_top_k)?;
    let result = state
        .matcher
        .match_need(&req.need, &req.resources, top_k)
        .await?;
    Ok(Json(result))
}

/// POST /match/batch — need id → candidates or error marker.
async fn batch_match(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchMatchRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(req) = payload?;
    let top_k = resolve_top_k(req.top_k, state.config.default_batch_top_k)?;
    let result = state
        .matcher
        .batch_match(&req.needs, &req.resources, top_k)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use knapsack_core::{KnapsackConfig, Result};
    use knapsack_oracle::{Oracle, OracleStatus, RawOracleOutput};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Proposes every resource on its own, scored by position; fails for
    /// needs whose description mentions "offline".
    struct EchoOracle;

    #[async_trait]
    impl Oracle for EchoOracle {
        async fn invoke(&self, need: &Need, resources: &[Resource]) -> Result<RawOracleOutput> {
            if need.description.contains("offline") {
                return Err(Error::OracleUnavailable("connection refused".into()));
            }
            let proposals: Vec<Value> = resources
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    json!({
                        "resource_ids": [r.id],
                        "feasibility_score": (10 * (i + 1)).min(100),
                        "explanation": format!("{} helps", r.description),
                        "gaps": [],
                        "confidence": "Medium",
                    })
                })
                .collect();
            Ok(Value::Array(proposals))
        }
    }

    fn app() -> Router {
        let state = AppState::new(
            KnapsackConfig::default(),
            Arc::new(EchoOracle),
            OracleStatus {
                provider: "anthropic".into(),
                model: "test-model".into(),
                configured: true,
            },
        );
        build_router(Arc::new(state))
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn resources(n: usize) -> Value {
        Value::Array(
            (1..=n)
                .map(|i| {
                    json!({
                        "id": format!("res-{}", i),
                        "description": format!("item {}", i),
                        "metadata": {},
                    })
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_match_ranks_and_defaults_top_k() {
        let (status, body) = post_json(
            "/match",
            json!({
                "need": { "id": "need-123", "description": "I want to make a sandwich" },
                "resources": resources(12),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_candidates"], 10);
        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 10);
        assert_eq!(candidates[0]["resource_ids"], json!(["res-10"]));
        assert_eq!(candidates[0]["feasibility_score"], 100);
        assert_eq!(candidates[0]["confidence"], "medium");
        // res-10, res-11 and res-12 all score 100; input order kept
        assert_eq!(candidates[1]["resource_ids"], json!(["res-11"]));
        assert_eq!(candidates[2]["resource_ids"], json!(["res-12"]));
    }

    #[tokio::test]
    async fn test_match_rejects_out_of_range_top_k() {
        for top_k in [0, 51, -3] {
            let (status, body) = post_json(
                "/match",
                json!({
                    "need": { "id": "n", "description": "x" },
                    "resources": resources(2),
                    "top_k": top_k,
                }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "invalid_request");
        }
    }

    #[tokio::test]
    async fn test_match_empty_pool_is_bad_request() {
        let (status, body) = post_json(
            "/match",
            json!({ "need": { "id": "n", "description": "x" }, "resources": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_match_oracle_failure_is_bad_gateway() {
        let (status, body) = post_json(
            "/match",
            json!({
                "need": { "id": "n", "description": "oracle is offline" },
                "resources": resources(2),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "oracle_unavailable");
    }

    #[tokio::test]
    async fn test_batch_records_per_need_failure() {
        let (status, body) = post_json(
            "/match/batch",
            json!({
                "needs": [
                    { "id": "need-1", "description": "sandwich" },
                    { "id": "need-2", "description": "offline need" },
                    { "id": 3, "description": "soup" },
                ],
                "resources": resources(8),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_object().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(body["need-1"]["total_candidates"], 5);
        assert_eq!(body["3"]["total_candidates"], 5);
        assert_eq!(body["need-2"]["error"]["kind"], "oracle_unavailable");
    }

    #[tokio::test]
    async fn test_batch_empty_needs_is_bad_request() {
        let (status, _) = post_json(
            "/match/batch",
            json!({ "needs": [], "resources": resources(1), "top_k": 5 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            "/match/batch",
            json!({
                "needs": [{ "id": "a", "description": "x" }],
                "resources": resources(1),
                "top_k": 21,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let (status, body) = post_json(
            "/match",
            json!({ "need": "make a sandwich", "resources": resources(2) }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["detail"].is_string());

        let (status, body) = post_json("/match/batch", json!({ "resources": resources(2) })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_non_json_body_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/match")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "knapsack-matcher");
    }
}
