use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    models::{DashboardParams, InventoryEvent},
    validation, AppState,
};

pub const DEFAULT_DASHBOARD_LIMIT: usize = 100;

// ── POST /data, POST /data/submit ────────────────────────────────────────────

pub async fn submit_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let payload = validation::parse_json_body(&headers, &body)?;
    let submission = validation::parse_submission(&payload, state.policy)?;

    let status = state
        .policy
        .classify(submission.inventory_level, submission.status.as_deref())?;

    let record = InventoryEvent::new(submission, status, Utc::now());
    state.store.insert_one(&record).await?;

    info!(
        entity = %record.entity,
        location = %record.location,
        inventory_level = record.inventory_level,
        status = %record.status,
        "Stored inventory event"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Data stored successfully.",
            "status": status,
        })),
    ))
}

// ── GET /data/dashboard ──────────────────────────────────────────────────────

pub async fn dashboard(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let params = DashboardParams::from_pairs(pairs);
    let limit = parse_limit(params.limit.as_deref())?;
    let data = state.store.find_recent(limit).await?;

    debug!(limit, count = data.len(), "Served dashboard data");

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": data })),
    ))
}

/// A malformed limit is reported as a server error, not a client error.
fn parse_limit(raw: Option<&str>) -> AppResult<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_DASHBOARD_LIMIT);
    };

    let limit: i64 = raw
        .trim()
        .parse()
        .map_err(|e| AppError::Internal(format!("invalid limit {raw:?}: {e}")))?;

    Ok(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use chrono::DateTime;
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_http::cors::CorsLayer;

    use super::*;
    use crate::{
        build_router,
        classify::{Status, StatusPolicy},
        store::{MemoryStore, RecordStore, StoreError},
    };

    /// Store whose every call fails, for the 500 paths.
    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn insert_one(&self, _event: &InventoryEvent) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find_recent(&self, _limit: usize) -> Result<Vec<InventoryEvent>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn app(store: Arc<dyn RecordStore>, policy: StatusPolicy) -> Router {
        build_router(AppState { store, policy }, CorsLayer::permissive())
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn store_a() -> Value {
        json!({
            "entity": "Store A",
            "location": "New York",
            "inventory_level": 150,
            "timestamp": "2024-01-01T00:00:00Z"
        })
    }

    // ── Ingestion: computed policy ─────────────────────────────────────────────

    #[tokio::test]
    async fn store_a_scenario_is_stored_as_critical() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        let (status, body) = send(app, post_json("/data", &store_a())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "critical");
        assert_eq!(body["message"], "Data stored successfully.");

        let records = store.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Critical);
        assert_eq!(records[0].entity, "Store A");
        assert_eq!(records[0].timestamp, "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn received_at_is_stamped_during_the_call() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        let before = Utc::now();
        let (status, _) = send(app, post_json("/data", &store_a())).await;
        let after = Utc::now();
        assert_eq!(status, StatusCode::CREATED);

        let received_at = store.snapshot().await[0].received_at.clone();
        assert!(received_at.ends_with('Z'), "received_at: {received_at}");
        let received = DateTime::parse_from_rfc3339(&received_at).unwrap();
        assert!(before.timestamp_micros() <= received.timestamp_micros());
        assert!(received.timestamp_micros() <= after.timestamp_micros());
    }

    #[tokio::test]
    async fn client_status_is_overridden_when_computed() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);
        let mut body = store_a();
        body["inventory_level"] = json!(650);
        body["status"] = json!("critical");

        let (status, resp) = send(app, post_json("/data/submit", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["status"], "operational");
        assert_eq!(store.snapshot().await[0].status, Status::Operational);
    }

    #[tokio::test]
    async fn missing_fields_are_all_named_and_nothing_is_stored() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        let (status, body) = send(app, post_json("/data", &json!({ "entity": "Store A" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing fields: location, inventory_level, timestamp");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn non_integer_inventory_level_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);
        let mut body = store_a();
        body["inventory_level"] = json!("abc");

        let (status, resp) = send(app, post_json("/data", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "inventory_level must be an integer.");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn fractional_and_boolean_inventory_levels_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        for level in [json!(12.5), json!(true)] {
            let mut body = store_a();
            body["inventory_level"] = level.clone();
            let (status, resp) = send(app.clone(), post_json("/data", &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{level}");
            assert_eq!(resp["message"], "inventory_level must be an integer.");
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn invalid_timestamp_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);
        let mut body = store_a();
        body["timestamp"] = json!("last tuesday");

        let (status, resp) = send(app, post_json("/data", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "timestamp must be valid ISO 8601 format.");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn reduced_ordinal_week_and_midnight_timestamps_are_accepted() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        let forms = ["2024", "2024-001", "2024-W01-1", "2024-01-01T24:00"];
        for ts in forms {
            let mut body = store_a();
            body["timestamp"] = json!(ts);
            let (status, resp) = send(app.clone(), post_json("/data", &body)).await;
            assert_eq!(status, StatusCode::CREATED, "{ts}: {resp}");
        }

        let stored: Vec<String> = store.snapshot().await.into_iter().map(|r| r.timestamp).collect();
        assert_eq!(stored, forms);
    }

    #[tokio::test]
    async fn hour_past_midnight_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut body = store_a();
        body["timestamp"] = json!("2024-01-01T25:00");

        let (status, _) = send(app(store.clone(), StatusPolicy::Computed), post_json("/data", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn non_json_body_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let req = Request::builder()
            .method("POST")
            .uri("/data")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("entity=Store A"))
            .unwrap();

        let (status, body) = send(app(store.clone(), StatusPolicy::Computed), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request must be JSON.");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn json_array_body_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            app(store.clone(), StatusPolicy::Computed),
            post_json("/data", &json!([store_a()])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request body must be a JSON object.");
    }

    #[tokio::test]
    async fn duplicate_submissions_create_two_records() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), StatusPolicy::Computed);

        let (first, _) = send(app.clone(), post_json("/data", &store_a())).await;
        let (second, _) = send(app, post_json("/data", &store_a())).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CREATED);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn negative_inventory_level_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let mut body = store_a();
        body["inventory_level"] = json!(-20);

        let (status, resp) = send(app(store.clone(), StatusPolicy::Computed), post_json("/data", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["status"], "critical");
    }

    #[tokio::test]
    async fn store_failure_is_a_server_error() {
        let (status, body) = send(
            app(Arc::new(FailingStore), StatusPolicy::Computed),
            post_json("/data", &store_a()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Server error:"), "message: {message}");
        assert!(message.contains("connection refused"), "message: {message}");
    }

    // ── Ingestion: supplied policy ─────────────────────────────────────────────

    fn supplied_body(status: &str) -> Value {
        json!({
            "entity": "warehouse",
            "location": "Mumbai",
            "inventory_level": 420,
            "timestamp": "2024-05-01T08:00:00Z",
            "status": status
        })
    }

    #[tokio::test]
    async fn supplied_status_is_normalized() {
        let store = Arc::new(MemoryStore::new());
        let (status, resp) = send(
            app(store.clone(), StatusPolicy::Supplied),
            post_json("/data/submit", &supplied_body("NORMAL")),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["status"], "normal");
        assert_eq!(store.snapshot().await[0].status, Status::Normal);
    }

    #[tokio::test]
    async fn unknown_supplied_status_is_rejected_by_name() {
        let store = Arc::new(MemoryStore::new());
        let (status, resp) = send(
            app(store.clone(), StatusPolicy::Supplied),
            post_json("/data/submit", &supplied_body("urgent")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["message"].as_str().unwrap().contains("urgent"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn supplied_policy_requires_status() {
        let store = Arc::new(MemoryStore::new());
        let (status, resp) = send(
            app(store.clone(), StatusPolicy::Supplied),
            post_json("/data/submit", &store_a()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "Missing fields: status");
    }

    // ── Dashboard ──────────────────────────────────────────────────────────────

    async fn seeded_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let app = app(store, StatusPolicy::Computed);
        for (level, ts) in [
            (100, "2024-01-02T00:00:00Z"),
            (300, "2024-01-05T00:00:00Z"),
            (700, "2024-01-03T00:00:00Z"),
            (250, "2024-01-04T00:00:00Z"),
        ] {
            let mut body = store_a();
            body["inventory_level"] = json!(level);
            body["timestamp"] = json!(ts);
            let (status, _) = send(app.clone(), post_json("/data", &body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        app
    }

    fn timestamps(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["timestamp"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn dashboard_returns_newest_first() {
        let (status, body) = send(seeded_app().await, get("/data/dashboard")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(
            timestamps(&body),
            vec![
                "2024-01-05T00:00:00Z",
                "2024-01-04T00:00:00Z",
                "2024-01-03T00:00:00Z",
                "2024-01-02T00:00:00Z",
            ]
        );
    }

    #[tokio::test]
    async fn dashboard_honours_limit() {
        let (status, body) = send(seeded_app().await, get("/data/dashboard?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(timestamps(&body), vec!["2024-01-05T00:00:00Z", "2024-01-04T00:00:00Z"]);
    }

    #[tokio::test]
    async fn dashboard_repeated_limit_uses_the_first() {
        let (status, body) = send(seeded_app().await, get("/data/dashboard?limit=1&limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(timestamps(&body), vec!["2024-01-05T00:00:00Z"]);
    }

    #[tokio::test]
    async fn dashboard_limit_zero_is_empty() {
        let (status, body) = send(seeded_app().await, get("/data/dashboard?limit=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn dashboard_rows_have_no_internal_id() {
        let (_, body) = send(seeded_app().await, get("/data/dashboard?limit=1")).await;
        let row = body["data"][0].as_object().unwrap();
        assert!(!row.contains_key("_id") && !row.contains_key("id"));
        for key in ["entity", "location", "inventory_level", "status", "timestamp", "received_at"] {
            assert!(row.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn malformed_limit_is_a_server_error() {
        let (status, body) = send(seeded_app().await, get("/data/dashboard?limit=ten")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Server error:"));
    }

    #[tokio::test]
    async fn dashboard_store_failure_is_a_server_error() {
        let (status, _) = send(
            app(Arc::new(FailingStore), StatusPolicy::Computed),
            get("/data/dashboard"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(None).unwrap(), DEFAULT_DASHBOARD_LIMIT);
        assert_eq!(parse_limit(Some("5")).unwrap(), 5);
        assert_eq!(parse_limit(Some("-3")).unwrap(), 3);
        assert!(parse_limit(Some("")).is_err());
    }

    // ── Health ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_ok_and_policy() {
        let (status, body) = send(
            app(Arc::new(MemoryStore::new()), StatusPolicy::Supplied),
            get("/health"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["policy"], "supplied");
        assert_eq!(body["statuses"], json!(["normal", "warning", "critical"]));
    }
}
