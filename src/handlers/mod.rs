pub mod data;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "supply-chain-service",
            "policy": state.policy.as_str(),
            "statuses": state.policy.allowed_statuses(),
        })),
    )
}
