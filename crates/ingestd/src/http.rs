//! HTTP surface
//!
//! # Endpoints
//!
//! - `POST /api/v1/telemetry` - submit one reading (requires `X-API-Key`)
//! - `GET /metrics` - ingestion counters, text exposition format
//! - `GET /health` - health check
//!
//! Authentication failures return 401 before the body is touched. An
//! accepted submission is stamped with the server receipt time and handed
//! to the dispatcher. The response says nothing about downstream fate:
//! shedding and write failures are visible only through `/metrics`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use fleet_auth::ApiKeyValidator;
use fleet_domain::TelemetrySubmission;
use fleet_metrics::IngestionMetrics;
use fleet_pipeline::Dispatcher;

/// Shared state for handlers
pub struct AppState {
    pub validator: Arc<ApiKeyValidator>,
    pub dispatcher: Dispatcher,
    pub metrics: Arc<IngestionMetrics>,
}

/// Build the axum router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/telemetry", post(ingest_telemetry))
        .route("/metrics", get(metrics_text))
        .route("/health", get(health_check))
        .with_state(state)
}

/// POST /api/v1/telemetry - authenticated telemetry submission
async fn ingest_telemetry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let api_key = match headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty())
    {
        Some(key) => key,
        None => return error_response(StatusCode::UNAUTHORIZED, "missing X-API-Key header"),
    };

    if !state.validator.validate(api_key).await {
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key");
    }

    let submission: TelemetrySubmission = match serde_json::from_slice(&body) {
        Ok(s) => s,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid telemetry payload: {e}"),
            );
        }
    };

    if let Err(e) = submission.validate() {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }

    let msg = submission.into_message(Utc::now(), body.to_vec());

    state.metrics.record_message_received();
    state.dispatcher.dispatch(Arc::new(msg));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"status": "accepted"})),
    )
        .into_response()
}

/// GET /metrics - counters in the text exposition format
async fn metrics_text(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, fleet_metrics::TEXT_CONTENT_TYPE)],
        state.metrics.render_text(),
    )
        .into_response()
}

/// GET /health - health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}
