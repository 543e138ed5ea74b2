use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::models::{DownAlertRecord, WebhookEvent, WebhookPayload};
use crate::processing::WebhookLogEntry;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness probe used by the helpdesk webhook configuration
pub async fn webhook_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Receive a Freshdesk automation webhook
pub async fn receive_freshdesk_event(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    let event = match WebhookEvent::from_payload(payload) {
        Ok(event) => event,
        Err(AppError::Validation(message)) if message == "Missing event_type" => {
            warn!("Webhook without event_type rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing event_type" })),
            )
                .into_response();
        }
        Err(e) => return e.into_response(),
    };

    let event_type = event.event_type().to_string();
    let ticket_id = event.ticket_id();

    // Runs detached so a dropped connection cannot cancel a half-finished resolution
    let dispatcher = state.dispatcher.clone();
    let dispatched = tokio::spawn(async move { dispatcher.dispatch(event).await })
        .await
        .unwrap_or_else(|e| {
            Err(AppError::Internal(format!(
                "Event handling task failed: {}",
                e
            )))
        });

    match dispatched {
        Ok(outcome) => {
            state
                .webhook_log
                .record(event_type, ticket_id, outcome.label());
            Json(json!({ "success": true, "outcome": outcome })).into_response()
        }
        Err(e) => {
            error!(event_type = %event_type, ticket_id = ?ticket_id, error = %e, "Webhook processing error");
            state.webhook_log.record(event_type, ticket_id, "error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<String>,
}

/// Most recent webhook events
pub async fn webhook_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<WebhookLogEntry>> {
    let limit = query
        .limit
        .and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(20);
    Json(state.webhook_log.recent(limit))
}

/// Open DOWN alert records, newest first
pub async fn list_down_alerts(State(state): State<AppState>) -> Result<Json<Vec<DownAlertRecord>>> {
    let records = state.store.list_down().await?;
    Ok(Json(records))
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
