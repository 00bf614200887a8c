use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use auditry_core::{AppError, AppResult};
use auditry_domain::AuditEvent;

use crate::dto::{BatchResponse, IngestResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn ingest_event_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let event: AuditEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation("invalid JSON".to_owned()))?;

    let receipt = state.ingest_service.ingest_one(event)?;
    Ok((StatusCode::ACCEPTED, Json(receipt.into())))
}

pub async fn ingest_batch_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BatchResponse>)> {
    let events = parse_batch_body(&body)?;
    let outcome = state.ingest_service.ingest_batch(events)?;
    Ok((StatusCode::ACCEPTED, Json(outcome.into())))
}

/// Batches arrive either as a bare array or wrapped in an `events` key.
fn parse_batch_body(body: &[u8]) -> AppResult<Vec<AuditEvent>> {
    if let Ok(events) = serde_json::from_slice::<Vec<AuditEvent>>(body) {
        return Ok(events);
    }

    #[derive(Deserialize)]
    struct BatchRequest {
        events: Vec<AuditEvent>,
    }

    serde_json::from_slice::<BatchRequest>(body)
        .map(|request| request.events)
        .map_err(|_| {
            AppError::Validation(
                "invalid JSON: expected an array or {\"events\": [...]}".to_owned(),
            )
        })
}
