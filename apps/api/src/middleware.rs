use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use auditry_core::{AppError, TenantScope};

use crate::error::ApiResult;
use crate::state::AppState;

/// Shared-secret header required on every ingestion route.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Gateway-populated caller identity header required on every query route.
pub const CONSUMER_HEADER: &str = "x-consumer-name";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() || presented != state.ingest_api_key {
        return Err(AppError::Unauthorized("invalid API key".to_owned()).into());
    }

    Ok(next.run(request).await)
}

pub async fn resolve_tenant(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = request
        .headers()
        .get(CONSUMER_HEADER)
        .and_then(|value| value.to_str().ok());
    let scope = TenantScope::resolve(identity)?;

    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}
