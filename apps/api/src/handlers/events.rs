use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header;
use axum::response::Response;
use chrono::Utc;
use futures::StreamExt;

use auditry_core::{AppError, TenantScope};
use auditry_domain::csv_header;

use crate::dto::{
    AggregationQuery, AggregationsResponse, EventResponse, ListEventsResponse, ListQuery,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_events_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListEventsResponse>> {
    // A free-text query takes over the whole request.
    if let Some(text) = query.q.as_deref().filter(|text| !text.is_empty()) {
        let page = state.query_service.search_events(&scope, text).await?;
        return Ok(Json(page.into()));
    }

    let filter = query.filter()?;
    let page = state
        .query_service
        .list_events(&scope, &filter, query.page_limit())
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_event_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventResponse>> {
    let event = state.query_service.find_event(&scope, &event_id).await?;
    Ok(Json(event.into()))
}

pub async fn aggregations_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<AggregationQuery>,
) -> ApiResult<Json<AggregationsResponse>> {
    let report = state
        .query_service
        .aggregate_events(&scope, query.group_by(), query.range()?)
        .await?;
    Ok(Json(report.into()))
}

pub async fn export_events_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    if query.format.as_deref().is_some_and(|format| format != "csv") {
        return Err(AppError::Validation("only csv format supported".to_owned()).into());
    }

    let filter = query.filter()?;
    let rows = state.query_service.export_events(&scope, &filter).await?;

    let header_line =
        futures::stream::once(async { Ok::<String, AppError>(format!("{}\n", csv_header())) });
    let records = rows.map(|row| row.map(|event| format!("{}\n", event.csv_record())));

    let filename = format!("audit-events-{}.csv", Utc::now().format("%Y-%m-%d"));
    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(header_line.chain(records)))
        .map_err(|error| {
            ApiError::from(AppError::Internal(format!(
                "failed to build export response: {error}"
            )))
        })
}
