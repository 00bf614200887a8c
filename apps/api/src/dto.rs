use auditry_application::IngestReceipt;
use auditry_core::{AppError, AppResult};
use auditry_domain::{
    AggregationReport, BatchOutcome, BatchStatus, DateRange, EventFilter, EventPage, GroupBy,
    StoredEvent, page_limit,
};
use chrono::{NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Query string accepted by the list and export routes.
///
/// `limit` and `success` arrive as raw strings; the original wire
/// contract tolerates junk values there instead of rejecting them.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub action: Option<String>,
    pub actor_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub success: Option<String>,
    pub limit: Option<String>,
    pub format: Option<String>,
}

impl ListQuery {
    /// Builds the structured filter, rejecting malformed dates.
    pub fn filter(&self) -> AppResult<EventFilter> {
        Ok(EventFilter {
            action: self.action.clone(),
            actor_id: self.actor_id.clone(),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
            range: parse_range(self.from.as_deref(), self.to.as_deref())?,
            success: self.success.as_deref().map(|value| value == "true"),
        })
    }

    /// Effective page size after fallback and clamping.
    #[must_use]
    pub fn page_limit(&self) -> usize {
        page_limit(self.limit.as_deref())
    }
}

/// Query string accepted by the aggregations route.
#[derive(Debug, Default, Deserialize)]
pub struct AggregationQuery {
    pub group_by: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AggregationQuery {
    #[must_use]
    pub fn group_by(&self) -> GroupBy {
        GroupBy::parse(self.group_by.as_deref())
    }

    pub fn range(&self) -> AppResult<DateRange> {
        parse_range(self.from.as_deref(), self.to.as_deref())
    }
}

fn parse_range(from: Option<&str>, to: Option<&str>) -> AppResult<DateRange> {
    Ok(DateRange {
        from: parse_date("from", from)?,
        to: parse_date("to", to)?,
    })
}

fn parse_date(name: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    value
        .map(|raw| {
            raw.parse::<NaiveDate>().map_err(|_| {
                AppError::Validation(format!("{name} must be a date in YYYY-MM-DD format"))
            })
        })
        .transpose()
}

/// Liveness probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Accepted single-event receipt.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub event_id: String,
    pub received_at: String,
}

impl From<IngestReceipt> for IngestResponse {
    fn from(receipt: IngestReceipt) -> Self {
        Self {
            event_id: receipt.event_id.to_string(),
            received_at: receipt
                .received_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Per-element entry of a batch receipt.
#[derive(Debug, Serialize)]
pub struct BatchEntryResponse {
    pub event_id: String,
    pub status: BatchStatus,
}

/// Batch intake receipt with per-element results in input order.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub accepted: usize,
    pub rejected: usize,
    pub events: Vec<BatchEntryResponse>,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            accepted: outcome.accepted(),
            rejected: outcome.rejected(),
            events: outcome
                .entries()
                .iter()
                .map(|entry| BatchEntryResponse {
                    event_id: entry.event_id.clone(),
                    status: entry.status,
                })
                .collect(),
        }
    }
}

/// One stored event projected back into the nested wire shape.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub tenant_id: String,
    pub event_date: String,
    pub received_at: String,
    pub actor: serde_json::Value,
    pub action: serde_json::Value,
    pub resource: serde_json::Value,
    pub result: serde_json::Value,
}

impl From<StoredEvent> for EventResponse {
    fn from(event: StoredEvent) -> Self {
        Self {
            event_id: event.event_id,
            tenant_id: event.tenant_id,
            event_date: event.event_date,
            received_at: event
                .received_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            actor: json!({ "id": event.actor_id }),
            action: json!({ "name": event.action_name }),
            resource: json!({ "type": event.resource_type, "id": event.resource_id }),
            result: json!({ "success": event.result_success }),
        }
    }
}

/// Offsetless pagination envelope; `cursor` is reserved and stays empty.
#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    pub cursor: String,
    pub has_more: bool,
}

/// Paginated event listing.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    pub data: Vec<EventResponse>,
    pub pagination: PaginationInfo,
    pub total_count: u64,
}

impl From<EventPage> for ListEventsResponse {
    fn from(page: EventPage) -> Self {
        let data: Vec<EventResponse> = page.events.into_iter().map(EventResponse::from).collect();
        Self {
            total_count: data.len() as u64,
            pagination: PaginationInfo {
                cursor: String::new(),
                has_more: page.has_more,
            },
            data,
        }
    }
}

/// One aggregation group.
#[derive(Debug, Serialize)]
pub struct AggregationEntry {
    pub key: String,
    pub count: u64,
    pub success: u64,
    pub failed: u64,
}

/// Grouped counts plus the grand total across groups.
#[derive(Debug, Serialize)]
pub struct AggregationsResponse {
    pub aggregations: Vec<AggregationEntry>,
    pub total: u64,
}

impl From<AggregationReport> for AggregationsResponse {
    fn from(report: AggregationReport) -> Self {
        Self {
            total: report.total,
            aggregations: report
                .buckets
                .into_iter()
                .map(|bucket| AggregationEntry {
                    key: bucket.key,
                    count: bucket.count,
                    success: bucket.success,
                    failed: bucket.failed,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ListQuery, parse_date};

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_date("from", Some("not-a-date")).is_err());
        assert!(matches!(parse_date("to", None), Ok(None)));
    }

    #[test]
    fn success_parses_loosely() {
        let query = ListQuery {
            success: Some("yes".to_owned()),
            ..ListQuery::default()
        };
        let filter = match query.filter() {
            Ok(filter) => filter,
            Err(error) => panic!("filter should build: {error}"),
        };

        // Anything other than the literal "true" means false.
        assert_eq!(filter.success, Some(false));
    }
}
