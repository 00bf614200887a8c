use async_trait::async_trait;
use auditry_application::{EventStore, ExportStream};
use auditry_core::{AppError, AppResult, TenantScope};
use auditry_domain::{AggregationBucket, DateRange, EventFilter, GroupBy, StoredEvent};
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Deserializer};

mod sql;

use sql::SqlQuery;

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// Base URL of the HTTP interface, e.g. `http://clickhouse:8123`.
    pub url: String,
    /// Database holding the flat `events` table.
    pub database: String,
    /// Query user.
    pub user: String,
    /// Query user password.
    pub password: String,
}

/// Analytical store adapter over the ClickHouse HTTP interface.
///
/// Statements are sent as the request body with caller values bound via
/// `param_*` query parameters; rows come back as `JSONEachRow` lines.
#[derive(Clone)]
pub struct ClickHouseEventStore {
    http_client: reqwest::Client,
    config: ClickHouseConfig,
}

impl ClickHouseEventStore {
    /// Creates the adapter over a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: ClickHouseConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn request(&self, query: SqlQuery) -> reqwest::RequestBuilder {
        let mut pairs: Vec<(String, String)> = vec![
            ("database".to_owned(), self.config.database.clone()),
            // 64-bit aggregates must come back as JSON numbers, not strings.
            (
                "output_format_json_quote_64bit_integers".to_owned(),
                "0".to_owned(),
            ),
        ];
        for (name, value) in query.params {
            pairs.push((format!("param_{name}"), value));
        }

        self.http_client
            .post(&self.config.url)
            .query(&pairs)
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(query.sql)
    }

    async fn send(&self, query: SqlQuery) -> AppResult<reqwest::Response> {
        tracing::debug!(sql = %query.sql, "executing analytical store query");
        let response = self
            .request(query)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("analytical store request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "analytical store returned status {status}: {detail}"
            )));
        }

        Ok(response)
    }

    async fn fetch_rows<Row>(&self, query: SqlQuery) -> AppResult<Vec<Row>>
    where
        Row: for<'de> Deserialize<'de>,
    {
        let body = self.send(query).await?.text().await.map_err(|error| {
            AppError::Internal(format!("analytical store response unreadable: {error}"))
        })?;

        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<Row>(line).map_err(|error| {
                    AppError::Internal(format!("analytical store returned a malformed row: {error}"))
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for ClickHouseEventStore {
    async fn list_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
        fetch_limit: usize,
    ) -> AppResult<Vec<StoredEvent>> {
        let rows: Vec<EventRow> = self
            .fetch_rows(sql::select_events(scope, filter, fetch_limit))
            .await?;
        rows.into_iter().map(EventRow::into_stored).collect()
    }

    async fn find_event(
        &self,
        scope: &TenantScope,
        event_id: &str,
    ) -> AppResult<Option<StoredEvent>> {
        let rows: Vec<EventRow> = self
            .fetch_rows(sql::select_event_by_id(scope, event_id))
            .await?;
        rows.into_iter().next().map(EventRow::into_stored).transpose()
    }

    async fn aggregate_events(
        &self,
        scope: &TenantScope,
        group_by: GroupBy,
        range: DateRange,
    ) -> AppResult<Vec<AggregationBucket>> {
        let rows: Vec<AggregationRow> = self
            .fetch_rows(sql::select_aggregations(scope, group_by, range))
            .await?;
        Ok(rows.into_iter().map(AggregationRow::into_bucket).collect())
    }

    async fn export_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
    ) -> AppResult<ExportStream> {
        let response = self.send(sql::select_export(scope, filter)).await?;

        // Rows surface as response lines arrive; the full result set is
        // never buffered.
        let stream = futures::stream::try_unfold(
            (response, Vec::<u8>::new()),
            |(mut response, mut buffer)| async move {
                loop {
                    if let Some(line) = take_line(&mut buffer) {
                        if line.is_empty() {
                            continue;
                        }
                        let row: EventRow = serde_json::from_slice(&line).map_err(|error| {
                            AppError::Internal(format!(
                                "analytical store returned a malformed row: {error}"
                            ))
                        })?;
                        return Ok(Some((row.into_stored()?, (response, buffer))));
                    }

                    let chunk = response.chunk().await.map_err(|error| {
                        AppError::Internal(format!("analytical store stream failed: {error}"))
                    })?;
                    match chunk {
                        Some(bytes) => buffer.extend_from_slice(&bytes),
                        None if buffer.iter().all(u8::is_ascii_whitespace) => return Ok(None),
                        None => buffer.push(b'\n'),
                    }
                }
            },
        );

        Ok(stream.boxed())
    }
}

/// Splits one newline-terminated line off the front of the buffer.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let position = buffer.iter().position(|byte| *byte == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=position).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

#[derive(Debug, Deserialize)]
struct EventRow {
    event_id: String,
    tenant_id: String,
    event_date: String,
    received_at: String,
    actor_id: String,
    action_name: String,
    resource_type: String,
    resource_id: String,
    #[serde(deserialize_with = "bool_from_json")]
    result_success: bool,
}

impl EventRow {
    fn into_stored(self) -> AppResult<StoredEvent> {
        let received_at = parse_received_at(&self.received_at)?;
        Ok(StoredEvent {
            event_id: self.event_id,
            tenant_id: self.tenant_id,
            event_date: self.event_date,
            received_at,
            actor_id: self.actor_id,
            action_name: self.action_name,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            result_success: self.result_success,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AggregationRow {
    key: String,
    total: u64,
    success: u64,
    failed: u64,
}

impl AggregationRow {
    fn into_bucket(self) -> AggregationBucket {
        AggregationBucket {
            key: self.key,
            count: self.total,
            success: self.success,
            failed: self.failed,
        }
    }
}

/// ClickHouse emits `DateTime64` as `YYYY-MM-DD HH:MM:SS.fff`; RFC 3339
/// is accepted as well for stores configured with ISO output.
fn parse_received_at(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            AppError::Internal(format!("unexpected received_at value '{raw}': {error}"))
        })
}

/// Accepts both `Bool` (true/false) and `UInt8` (0/1) success columns.
fn bool_from_json<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u8),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(value) => Ok(value != 0),
    }
}
