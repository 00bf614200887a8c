use auditry_core::EventId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Flattened event row as persisted by the analytical store and the
/// search index.
///
/// The two stores are updated independently by the downstream pipeline
/// and may diverge; this shape is whatever the queried store returned,
/// not a reconciled view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredEvent {
    /// Generated event identifier.
    pub event_id: String,
    /// Tenant partition the event belongs to.
    pub tenant_id: String,
    /// Receipt date (`YYYY-MM-DD`), the store partition key.
    pub event_date: String,
    /// Receipt timestamp.
    pub received_at: DateTime<Utc>,
    /// Flattened `actor.id`.
    pub actor_id: String,
    /// Flattened `action.name`.
    pub action_name: String,
    /// Flattened `resource.type`.
    pub resource_type: String,
    /// Flattened `resource.id`.
    pub resource_id: String,
    /// Flattened `result.success`.
    pub result_success: bool,
}

impl StoredEvent {
    /// Renders one CSV export record, fields in header order.
    #[must_use]
    pub fn csv_record(&self) -> String {
        [
            csv_field(&self.event_id),
            csv_field(&self.event_date),
            csv_field(
                &self
                    .received_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            csv_field(&self.actor_id),
            csv_field(&self.action_name),
            csv_field(&self.resource_type),
            csv_field(&self.resource_id),
            csv_field(if self.result_success { "true" } else { "false" }),
        ]
        .join(",")
    }
}

/// Returns the CSV export header record.
#[must_use]
pub fn csv_header() -> &'static str {
    "event_id,event_date,received_at,actor_id,action,resource_type,resource_id,success"
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_owned()
    }
}

/// One page of events plus the continuation signal.
///
/// Pagination is offsetless: the service reports only whether more rows
/// exist beyond this page (`has_more`); there is no cursor token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    /// Events on this page, newest first.
    pub events: Vec<StoredEvent>,
    /// Whether rows beyond this page matched the query.
    pub has_more: bool,
}

impl EventPage {
    /// Builds a page from rows fetched with one sentinel row beyond the
    /// requested limit; the sentinel is trimmed, never returned.
    #[must_use]
    pub fn from_fetched(mut rows: Vec<StoredEvent>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        Self {
            events: rows,
            has_more,
        }
    }

    /// Wraps search hits, which carry no continuation signal.
    #[must_use]
    pub fn without_continuation(rows: Vec<StoredEvent>) -> Self {
        Self {
            events: rows,
            has_more: false,
        }
    }
}

/// Per-group counts for one aggregation bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationBucket {
    /// Value of the grouped column.
    pub key: String,
    /// Total events in the group.
    pub count: u64,
    /// Events with a successful result.
    pub success: u64,
    /// Events with a failed result.
    pub failed: u64,
}

/// Aggregation buckets plus the grand total across groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationReport {
    /// Buckets ordered by total descending.
    pub buckets: Vec<AggregationBucket>,
    /// Sum of every bucket's count.
    pub total: u64,
}

impl AggregationReport {
    /// Totals up a bucket list produced by the store.
    #[must_use]
    pub fn from_buckets(buckets: Vec<AggregationBucket>) -> Self {
        let total = buckets.iter().map(|bucket| bucket.count).sum();
        Self { buckets, total }
    }
}

/// Classification of one batch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Element passed validation and was dispatched.
    Accepted,
    /// Element failed validation; nothing was dispatched for it.
    Rejected,
}

/// Outcome entry for one batch element, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Generated identifier for accepted elements, empty for rejected.
    pub event_id: String,
    /// Accept/reject classification.
    pub status: BatchStatus,
}

/// Ordered per-element results of one batch intake.
///
/// Entry order matches input order; `accepted + rejected` always equals
/// the number of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    accepted: usize,
    rejected: usize,
    entries: Vec<BatchEntry>,
}

impl BatchOutcome {
    /// Creates an empty outcome sized for one batch.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Records an accepted element with its generated identifier.
    pub fn record_accepted(&mut self, event_id: EventId) {
        self.accepted += 1;
        self.entries.push(BatchEntry {
            event_id: event_id.to_string(),
            status: BatchStatus::Accepted,
        });
    }

    /// Records a rejected element.
    pub fn record_rejected(&mut self) {
        self.rejected += 1;
        self.entries.push(BatchEntry {
            event_id: String::new(),
            status: BatchStatus::Rejected,
        });
    }

    /// Returns the accepted element count.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Returns the rejected element count.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Returns the per-element entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }
}
