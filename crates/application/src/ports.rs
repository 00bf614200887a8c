use async_trait::async_trait;
use auditry_core::{AppResult, TenantScope};
use auditry_domain::{
    AggregationBucket, DateRange, EnrichedEvent, EventFilter, GroupBy, StoredEvent,
};
use futures::stream::BoxStream;

/// Row stream for exports; rows surface as they arrive from the store.
pub type ExportStream = BoxStream<'static, AppResult<StoredEvent>>;

/// Delivery port for the downstream collector.
///
/// One call transmits one enriched event; any failure is a delivery
/// failure for that event only.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Transmits one enriched event to the collector.
    async fn deliver(&self, event: &EnrichedEvent) -> AppResult<()>;
}

/// Read port for the analytical store holding the flat events table.
///
/// Every method receives the resolved tenant scope and must apply it
/// inside the composed query; results are never post-filtered.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Lists events matching the filter, newest first, fetching up to
    /// `fetch_limit` rows (the caller includes its sentinel row there).
    async fn list_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
        fetch_limit: usize,
    ) -> AppResult<Vec<StoredEvent>>;

    /// Finds one event by identifier within the tenant scope.
    async fn find_event(
        &self,
        scope: &TenantScope,
        event_id: &str,
    ) -> AppResult<Option<StoredEvent>>;

    /// Aggregates per-group totals within the tenant scope and date
    /// window, ordered by total descending.
    async fn aggregate_events(
        &self,
        scope: &TenantScope,
        group_by: GroupBy,
        range: DateRange,
    ) -> AppResult<Vec<AggregationBucket>>;

    /// Streams events matching the filter for bulk export, newest first.
    async fn export_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
    ) -> AppResult<ExportStream>;
}

/// Read port for the full-text search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Runs a fuzzy free-text query across event text fields within the
    /// tenant scope, newest first.
    async fn search_events(
        &self,
        scope: &TenantScope,
        query: &str,
    ) -> AppResult<Vec<StoredEvent>>;
}
