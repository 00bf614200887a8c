use std::sync::Arc;

use auditry_core::{AppError, AppResult, TenantScope};
use auditry_domain::{
    AggregationReport, DateRange, EventFilter, EventPage, GroupBy, StoredEvent,
};

use crate::ports::{EventStore, ExportStream, SearchIndex};

/// Tenant-scoped reads over the analytical store and the search index.
///
/// Callers hand in an already-resolved [`TenantScope`]; every method
/// passes it into query composition so scoping happens inside the
/// backend query, never as post-filtering.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn EventStore>,
    index: Arc<dyn SearchIndex>,
}

impl QueryService {
    /// Creates the service over the two backing-store ports.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// Lists events matching the structured filter, newest first.
    ///
    /// Fetches one sentinel row beyond `limit` to compute `has_more`;
    /// the sentinel is trimmed before returning.
    pub async fn list_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
        limit: usize,
    ) -> AppResult<EventPage> {
        let rows = self.store.list_events(scope, filter, limit + 1).await?;
        Ok(EventPage::from_fetched(rows, limit))
    }

    /// Runs a free-text search; takes over the whole list request when a
    /// query string is supplied.
    pub async fn search_events(&self, scope: &TenantScope, query: &str) -> AppResult<EventPage> {
        let rows = self.index.search_events(scope, query).await?;
        Ok(EventPage::without_continuation(rows))
    }

    /// Finds one event by identifier.
    ///
    /// "Does not exist" and "exists for another tenant" are deliberately
    /// indistinguishable.
    pub async fn find_event(&self, scope: &TenantScope, event_id: &str) -> AppResult<StoredEvent> {
        self.store
            .find_event(scope, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event not found".to_owned()))
    }

    /// Aggregates per-group totals within a date window.
    pub async fn aggregate_events(
        &self,
        scope: &TenantScope,
        group_by: GroupBy,
        range: DateRange,
    ) -> AppResult<AggregationReport> {
        let buckets = self.store.aggregate_events(scope, group_by, range).await?;
        Ok(AggregationReport::from_buckets(buckets))
    }

    /// Streams events matching the structured filter for bulk export.
    pub async fn export_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
    ) -> AppResult<ExportStream> {
        self.store.export_events(scope, filter).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use auditry_core::{AppError, AppResult, TenantScope};
    use auditry_domain::{
        AggregationBucket, DateRange, EventFilter, GroupBy, StoredEvent,
    };
    use tokio::sync::Mutex;

    use super::QueryService;
    use crate::ports::{EventStore, ExportStream, SearchIndex};

    struct FakeStore {
        rows: Vec<StoredEvent>,
        seen_fetch_limits: Mutex<Vec<usize>>,
    }

    impl FakeStore {
        fn with_rows(rows: Vec<StoredEvent>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                seen_fetch_limits: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EventStore for FakeStore {
        async fn list_events(
            &self,
            _scope: &TenantScope,
            _filter: &EventFilter,
            fetch_limit: usize,
        ) -> AppResult<Vec<StoredEvent>> {
            self.seen_fetch_limits.lock().await.push(fetch_limit);
            Ok(self.rows.iter().take(fetch_limit).cloned().collect())
        }

        async fn find_event(
            &self,
            scope: &TenantScope,
            event_id: &str,
        ) -> AppResult<Option<StoredEvent>> {
            Ok(self
                .rows
                .iter()
                .filter(|row| scope.tenant().is_none_or(|tenant| row.tenant_id == tenant))
                .find(|row| row.event_id == event_id)
                .cloned())
        }

        async fn aggregate_events(
            &self,
            _scope: &TenantScope,
            _group_by: GroupBy,
            _range: DateRange,
        ) -> AppResult<Vec<AggregationBucket>> {
            Ok(vec![
                AggregationBucket {
                    key: "a".to_owned(),
                    count: 4,
                    success: 3,
                    failed: 1,
                },
                AggregationBucket {
                    key: "b".to_owned(),
                    count: 2,
                    success: 2,
                    failed: 0,
                },
            ])
        }

        async fn export_events(
            &self,
            _scope: &TenantScope,
            _filter: &EventFilter,
        ) -> AppResult<ExportStream> {
            Err(AppError::Internal("not used in this test".to_owned()))
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl SearchIndex for EmptyIndex {
        async fn search_events(
            &self,
            _scope: &TenantScope,
            _query: &str,
        ) -> AppResult<Vec<StoredEvent>> {
            Ok(Vec::new())
        }
    }

    fn stored(event_id: &str, tenant: &str) -> StoredEvent {
        StoredEvent {
            event_id: event_id.to_owned(),
            tenant_id: tenant.to_owned(),
            ..StoredEvent::default()
        }
    }

    #[tokio::test]
    async fn list_fetches_one_sentinel_row() {
        let store = FakeStore::with_rows((0..5).map(|n| stored(&format!("e{n}"), "acme")).collect());
        let service = QueryService::new(store.clone(), Arc::new(EmptyIndex));

        let page = match service
            .list_events(&TenantScope::Unscoped, &EventFilter::default(), 3)
            .await
        {
            Ok(page) => page,
            Err(error) => panic!("list failed: {error}"),
        };

        assert_eq!(store.seen_fetch_limits.lock().await.as_slice(), &[4]);
        assert!(page.has_more);
        assert_eq!(page.events.len(), 3);
    }

    #[tokio::test]
    async fn short_page_reports_no_more_rows() {
        let store = FakeStore::with_rows(vec![stored("e1", "acme")]);
        let service = QueryService::new(store, Arc::new(EmptyIndex));

        let page = match service
            .list_events(&TenantScope::Unscoped, &EventFilter::default(), 50)
            .await
        {
            Ok(page) => page,
            Err(error) => panic!("list failed: {error}"),
        };

        assert!(!page.has_more);
        assert_eq!(page.events.len(), 1);
    }

    #[tokio::test]
    async fn tenant_invisible_event_reads_as_not_found() {
        let store = FakeStore::with_rows(vec![stored("e1", "acme")]);
        let service = QueryService::new(store, Arc::new(EmptyIndex));

        let other_tenant = TenantScope::Tenant("globex".to_owned());
        let missing = service.find_event(&other_tenant, "e1").await;
        let absent = service.find_event(&other_tenant, "no-such-id").await;

        assert!(matches!(missing, Err(AppError::NotFound(_))));
        assert!(matches!(absent, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn aggregation_report_carries_grand_total() {
        let store = FakeStore::with_rows(Vec::new());
        let service = QueryService::new(store, Arc::new(EmptyIndex));

        let report = match service
            .aggregate_events(&TenantScope::Unscoped, GroupBy::Action, DateRange::default())
            .await
        {
            Ok(report) => report,
            Err(error) => panic!("aggregation failed: {error}"),
        };

        assert_eq!(report.total, 6);
        assert_eq!(report.buckets.len(), 2);
    }

    #[tokio::test]
    async fn search_pages_never_continue() {
        let store = FakeStore::with_rows(Vec::new());
        let service = QueryService::new(store, Arc::new(EmptyIndex));

        let page = match service
            .search_events(&TenantScope::Tenant("acme".to_owned()), "login")
            .await
        {
            Ok(page) => page,
            Err(error) => panic!("search failed: {error}"),
        };

        assert!(!page.has_more);
        assert!(page.events.is_empty());
    }
}
