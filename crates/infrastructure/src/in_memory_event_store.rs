use std::collections::BTreeMap;

use async_trait::async_trait;
use auditry_application::{EventStore, ExportStream, SearchIndex};
use auditry_core::{AppResult, TenantScope};
use auditry_domain::{AggregationBucket, DateRange, EventFilter, GroupBy, StoredEvent};
use futures::StreamExt;
use tokio::sync::Mutex;

/// In-memory stand-in for both backing stores, used by tests.
///
/// Mirrors the scoping and filtering semantics of the real adapters so
/// service- and handler-level tests can run against it unchanged.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds stored events.
    pub async fn push_events(&self, events: impl IntoIterator<Item = StoredEvent>) {
        self.events.lock().await.extend(events);
    }
}

/// Applies scope and filter the way the analytical store composes its
/// WHERE clause, newest first.
fn filter_rows(rows: &[StoredEvent], scope: &TenantScope, filter: &EventFilter) -> Vec<StoredEvent> {
    let mut matched: Vec<StoredEvent> = rows
        .iter()
        .filter(|row| visible_to(scope, row) && matches_filter(filter, row))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    matched
}

fn visible_to(scope: &TenantScope, row: &StoredEvent) -> bool {
    scope.tenant().is_none_or(|tenant| row.tenant_id == tenant)
}

fn matches_filter(filter: &EventFilter, row: &StoredEvent) -> bool {
    let field_match = |predicate: &Option<String>, value: &str| {
        predicate.as_deref().is_none_or(|expected| expected == value)
    };

    field_match(&filter.action, &row.action_name)
        && field_match(&filter.actor_id, &row.actor_id)
        && field_match(&filter.resource_type, &row.resource_type)
        && field_match(&filter.resource_id, &row.resource_id)
        && matches_range(filter.range, row)
        && filter
            .success
            .is_none_or(|expected| row.result_success == expected)
}

fn matches_range(range: DateRange, row: &StoredEvent) -> bool {
    range
        .from
        .is_none_or(|from| row.event_date.as_str() >= from.to_string().as_str())
        && range
            .to
            .is_none_or(|to| row.event_date.as_str() <= to.to_string().as_str())
}

fn group_key(group_by: GroupBy, row: &StoredEvent) -> String {
    match group_by {
        GroupBy::Action => row.action_name.clone(),
        GroupBy::Actor => row.actor_id.clone(),
        GroupBy::ResourceType => row.resource_type.clone(),
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
        fetch_limit: usize,
    ) -> AppResult<Vec<StoredEvent>> {
        let rows = self.events.lock().await;
        let mut matched = filter_rows(&rows, scope, filter);
        matched.truncate(fetch_limit);
        Ok(matched)
    }

    async fn find_event(
        &self,
        scope: &TenantScope,
        event_id: &str,
    ) -> AppResult<Option<StoredEvent>> {
        let rows = self.events.lock().await;
        Ok(rows
            .iter()
            .find(|row| row.event_id == event_id && visible_to(scope, row))
            .cloned())
    }

    async fn aggregate_events(
        &self,
        scope: &TenantScope,
        group_by: GroupBy,
        range: DateRange,
    ) -> AppResult<Vec<AggregationBucket>> {
        let filter = EventFilter {
            range,
            ..EventFilter::default()
        };
        let rows = self.events.lock().await;

        let mut groups: BTreeMap<String, AggregationBucket> = BTreeMap::new();
        for row in filter_rows(&rows, scope, &filter) {
            let bucket = groups
                .entry(group_key(group_by, &row))
                .or_insert_with_key(|key| AggregationBucket {
                    key: key.clone(),
                    ..AggregationBucket::default()
                });
            bucket.count += 1;
            if row.result_success {
                bucket.success += 1;
            } else {
                bucket.failed += 1;
            }
        }

        let mut buckets: Vec<AggregationBucket> = groups.into_values().collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count));
        buckets.truncate(100);
        Ok(buckets)
    }

    async fn export_events(
        &self,
        scope: &TenantScope,
        filter: &EventFilter,
    ) -> AppResult<ExportStream> {
        let rows = self.events.lock().await;
        let matched = filter_rows(&rows, scope, filter);
        Ok(futures::stream::iter(matched.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl SearchIndex for InMemoryEventStore {
    async fn search_events(
        &self,
        scope: &TenantScope,
        query: &str,
    ) -> AppResult<Vec<StoredEvent>> {
        let rows = self.events.lock().await;
        let mut matched: Vec<StoredEvent> = rows
            .iter()
            .filter(|row| {
                visible_to(scope, row)
                    && (row.actor_id.contains(query)
                        || row.action_name.contains(query)
                        || row.resource_id.contains(query))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        matched.truncate(50);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use auditry_core::TenantScope;
    use auditry_domain::{EventFilter, StoredEvent};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::filter_rows;

    fn stored(event_id: &str, tenant: &str, action: &str, offset_seconds: i64) -> StoredEvent {
        let base = Utc
            .with_ymd_and_hms(2026, 8, 27, 12, 0, 0)
            .single()
            .unwrap_or_default();
        StoredEvent {
            event_id: event_id.to_owned(),
            tenant_id: tenant.to_owned(),
            event_date: "2026-08-27".to_owned(),
            received_at: base + Duration::seconds(offset_seconds),
            actor_id: "user-1".to_owned(),
            action_name: action.to_owned(),
            resource_type: "user".to_owned(),
            resource_id: "r-1".to_owned(),
            result_success: true,
        }
    }

    #[test]
    fn rows_come_back_newest_first() {
        let rows = vec![
            stored("old", "acme", "a", 0),
            stored("new", "acme", "a", 10),
        ];

        let listed = filter_rows(&rows, &TenantScope::Unscoped, &EventFilter::default());
        assert_eq!(listed[0].event_id, "new");
        assert_eq!(listed[1].event_id, "old");
    }

    proptest! {
        /// A tenant-bound caller never sees another tenant's rows, for
        /// any combination of structured predicates.
        #[test]
        fn tenant_bound_queries_never_leak_other_tenants(
            tenants in proptest::collection::vec("(acme|globex|initech)", 0..40),
            action in proptest::option::of("(user\\.created|user\\.deleted)"),
            success in proptest::option::of(any::<bool>()),
        ) {
            let rows: Vec<StoredEvent> = tenants
                .iter()
                .enumerate()
                .map(|(index, tenant)| {
                    let mut row = stored(&format!("e{index}"), tenant, "user.created", index as i64);
                    row.result_success = index % 2 == 0;
                    row
                })
                .collect();
            let filter = EventFilter {
                action: action.clone(),
                success,
                ..EventFilter::default()
            };

            let scope = TenantScope::Tenant("acme".to_owned());
            let listed = filter_rows(&rows, &scope, &filter);

            prop_assert!(listed.iter().all(|row| row.tenant_id == "acme"));
        }
    }
}
