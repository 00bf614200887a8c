use auditry_core::TenantScope;
use auditry_domain::{DateRange, EventFilter, GroupBy};

/// Row ceiling for bulk export queries.
const EXPORT_ROW_LIMIT: usize = 100_000;

/// Bucket ceiling for aggregation queries.
const AGGREGATION_GROUP_LIMIT: usize = 100;

const EVENT_COLUMNS: &str = "event_id, tenant_id, event_date, received_at, \
     actor_id, action_name, resource_type, resource_id, result_success";

/// One composed ClickHouse statement with its bound parameters.
///
/// Caller-supplied values only ever travel through `{name:Type}`
/// placeholders; nothing from the request is spliced into the SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SqlQuery {
    pub sql: String,
    pub params: Vec<(&'static str, String)>,
}

/// Composes the paginated list query; `fetch_limit` already includes the
/// caller's sentinel row.
pub(super) fn select_events(
    scope: &TenantScope,
    filter: &EventFilter,
    fetch_limit: usize,
) -> SqlQuery {
    let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1 = 1");
    let mut params = Vec::new();

    push_scope(&mut sql, &mut params, scope);
    push_filter(&mut sql, &mut params, filter);
    sql.push_str(&format!(
        " ORDER BY received_at DESC LIMIT {fetch_limit} FORMAT JSONEachRow"
    ));

    SqlQuery { sql, params }
}

/// Composes the single-event lookup.
pub(super) fn select_event_by_id(scope: &TenantScope, event_id: &str) -> SqlQuery {
    let mut sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = {{event_id:String}}"
    );
    let mut params = vec![("event_id", event_id.to_owned())];

    push_scope(&mut sql, &mut params, scope);
    sql.push_str(" LIMIT 1 FORMAT JSONEachRow");

    SqlQuery { sql, params }
}

/// Composes the grouped aggregation query.
pub(super) fn select_aggregations(
    scope: &TenantScope,
    group_by: GroupBy,
    range: DateRange,
) -> SqlQuery {
    let column = group_by.column();
    let mut sql = format!(
        "SELECT {column} AS key, count() AS total, \
         countIf(result_success = 1) AS success, \
         countIf(result_success = 0) AS failed \
         FROM events WHERE 1 = 1"
    );
    let mut params = Vec::new();

    push_scope(&mut sql, &mut params, scope);
    push_range(&mut sql, &mut params, range);
    sql.push_str(&format!(
        " GROUP BY key ORDER BY total DESC LIMIT {AGGREGATION_GROUP_LIMIT} FORMAT JSONEachRow"
    ));

    SqlQuery { sql, params }
}

/// Composes the bulk export query: the full structured filter set, no
/// pagination, capped at the export row limit.
pub(super) fn select_export(scope: &TenantScope, filter: &EventFilter) -> SqlQuery {
    let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1 = 1");
    let mut params = Vec::new();

    push_scope(&mut sql, &mut params, scope);
    push_filter(&mut sql, &mut params, filter);
    sql.push_str(&format!(
        " ORDER BY received_at DESC LIMIT {EXPORT_ROW_LIMIT} FORMAT JSONEachRow"
    ));

    SqlQuery { sql, params }
}

fn push_scope(sql: &mut String, params: &mut Vec<(&'static str, String)>, scope: &TenantScope) {
    if let Some(tenant) = scope.tenant() {
        sql.push_str(" AND tenant_id = {tenant:String}");
        params.push(("tenant", tenant.to_owned()));
    }
}

fn push_filter(sql: &mut String, params: &mut Vec<(&'static str, String)>, filter: &EventFilter) {
    if let Some(action) = &filter.action {
        sql.push_str(" AND action_name = {action:String}");
        params.push(("action", action.clone()));
    }
    if let Some(actor_id) = &filter.actor_id {
        sql.push_str(" AND actor_id = {actor_id:String}");
        params.push(("actor_id", actor_id.clone()));
    }
    if let Some(resource_type) = &filter.resource_type {
        sql.push_str(" AND resource_type = {resource_type:String}");
        params.push(("resource_type", resource_type.clone()));
    }
    if let Some(resource_id) = &filter.resource_id {
        sql.push_str(" AND resource_id = {resource_id:String}");
        params.push(("resource_id", resource_id.clone()));
    }
    push_range(sql, params, filter.range);
    if let Some(success) = filter.success {
        sql.push_str(" AND result_success = {success:UInt8}");
        params.push(("success", if success { "1" } else { "0" }.to_owned()));
    }
}

fn push_range(sql: &mut String, params: &mut Vec<(&'static str, String)>, range: DateRange) {
    if let Some(from) = range.from {
        sql.push_str(" AND event_date >= {from:Date}");
        params.push(("from", from.to_string()));
    }
    if let Some(to) = range.to {
        sql.push_str(" AND event_date <= {to:Date}");
        params.push(("to", to.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use auditry_core::TenantScope;
    use auditry_domain::{DateRange, EventFilter, GroupBy};
    use chrono::NaiveDate;

    use super::{select_aggregations, select_event_by_id, select_events, select_export};

    fn tenant(name: &str) -> TenantScope {
        TenantScope::Tenant(name.to_owned())
    }

    #[test]
    fn unscoped_unfiltered_list_has_no_predicates() {
        let query = select_events(&TenantScope::Unscoped, &EventFilter::default(), 51);

        assert!(query.sql.contains("WHERE 1 = 1 ORDER BY received_at DESC LIMIT 51"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn tenant_constraint_is_conjoined_before_user_predicates() {
        let filter = EventFilter {
            action: Some("user.created".to_owned()),
            ..EventFilter::default()
        };
        let query = select_events(&tenant("acme"), &filter, 51);

        let tenant_at = query.sql.find("tenant_id = {tenant:String}");
        let action_at = query.sql.find("action_name = {action:String}");
        assert!(tenant_at.is_some());
        assert!(action_at.is_some());
        assert!(tenant_at < action_at);
        assert_eq!(
            query.params,
            vec![
                ("tenant", "acme".to_owned()),
                ("action", "user.created".to_owned()),
            ]
        );
    }

    #[test]
    fn every_structured_predicate_binds_a_parameter() {
        let filter = EventFilter {
            action: Some("a".to_owned()),
            actor_id: Some("u".to_owned()),
            resource_type: Some("t".to_owned()),
            resource_id: Some("r".to_owned()),
            range: DateRange {
                from: NaiveDate::from_ymd_opt(2026, 1, 1),
                to: NaiveDate::from_ymd_opt(2026, 8, 27),
            },
            success: Some(false),
        };
        let query = select_events(&tenant("acme"), &filter, 101);

        assert_eq!(query.params.len(), 7);
        assert_eq!(query.sql.matches(" AND ").count(), 7);
        assert!(query.sql.contains("result_success = {success:UInt8}"));
        assert!(query.params.contains(&(("success"), "0".to_owned())));
        assert!(query.params.contains(&(("from"), "2026-01-01".to_owned())));
    }

    #[test]
    fn lookup_scopes_by_tenant_and_limits_to_one_row() {
        let query = select_event_by_id(&tenant("acme"), "evt-1");

        assert!(query.sql.contains("event_id = {event_id:String}"));
        assert!(query.sql.contains("tenant_id = {tenant:String}"));
        assert!(query.sql.contains("LIMIT 1"));
        assert_eq!(
            query.params,
            vec![
                ("event_id", "evt-1".to_owned()),
                ("tenant", "acme".to_owned()),
            ]
        );
    }

    #[test]
    fn aggregations_group_on_the_requested_column() {
        let query = select_aggregations(&tenant("acme"), GroupBy::Actor, DateRange::default());

        assert!(query.sql.contains("SELECT actor_id AS key"));
        assert!(query.sql.contains("GROUP BY key ORDER BY total DESC LIMIT 100"));
        assert_eq!(query.params, vec![("tenant", "acme".to_owned())]);
    }

    #[test]
    fn export_caps_rows_and_keeps_structured_predicates() {
        let filter = EventFilter {
            actor_id: Some("u".to_owned()),
            ..EventFilter::default()
        };
        let query = select_export(&TenantScope::Unscoped, &filter);

        assert!(query.sql.contains("LIMIT 100000"));
        assert!(query.sql.contains("actor_id = {actor_id:String}"));
        assert_eq!(query.params, vec![("actor_id", "u".to_owned())]);
    }
}
