use async_trait::async_trait;
use auditry_application::SearchIndex;
use auditry_core::{AppError, AppResult, TenantScope};
use auditry_domain::{FieldMap, FieldValue, StoredEvent};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

/// Index pattern covering the rotating time-partitioned event indices.
const INDEX_PATTERN: &str = "audit-events-*";

/// Fixed page size for free-text results.
const SEARCH_PAGE_SIZE: usize = 50;

/// Full-text search adapter over the OpenSearch REST API.
#[derive(Clone)]
pub struct OpenSearchEventIndex {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenSearchEventIndex {
    /// Creates the adapter over a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
        }
    }
}

/// Builds the search request body.
///
/// Tenant-bound callers get the fuzzy match wrapped in a `bool` query
/// with a `term` filter on `tenant_id`; full-text search is
/// tenant-scoped by default, exactly like the structured path.
fn search_body(scope: &TenantScope, query: &str) -> Value {
    let fuzzy_match = json!({
        "multi_match": {
            "query": query,
            "fields": ["actor.email", "actor.id", "action.name", "resource.id"],
            "fuzziness": "AUTO",
        }
    });

    let query_clause = match scope.tenant() {
        None => fuzzy_match,
        Some(tenant) => json!({
            "bool": {
                "must": [fuzzy_match],
                "filter": [{"term": {"tenant_id": tenant}}],
            }
        }),
    };

    json!({
        "query": query_clause,
        "size": SEARCH_PAGE_SIZE,
        "sort": [{"received_at": {"order": "desc"}}],
    })
}

#[async_trait]
impl SearchIndex for OpenSearchEventIndex {
    async fn search_events(
        &self,
        scope: &TenantScope,
        query: &str,
    ) -> AppResult<Vec<StoredEvent>> {
        let url = format!("{}/{INDEX_PATTERN}/_search", self.base_url);
        let response = self
            .http_client
            .post(url)
            .json(&search_body(scope, query))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("search index request failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "search index returned status {status}: {detail}"
            )));
        }

        let result: SearchResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("search index response unreadable: {error}"))
        })?;

        Ok(result
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.into_stored())
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: IndexedDocument,
}

/// Event document as indexed by the downstream pipeline.
///
/// The index may lag or diverge from the analytical store; absent
/// fields project as empty rather than failing the whole page.
#[derive(Debug, Default, Deserialize)]
struct IndexedDocument {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    tenant_id: String,
    #[serde(default)]
    event_date: String,
    #[serde(default)]
    received_at: String,
    #[serde(default)]
    actor: FieldMap,
    #[serde(default)]
    action: FieldMap,
    #[serde(default)]
    resource: FieldMap,
    #[serde(default)]
    result: FieldMap,
}

impl IndexedDocument {
    fn into_stored(self) -> StoredEvent {
        let received_at = DateTime::parse_from_rfc3339(&self.received_at)
            .map(|parsed| parsed.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        StoredEvent {
            event_id: self.event_id,
            tenant_id: self.tenant_id,
            event_date: self.event_date,
            received_at,
            actor_id: text_field(&self.actor, "id"),
            action_name: text_field(&self.action, "name"),
            resource_type: text_field(&self.resource, "type"),
            resource_id: text_field(&self.resource, "id"),
            result_success: matches!(self.result.get("success"), Some(FieldValue::Bool(true))),
        }
    }
}

fn text_field(map: &FieldMap, key: &str) -> String {
    map.get(key)
        .and_then(FieldValue::as_text)
        .unwrap_or_default()
        .to_owned()
}
