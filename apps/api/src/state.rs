use auditry_application::{IngestService, QueryService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ingest_service: IngestService,
    pub query_service: QueryService,
    pub ingest_api_key: String,
}
