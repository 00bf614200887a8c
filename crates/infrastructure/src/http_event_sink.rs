use async_trait::async_trait;
use auditry_application::EventSink;
use auditry_core::{AppError, AppResult};
use auditry_domain::EnrichedEvent;

/// Collector sink that POSTs one JSON-encoded enriched event per call.
///
/// Delivery is single-shot: the forwarder logs and discards whatever
/// error comes back. The shared client's request timeout is the only
/// backstop against a hung collector.
#[derive(Clone)]
pub struct HttpEventSink {
    http_client: reqwest::Client,
    collector_url: String,
}

impl HttpEventSink {
    /// Creates the sink over a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, collector_url: String) -> Self {
        Self {
            http_client,
            collector_url,
        }
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn deliver(&self, event: &EnrichedEvent) -> AppResult<()> {
        let response = self
            .http_client
            .post(&self.collector_url)
            .json(event)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("collector request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "collector returned status {status}"
            )));
        }

        Ok(())
    }
}
