use auditry_core::{AppError, AppResult, EventId};
use auditry_domain::{AuditEvent, BatchOutcome, EnrichedEvent, MAX_BATCH_SIZE, validate_event};
use chrono::{DateTime, Utc};

use crate::forwarder::EventForwarder;

/// Acknowledgement returned to the producer at acceptance time.
///
/// Acceptance means "queued for forwarding", not "durably delivered":
/// the response never waits for the downstream collector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestReceipt {
    /// Generated event identifier.
    pub event_id: EventId,
    /// Receipt timestamp.
    pub received_at: DateTime<Utc>,
}

/// Coordinates single and batch event intake.
#[derive(Clone)]
pub struct IngestService {
    forwarder: EventForwarder,
}

impl IngestService {
    /// Creates the coordinator over a forwarding handle.
    #[must_use]
    pub fn new(forwarder: EventForwarder) -> Self {
        Self { forwarder }
    }

    /// Validates, enriches, and dispatches one event.
    ///
    /// An invalid event fails the whole request naming the first missing
    /// requirement class; no partial state is created.
    pub fn ingest_one(&self, event: AuditEvent) -> AppResult<IngestReceipt> {
        validate_event(&event)
            .map_err(|reason| AppError::Validation(reason.message().to_owned()))?;

        let event_id = EventId::generate();
        let received_at = Utc::now();
        self.forwarder
            .dispatch(EnrichedEvent::new(event, event_id, received_at));

        Ok(IngestReceipt {
            event_id,
            received_at,
        })
    }

    /// Classifies every element of a batch independently.
    ///
    /// Size constraints fail the whole batch before any element is
    /// processed; afterwards, invalid elements are recorded as rejected
    /// without failing the batch. All accepted elements share one
    /// receipt timestamp and get distinct identifiers.
    pub fn ingest_batch(&self, events: Vec<AuditEvent>) -> AppResult<BatchOutcome> {
        if events.is_empty() {
            return Err(AppError::Validation("no events provided".to_owned()));
        }
        if events.len() > MAX_BATCH_SIZE {
            return Err(AppError::Validation(format!(
                "maximum {MAX_BATCH_SIZE} events per batch"
            )));
        }

        let received_at = Utc::now();
        let mut outcome = BatchOutcome::with_capacity(events.len());

        for event in events {
            if validate_event(&event).is_err() {
                outcome.record_rejected();
                continue;
            }

            let event_id = EventId::generate();
            self.forwarder
                .dispatch(EnrichedEvent::new(event, event_id, received_at));
            outcome.record_accepted(event_id);
        }

        Ok(outcome)
    }
}
