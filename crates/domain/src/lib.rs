//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod event;
mod query;
mod read_model;

pub use event::{
    AuditEvent, EnrichedEvent, FieldMap, FieldValue, RejectionReason, validate_event,
};
pub use query::{DateRange, EventFilter, GroupBy, MAX_BATCH_SIZE, page_limit};
pub use read_model::{
    AggregationBucket, AggregationReport, BatchEntry, BatchOutcome, BatchStatus, EventPage,
    StoredEvent, csv_header,
};
