//! Application services and ports.

#![forbid(unsafe_code)]

mod forwarder;
mod ingest_service;
mod ports;
mod query_service;

pub use forwarder::EventForwarder;
pub use ingest_service::{IngestReceipt, IngestService};
pub use ports::{EventSink, EventStore, ExportStream, SearchIndex};
pub use query_service::QueryService;
