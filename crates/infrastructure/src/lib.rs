//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod clickhouse_event_store;
mod http_event_sink;
mod in_memory_event_store;
mod opensearch_event_index;

pub use clickhouse_event_store::{ClickHouseConfig, ClickHouseEventStore};
pub use http_event_sink::HttpEventSink;
pub use in_memory_event_store::InMemoryEventStore;
pub use opensearch_event_index::OpenSearchEventIndex;
