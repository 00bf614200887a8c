use std::collections::BTreeMap;

use auditry_core::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open mapping from field name to payload value.
///
/// Producers may attach fields the service does not recognize; they pass
/// through validation and forwarding untouched.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Closed set of value shapes accepted inside event payload mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit JSON null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value; integers and floats share one representation.
    Number(f64),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of nested values.
    List(Vec<FieldValue>),
    /// Nested mapping.
    Map(FieldMap),
}

impl FieldValue {
    /// Returns true for an explicit null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text content, if this value is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Producer-submitted audit event: who did what to what, with what result.
///
/// Only `actor`, `action`, and `resource` carry intake invariants; the
/// optional fields are never inspected by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Identity performing the action; requires a non-null `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<FieldMap>,

    /// Action taken; requires a non-null `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FieldMap>,

    /// Target of the action; requires non-null `type` and `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<FieldMap>,

    /// Producer-side occurrence timestamp, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Outcome of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<FieldMap>,

    /// Free-form request context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<FieldMap>,

    /// Tenant partition the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Why an event failed intake validation.
///
/// Ordered by requirement class: the first violated class wins when an
/// event is missing several required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// `actor` absent or `actor.id` absent/null.
    MissingActorId,
    /// `action` absent or `action.name` absent/null.
    MissingActionName,
    /// `resource` absent or `resource.type`/`resource.id` absent/null.
    MissingResourceFields,
}

impl RejectionReason {
    /// Returns the constraint description for client error payloads.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingActorId => "actor.id is required",
            Self::MissingActionName => "action.name is required",
            Self::MissingResourceFields => "resource.type and resource.id are required",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.message())
    }
}

/// Checks the intake invariants for one event.
///
/// Total and deterministic: the same input always yields the same
/// verdict, and optional fields are never inspected.
pub fn validate_event(event: &AuditEvent) -> Result<(), RejectionReason> {
    if !has_non_null(event.actor.as_ref(), "id") {
        return Err(RejectionReason::MissingActorId);
    }
    if !has_non_null(event.action.as_ref(), "name") {
        return Err(RejectionReason::MissingActionName);
    }
    if !has_non_null(event.resource.as_ref(), "type")
        || !has_non_null(event.resource.as_ref(), "id")
    {
        return Err(RejectionReason::MissingResourceFields);
    }

    Ok(())
}

fn has_non_null(map: Option<&FieldMap>, key: &str) -> bool {
    map.and_then(|fields| fields.get(key))
        .is_some_and(|value| !value.is_null())
}

/// Accepted event carrying its generated identifier and receipt time.
///
/// Constructed exactly once at acceptance and never mutated; serializes
/// flat so the collector sees the producer fields alongside `event_id`
/// and `received_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    event: AuditEvent,
    event_id: EventId,
    received_at: DateTime<Utc>,
}

impl EnrichedEvent {
    /// Enriches a validated event with identity and receipt metadata.
    #[must_use]
    pub fn new(event: AuditEvent, event_id: EventId, received_at: DateTime<Utc>) -> Self {
        Self {
            event,
            event_id,
            received_at,
        }
    }

    /// Returns the generated event identifier.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the receipt timestamp.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns the producer-submitted payload.
    #[must_use]
    pub fn event(&self) -> &AuditEvent {
        &self.event
    }
}
