//! Shared primitives for all Rust crates in Auditry.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across Auditry crates.
pub type AppResult<T> = Result<T, AppError>;

/// Globally unique, time-ordered audit event identifier.
///
/// Backed by UUID v7: the millisecond timestamp prefix keeps identifiers
/// close to insertion order without any cross-process coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a fresh event identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an event identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for EventId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identity value that marks a caller as a trusted cross-tenant producer.
pub const TRUSTED_PRODUCER_IDENTITY: &str = "audit-producer";

/// Effective tenant constraint for a read request.
///
/// Resolved from the caller identity before any backend query is
/// composed; scoped queries carry the constraint inside the query
/// itself, never as a post-filter over fetched rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// Trusted caller allowed to read across all tenants.
    Unscoped,
    /// Caller restricted to a single tenant partition.
    Tenant(String),
}

impl TenantScope {
    /// Resolves the scope from an opaque caller identity.
    ///
    /// A missing or empty identity is rejected rather than widened to
    /// cross-tenant access.
    pub fn resolve(identity: Option<&str>) -> AppResult<Self> {
        let identity = identity.map(str::trim).unwrap_or_default();
        if identity.is_empty() {
            return Err(AppError::Unauthorized(
                "caller identity is required".to_owned(),
            ));
        }

        if identity == TRUSTED_PRODUCER_IDENTITY {
            Ok(Self::Unscoped)
        } else {
            Ok(Self::Tenant(identity.to_owned()))
        }
    }

    /// Returns the tenant constraint, if the caller is tenant-bound.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        match self {
            Self::Unscoped => None,
            Self::Tenant(tenant) => Some(tenant.as_str()),
        }
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is missing or failed a required credential check.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Requested resource does not exist or is not visible to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal unexpected error, including backend query failures.
    #[error("internal error: {0}")]
    Internal(String),
}
