use chrono::NaiveDate;

/// Hard ceiling on the number of events accepted in one batch request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default page size when the caller requests none (or a bad one).
const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page size a caller may request.
const MAX_PAGE_LIMIT: usize = 1000;

/// Inclusive date window over the event receipt date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest event date to include.
    pub from: Option<NaiveDate>,
    /// Latest event date to include.
    pub to: Option<NaiveDate>,
}

/// Structured predicate set for list and export queries.
///
/// Every predicate is optional and independently combinable; all are
/// conjoined (AND) when composed into a backend query. The tenant
/// constraint is carried separately as a [`auditry_core::TenantScope`]
/// and is never part of caller-controlled input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Exact action name.
    pub action: Option<String>,
    /// Exact actor identifier.
    pub actor_id: Option<String>,
    /// Exact resource type.
    pub resource_type: Option<String>,
    /// Exact resource identifier.
    pub resource_id: Option<String>,
    /// Event date window.
    pub range: DateRange,
    /// Outcome flag.
    pub success: Option<bool>,
}

/// Grouping dimensions supported by the aggregation endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    /// Group by action name.
    #[default]
    Action,
    /// Group by actor identifier.
    Actor,
    /// Group by resource type.
    ResourceType,
}

impl GroupBy {
    /// Parses a caller-supplied grouping; anything unrecognized falls
    /// back to grouping by action.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("actor") => Self::Actor,
            Some("resource_type") => Self::ResourceType,
            _ => Self::Action,
        }
    }

    /// Returns the flat storage column backing this grouping.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::Action => "action_name",
            Self::Actor => "actor_id",
            Self::ResourceType => "resource_type",
        }
    }
}

/// Parses a caller-supplied page size.
///
/// Non-numeric and out-of-range values silently fall back to the
/// default; a bad `limit` is never a request error.
#[must_use]
pub fn page_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .filter(|parsed| (1..=MAX_PAGE_LIMIT).contains(parsed))
        .unwrap_or(DEFAULT_PAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{GroupBy, page_limit};

    #[test]
    fn page_limit_defaults_to_fifty() {
        assert_eq!(page_limit(None), 50);
        assert_eq!(page_limit(Some("")), 50);
        assert_eq!(page_limit(Some("abc")), 50);
        assert_eq!(page_limit(Some("0")), 50);
        assert_eq!(page_limit(Some("-3")), 50);
        assert_eq!(page_limit(Some("1001")), 50);
    }

    #[test]
    fn page_limit_accepts_in_range_values() {
        assert_eq!(page_limit(Some("1")), 1);
        assert_eq!(page_limit(Some("200")), 200);
        assert_eq!(page_limit(Some("1000")), 1000);
    }

    #[test]
    fn group_by_falls_back_to_action() {
        assert_eq!(GroupBy::parse(None), GroupBy::Action);
        assert_eq!(GroupBy::parse(Some("nonsense")), GroupBy::Action);
        assert_eq!(GroupBy::parse(Some("actor")), GroupBy::Actor);
        assert_eq!(GroupBy::parse(Some("resource_type")), GroupBy::ResourceType);
    }

    proptest! {
        #[test]
        fn page_limit_is_always_in_range(raw in ".{0,8}") {
            let limit = page_limit(Some(raw.as_str()));
            prop_assert!((1..=1000).contains(&limit));
        }

        #[test]
        fn page_limit_keeps_valid_numbers(value in 1usize..=1000) {
            prop_assert_eq!(page_limit(Some(value.to_string().as_str())), value);
        }
    }
}
