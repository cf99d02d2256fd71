//! Routing errors.

use crate::domain::{Direction, StationId};

/// Error from a routing request.
///
/// An unreachable target is not an error: it is reported through
/// [`SearchResponse::target_reachable`](super::SearchResponse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// The search type cannot run in the requested direction.
    #[error("search type {search_type} is not supported for {direction} search")]
    UnsupportedSearchType {
        search_type: String,
        direction: Direction,
    },

    /// A custom criteria list cannot be assembled.
    #[error("unsupported criteria: {0}")]
    UnsupportedCriteria(String),

    /// A station id outside the schedule.
    #[error("unknown station {0}")]
    UnknownStation(StationId),

    /// The query itself is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RoutingError::UnsupportedSearchType {
            search_type: "price".into(),
            direction: Direction::Backward,
        };
        assert_eq!(
            err.to_string(),
            "search type price is not supported for backward search"
        );

        let err = RoutingError::UnknownStation(StationId(42));
        assert_eq!(err.to_string(), "unknown station #42");

        let err = RoutingError::InvalidQuery("interval ends before it begins".into());
        assert_eq!(err.to_string(), "invalid query: interval ends before it begins");
    }
}
