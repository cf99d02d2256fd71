//! Domain error types.
//!
//! These errors represent inconsistent journey data. They are distinct from
//! loading and routing errors.

use super::StationId;

/// Validation failures while assembling journeys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Invalid leg construction (e.g., alight before board)
    #[error("invalid leg: {0}")]
    InvalidLeg(&'static str),

    /// Consecutive segments don't meet at the same station
    #[error("segments do not connect: {0} is followed by {1}")]
    StationsNotConnected(StationId, StationId),

    /// A segment departs before the previous one arrives
    #[error("segment departs at minute {departure} before arrival at minute {arrival}")]
    TimeTravel { arrival: i32, departure: i32 },

    /// Journey has no segments
    #[error("journey must have at least one segment")]
    EmptyJourney,
}
