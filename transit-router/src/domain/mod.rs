//! Domain types for the transit router.
//!
//! This module contains the core types shared by the network model and the
//! search: schedule times, stations, service classes and the journeys
//! returned to callers. Types enforce their invariants at construction time.

mod error;
mod journey;
mod service_class;
mod station;
mod time;

pub use error::DomainError;
pub use journey::{Journey, JourneyCriteria, Leg, LegStop, Segment, Walk};
pub use service_class::{FareBracket, ServiceClass};
pub use station::{InvalidStationCode, Station, StationCode, StationId};
pub use time::{
    Direction, INVALID_TIME, MINUTES_PER_DAY, Minutes, ScheduleClock, SearchInterval, Time,
    TimeError, format_hhmm, parse_hhmm,
};
