//! Timetable loading and the routing graph.
//!
//! A network is described by a JSON document ([`NetworkSpec`]) listing
//! stations, footpaths and trips. [`Schedule::from_spec`] turns it into the
//! time-dependent routing graph together with the constant graphs used for
//! lower bounds. The schedule is immutable once built and shared between
//! queries.

mod builder;
mod constant_graph;
mod graph;
mod walkable;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{InvalidStationCode, Minutes, ScheduleClock, ServiceClass, StationId, Time, TimeError};

pub use constant_graph::{ConstantGraph, ConstantGraphs, SimpleEdge};
pub use graph::{
    Connection, ConnectionRef, Edge, EdgeCost, EdgeId, EdgeKind, EdgeType, Graph, Node, NodeId,
    NodeKind, RouteId, TripId,
};
pub use walkable::{Footpaths, FootpathsBuilder};

/// Errors raised while loading a network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("invalid schedule begin: {0}")]
    ScheduleBegin(#[from] TimeError),

    #[error("invalid station code {code:?}: {source}")]
    InvalidStationCode {
        code: String,
        #[source]
        source: InvalidStationCode,
    },

    #[error("duplicate station code {0}")]
    DuplicateStation(String),

    #[error("unknown station code {0}")]
    UnknownStation(String),

    #[error("invalid footpath {from} -> {to}: {reason}")]
    InvalidFootpath {
        from: String,
        to: String,
        reason: &'static str,
    },

    #[error("invalid trip {trip}: {reason}")]
    InvalidTrip { trip: String, reason: String },

    #[error("failed to read network file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse network file: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON description of a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// First instant of the schedule, "YYYY-MM-DDTHH:MM".
    pub schedule_begin: String,
    /// Cheapest fare per kilometre, used for price lower bounds.
    #[serde(default)]
    pub cheapest_price_per_km: f64,
    pub stations: Vec<StationSpec>,
    #[serde(default)]
    pub footpaths: Vec<FootpathSpec>,
    #[serde(default)]
    pub trips: Vec<TripSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpec {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub transfer_time: Minutes,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    /// Codes of stations that count as the same place for meta searches.
    #[serde(default)]
    pub equivalent: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootpathSpec {
    pub from: String,
    pub to: String,
    pub duration: Minutes,
    #[serde(default = "default_true")]
    pub symmetric: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSpec {
    pub id: String,
    pub class: ServiceClass,
    pub stops: Vec<StopSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSpec {
    pub station: String,
    /// "HH:MM", absent at the first stop.
    #[serde(default)]
    pub arrival: Option<String>,
    /// "HH:MM", absent at the last stop.
    #[serde(default)]
    pub departure: Option<String>,
    /// Fare of the segment departing here.
    #[serde(default)]
    pub price: u16,
    /// Occupancy of the segment departing here.
    #[serde(default)]
    pub occupancy: u8,
    /// Passengers may board here.
    #[serde(default = "default_true")]
    pub board: bool,
    /// Passengers may alight here.
    #[serde(default = "default_true")]
    pub alight: bool,
}

fn default_true() -> bool {
    true
}

/// Name and class of a trip, indexed by [`TripId`].
#[derive(Debug, Clone)]
pub struct TripInfo {
    pub name: String,
    pub class: ServiceClass,
}

/// A loaded, immutable schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub clock: ScheduleClock,
    pub graph: Graph,
    pub lower_bound_graphs: ConstantGraphs,
    pub footpaths: Footpaths,
    pub trips: Vec<TripInfo>,
    /// First and last schedule minute usable by queries.
    pub begin: Time,
    pub end: Time,
    pub cheapest_price_per_km: f64,
    codes: HashMap<String, StationId>,
}

impl Schedule {
    /// Build a schedule from its JSON description.
    ///
    /// # Errors
    ///
    /// Returns `Err` for unknown or duplicate stations, malformed times and
    /// trips whose times run backwards.
    pub fn from_spec(spec: &NetworkSpec) -> Result<Self, NetworkError> {
        builder::build(spec)
    }

    /// Parse and build a schedule from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, NetworkError> {
        let spec: NetworkSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }

    /// Load a schedule from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let schedule = Self::from_json_str(&contents)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            stations = schedule.graph.stations.len(),
            nodes = schedule.graph.nodes.len(),
            edges = schedule.graph.edges.len(),
            "loaded schedule"
        );
        Ok(schedule)
    }

    /// Look up a station by its code.
    pub fn station_by_code(&self, code: &str) -> Option<StationId> {
        self.codes.get(code).copied()
    }

    pub fn station_count(&self) -> usize {
        self.graph.stations.len()
    }

    /// Name of a trip, or an empty string for unknown ids.
    pub fn trip_name(&self, trip: TripId) -> &str {
        self.trips
            .get(trip.index())
            .map(|t| t.name.as_str())
            .unwrap_or("")
    }
}
