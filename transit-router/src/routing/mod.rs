//! Multi-criteria journey search.
//!
//! This module answers: "which journeys between two stations around this
//! time are not beaten by any other on every criterion?"
//!
//! The search is a Pareto version of Dijkstra's algorithm over the
//! time-dependent routing graph. Each node keeps a set of mutually
//! non-dominated labels; which criteria are compared is decided by a
//! [`Profile`]. Lower bounds computed before the search prune labels that
//! cannot reach the destination in time or beat a known result.

mod arena;
mod bucket_queue;
mod config;
pub mod criteria;
mod error;
mod label;
pub mod lower_bounds;
mod output;
mod pareto_dijkstra;
mod profile;
mod rank;
mod search;
mod statistics;


pub use arena::{ArenaGuard, ArenaPool, LabelArena};
pub use config::{DEFAULT_MAX_LABEL_COUNT, RouterConfig};
pub use criteria::{CriterionKind, INVALID_BOUND};
pub use error::RoutingError;
pub use label::{CriteriaValues, EdgeRef, Label, LabelContext, LabelId, OptimalJourneys};
pub use lower_bounds::{LowerBounds, LowerBoundsResult, LowerBoundsStrategy};
pub use output::reconstruct;
pub use pareto_dijkstra::{ParetoDijkstra, SearchLimits};
pub use profile::{Profile, SearchType};
pub use rank::{deduplicate, rank_journeys};
pub use search::{
    AdditionalEdge, LowerBoundsResponse, Router, RoutingQuery, SearchResponse, Start,
    StationLowerBound,
};
pub use statistics::SearchStatistics;
