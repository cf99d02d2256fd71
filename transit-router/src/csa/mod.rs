//! Connection Scan Algorithm.
//!
//! The scan works on a flat array of connections instead of the routing
//! graph. It is used for exact earliest-arrival queries, for the time lower
//! bounds and for the optimal-journey oracle of the Pareto-Dijkstra search.

mod query;
mod search;
mod timetable;

pub use query::{CsaQuery, pareto_filter, run_query};
pub use search::{
    ArrivalPointer, CsaJourney, CsaLeg, CsaSearch, MAX_TRANSFERS, MAX_TRAVEL_TIME, StartPoint,
    TransferArray,
};
pub use timetable::{CsaConnection, CsaFootpath, CsaStation, CsaTimetable};
