//! Multi-criteria journey planner for scheduled transit networks.
//!
//! Answers: "which journeys from A to B around this time are not beaten by
//! any other journey in travel time, transfers, price or comfort?" The core
//! is a Pareto-Dijkstra label-setting search guided by lower bounds from
//! constant graphs and the Connection Scan Algorithm.

pub mod csa;
pub mod domain;
pub mod network;
pub mod routing;
