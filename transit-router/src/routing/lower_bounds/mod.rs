//! Lower bounds on the remaining cost of a label.
//!
//! Bounds are computed once per query, before the label search runs, and
//! answer per node how much travel time, how many transfers and how much
//! money reaching a goal will cost at least. Some strategies also know which
//! labels lie on optimal journeys.

mod const_graph;
mod csa;
mod evaluate;
mod mixed;
mod optimality;
mod price;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::csa::CsaTimetable;
use crate::domain::{Direction, SearchInterval, StationId};
use crate::network::{Edge, NodeId, Schedule};

use super::criteria::INVALID_BOUND;
use super::label::{Label, OptimalJourneys};

pub use const_graph::ConstGraphLowerBounds;
pub use csa::CsaLowerBounds;
pub use evaluate::{LowerBoundsEvaluation, evaluate};
pub use mixed::MixedLowerBounds;
pub use optimality::{OptimalInterval, OptimalityLowerBounds, OptimalityOracle};
pub use price::PriceLowerBounds;

/// Per-node bounds for one query.
pub trait LowerBounds {
    /// Compute the bounds. Must run before any other method is used.
    fn calculate(&mut self) -> LowerBoundsResult;

    fn time_from_node(&self, node: NodeId) -> u32;

    fn is_valid_time_diff(&self, diff: u32) -> bool {
        diff != INVALID_BOUND
    }

    fn transfers_from_node(&self, node: NodeId) -> u32;

    fn is_valid_transfer_amount(&self, amount: u32) -> bool {
        amount != INVALID_BOUND
    }

    fn price_from_node(&self, node: NodeId) -> u32 {
        let _ = node;
        0
    }

    fn is_on_optimal_time_journey(&self, label: &Label) -> bool {
        let _ = label;
        false
    }

    fn is_on_optimal_transfers_journey(&self, label: &Label) -> bool {
        let _ = label;
        false
    }

    /// The optimal journeys `label` lies on, out of those its predecessor
    /// was following.
    fn optimal_journeys(&self, label: &Label) -> OptimalJourneys {
        label.optimal_journeys
    }

    /// Number of optimal journeys the bounds know of.
    fn optimal_journey_count(&self) -> usize {
        0
    }
}

/// Reachability and timings of a bound computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LowerBoundsResult {
    pub target_reachable: bool,
    pub travel_time_ms: u64,
    pub transfers_ms: u64,
    pub price_ms: u64,
    pub optimality_ms: u64,
    pub total_ms: u64,
}

impl LowerBoundsResult {
    pub fn unreachable() -> Self {
        Self::default()
    }
}

pub(crate) fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Which bounds a query uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowerBoundsStrategy {
    /// No bounds: every node is estimated at 0.
    None,
    /// Shortest paths over the constant graphs.
    #[default]
    #[serde(rename = "cg")]
    ConstantGraph,
    /// Backward connection scan from the optimal arrival times.
    Csa,
    /// Connection scan travel times, constant graph transfers.
    Mixed,
    /// Constant graph bounds plus the optimal journey oracle.
    Optimality,
}

impl LowerBoundsStrategy {
    pub fn needs_timetables(self) -> bool {
        matches!(
            self,
            LowerBoundsStrategy::Csa | LowerBoundsStrategy::Mixed | LowerBoundsStrategy::Optimality
        )
    }
}

impl fmt::Display for LowerBoundsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LowerBoundsStrategy::None => "none",
            LowerBoundsStrategy::ConstantGraph => "cg",
            LowerBoundsStrategy::Csa => "csa",
            LowerBoundsStrategy::Mixed => "mixed",
            LowerBoundsStrategy::Optimality => "optimality",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lower bounds strategy {0:?}")]
pub struct ParseStrategyError(pub String);

impl FromStr for LowerBoundsStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LowerBoundsStrategy::None),
            "cg" => Ok(LowerBoundsStrategy::ConstantGraph),
            "csa" => Ok(LowerBoundsStrategy::Csa),
            "mixed" => Ok(LowerBoundsStrategy::Mixed),
            "optimality" => Ok(LowerBoundsStrategy::Optimality),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// The two connection scan timetables of a schedule. The unrestricted one
/// ignores boarding and alighting restrictions.
#[derive(Debug, Clone)]
pub struct CsaTimetables {
    pub restricted: CsaTimetable,
    pub unrestricted: CsaTimetable,
}

impl CsaTimetables {
    pub fn build(schedule: &Schedule) -> Self {
        Self {
            restricted: CsaTimetable::build(schedule, false),
            unrestricted: CsaTimetable::build(schedule, true),
        }
    }
}

/// Everything bounds need to know about a query. Stations are given in
/// search direction: `starts` are the origins of a forward search and the
/// destinations of a backward search.
#[derive(Debug, Clone)]
pub struct LowerBoundsQuery<'a> {
    pub schedule: &'a Schedule,
    pub timetables: Option<&'a CsaTimetables>,
    pub dir: Direction,
    pub starts: Vec<StationId>,
    pub goals: Vec<StationId>,
    pub interval: SearchInterval,
    pub extend_earlier: bool,
    pub extend_later: bool,
    pub use_start_footpaths: bool,
    /// Edges added by the query, between station nodes.
    pub query_edges: &'a [Edge],
}

impl LowerBoundsQuery<'_> {
    pub fn start_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.starts.iter().map(|s| self.schedule.graph.station_node(*s))
    }
}

/// Create the bounds of `strategy` for `query`, wrapped with price bounds
/// when the search optimises price.
pub fn build<'a>(
    strategy: LowerBoundsStrategy,
    query: &'a LowerBoundsQuery<'a>,
    with_price: bool,
) -> Box<dyn LowerBounds + 'a> {
    let bounds: Box<dyn LowerBounds + 'a> = match (strategy, query.timetables) {
        (LowerBoundsStrategy::None, _) => Box::new(NoLowerBounds),
        (LowerBoundsStrategy::ConstantGraph, _) => Box::new(ConstGraphLowerBounds::new(query)),
        (LowerBoundsStrategy::Csa, Some(tt)) => Box::new(CsaLowerBounds::new(query, tt)),
        (LowerBoundsStrategy::Mixed, Some(tt)) => Box::new(MixedLowerBounds::new(query, tt)),
        (LowerBoundsStrategy::Optimality, Some(tt)) => {
            Box::new(OptimalityLowerBounds::new(query, tt))
        }
        (strategy, None) => {
            tracing::warn!(%strategy, "no connection scan timetables, using constant graph bounds");
            Box::new(ConstGraphLowerBounds::new(query))
        }
    };
    if with_price {
        Box::new(PriceLowerBounds::new(query, bounds))
    } else {
        bounds
    }
}

/// Bounds that know nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLowerBounds;

impl LowerBounds for NoLowerBounds {
    fn calculate(&mut self) -> LowerBoundsResult {
        LowerBoundsResult {
            target_reachable: true,
            ..LowerBoundsResult::default()
        }
    }

    fn time_from_node(&self, _node: NodeId) -> u32 {
        0
    }

    fn transfers_from_node(&self, _node: NodeId) -> u32 {
        0
    }
}

/// Averages and invalid counts of the bounds over all station nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExtendedLowerBoundStats {
    pub avg_travel_time: f64,
    pub avg_transfers: f64,
    pub invalid_travel_time: usize,
    pub invalid_transfers: usize,
}

pub fn extended_stats(bounds: &dyn LowerBounds, schedule: &Schedule) -> ExtendedLowerBoundStats {
    let mut stats = ExtendedLowerBoundStats::default();
    let (mut time_sum, mut time_count) = (0u64, 0u64);
    let (mut transfer_sum, mut transfer_count) = (0u64, 0u64);

    for station in &schedule.graph.stations {
        let node = schedule.graph.station_node(station.id);
        let time = bounds.time_from_node(node);
        if bounds.is_valid_time_diff(time) {
            time_sum += u64::from(time);
            time_count += 1;
        } else {
            stats.invalid_travel_time += 1;
        }
        let transfers = bounds.transfers_from_node(node);
        if bounds.is_valid_transfer_amount(transfers) {
            transfer_sum += u64::from(transfers);
            transfer_count += 1;
        } else {
            stats.invalid_transfers += 1;
        }
    }

    if time_count > 0 {
        stats.avg_travel_time = time_sum as f64 / time_count as f64;
    }
    if transfer_count > 0 {
        stats.avg_transfers = transfer_sum as f64 / transfer_count as f64;
    }
    stats
}



#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{ServiceClass, Time};
    use crate::network::{FootpathSpec, NetworkSpec, StationSpec, StopSpec, TripSpec};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Trips a brute-force journey may use.
    const MAX_TRIPS: usize = 7;

    /// Stops are (station, arrival, departure).
    #[derive(Debug, Clone)]
    struct RandomNetwork {
        transfer_times: Vec<Time>,
        footpaths: Vec<(usize, usize, Time)>,
        trips: Vec<Vec<(usize, Time, Time)>>,
    }

    fn hhmm(t: Time) -> String {
        format!("{:02}:{:02}", t / 60, t % 60)
    }

    impl RandomNetwork {
        fn spec(&self) -> NetworkSpec {
            NetworkSpec {
                schedule_begin: "2024-03-15T00:00".to_string(),
                cheapest_price_per_km: 10.0,
                stations: self
                    .transfer_times
                    .iter()
                    .enumerate()
                    .map(|(i, transfer_time)| StationSpec {
                        code: format!("S{i}"),
                        name: String::new(),
                        transfer_time: *transfer_time,
                        lat: 52.0 + i as f64 * 0.01,
                        lng: 13.0,
                        equivalent: Vec::new(),
                    })
                    .collect(),
                footpaths: self
                    .footpaths
                    .iter()
                    .map(|(from, to, duration)| FootpathSpec {
                        from: format!("S{from}"),
                        to: format!("S{to}"),
                        duration: *duration,
                        symmetric: true,
                    })
                    .collect(),
                trips: self
                    .trips
                    .iter()
                    .enumerate()
                    .map(|(k, stops)| TripSpec {
                        id: format!("T{k}"),
                        class: ServiceClass::Re,
                        stops: stops
                            .iter()
                            .enumerate()
                            .map(|(i, (station, arrival, departure))| StopSpec {
                                station: format!("S{station}"),
                                arrival: (i > 0).then(|| hhmm(*arrival)),
                                departure: (i + 1 < stops.len()).then(|| hhmm(*departure)),
                                price: 100,
                                occupancy: 0,
                                board: true,
                                alight: true,
                            })
                            .collect(),
                    })
                    .collect(),
            }
        }

        fn walks_from(&self, station: usize) -> impl Iterator<Item = (usize, Time)> + '_ {
            self.footpaths.iter().filter_map(move |&(a, b, w)| {
                if a == station {
                    Some((b, w))
                } else if b == station {
                    Some((a, w))
                } else {
                    None
                }
            })
        }

        /// Earliest arrival at `goal` per number of trips, boarding the
        /// first trip at `from` exactly at `departure`. Changes take the
        /// station's change time; a walk after a trip takes its duration.
        fn earliest_arrivals(&self, from: usize, departure: Time, goal: usize) -> Vec<Option<Time>> {
            let n = self.transfer_times.len();
            let mut arrivals: Vec<Option<Time>> = vec![None; MAX_TRIPS + 1];
            let mut ready: Vec<Option<Time>> = vec![None; n];
            let relax = |slot: &mut Option<Time>, t: Time| {
                if slot.is_none_or(|old| t < old) {
                    *slot = Some(t);
                }
            };

            for k in 0..MAX_TRIPS {
                let mut next: Vec<Option<Time>> = vec![None; n];
                for trip in &self.trips {
                    for (i, &(station, _, dep)) in trip.iter().enumerate() {
                        let boards = if k == 0 {
                            station == from && dep == departure
                        } else {
                            ready[station].is_some_and(|r| r <= dep)
                        };
                        if !boards {
                            continue;
                        }
                        for &(to, arr, _) in &trip[i + 1..] {
                            if to == goal {
                                relax(&mut arrivals[k + 1], arr);
                            }
                            relax(&mut next[to], arr + self.transfer_times[to]);
                            for (walk_to, w) in self.walks_from(to) {
                                if walk_to == goal {
                                    relax(&mut arrivals[k + 1], arr + w);
                                }
                                relax(&mut next[walk_to], arr + w);
                            }
                        }
                    }
                }
                ready = next;
            }
            arrivals
        }

        /// Departures at `station` within `[begin, end]`.
        fn departures(&self, station: usize, begin: Time, end: Time) -> BTreeSet<Time> {
            self.trips
                .iter()
                .flat_map(|trip| trip[..trip.len() - 1].iter())
                .filter(|(s, _, dep)| *s == station && begin <= *dep && *dep <= end)
                .map(|(_, _, dep)| *dep)
                .collect()
        }

        /// Least travel time and fewest transfers of the journeys from
        /// `from` to `goal` departing within `[begin, end]`.
        fn best(&self, from: usize, goal: usize, begin: Time, end: Time) -> Option<(u32, u32)> {
            let mut best: Option<(u32, u32)> = None;
            for departure in self.departures(from, begin, end) {
                for (trips, arrival) in self.earliest_arrivals(from, departure, goal).iter().enumerate() {
                    let Some(arrival) = arrival else {
                        continue;
                    };
                    let time = (arrival - departure) as u32;
                    let transfers = trips as u32 - 1;
                    best = Some(match best {
                        None => (time, transfers),
                        Some((t, x)) => (t.min(time), x.min(transfers)),
                    });
                }
            }
            best
        }
    }

    fn trip_strategy(n: usize) -> impl Strategy<Value = Vec<(usize, Time, Time)>> {
        (
            Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
            2..=n.min(4),
            360i32..480,
            prop::collection::vec((1i32..30, 0i32..3), 4),
        )
            .prop_map(|(order, len, start, hops)| {
                let mut stops = Vec::with_capacity(len);
                let mut t = start;
                for (i, station) in order.into_iter().take(len).enumerate() {
                    let arrival = t;
                    let departure = if i == 0 { t } else { t + hops[i - 1].1 };
                    stops.push((station, arrival, departure));
                    t = departure + hops[i].0;
                }
                stops
            })
    }

    fn network_strategy() -> impl Strategy<Value = RandomNetwork> {
        (3usize..6)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(0i32..5, n),
                    prop::collection::vec((0..n, 0..n, 1i32..15), 0..4),
                    prop::collection::vec(trip_strategy(n), 1..8),
                )
            })
            .prop_map(|(transfer_times, walks, trips)| {
                let mut footpaths: Vec<(usize, usize, Time)> = Vec::new();
                for (a, b, w) in walks {
                    let duplicate = footpaths
                        .iter()
                        .any(|&(x, y, _)| (x, y) == (a, b) || (x, y) == (b, a));
                    if a != b && !duplicate {
                        footpaths.push((a, b, w));
                    }
                }
                RandomNetwork {
                    transfer_times,
                    footpaths,
                    trips,
                }
            })
    }

    fn query<'a>(
        schedule: &'a Schedule,
        timetables: &'a CsaTimetables,
        from: usize,
        goal: usize,
        interval: SearchInterval,
    ) -> LowerBoundsQuery<'a> {
        LowerBoundsQuery {
            schedule,
            timetables: Some(timetables),
            dir: Direction::Forward,
            starts: vec![StationId(from as u32)],
            goals: vec![StationId(goal as u32)],
            interval,
            extend_earlier: false,
            extend_later: false,
            use_start_footpaths: false,
            query_edges: &[],
        }
    }

    const STRATEGIES: [LowerBoundsStrategy; 4] = [
        LowerBoundsStrategy::ConstantGraph,
        LowerBoundsStrategy::Csa,
        LowerBoundsStrategy::Mixed,
        LowerBoundsStrategy::Optimality,
    ];

    // ========== admissibility properties ==========

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn start_bounds_never_exceed_best_journey(
            net in network_strategy(),
            from_pick in 0usize..6,
            goal_pick in 0usize..6,
            begin in 360i32..480,
            width in 0i32..60,
        ) {
            let n = net.transfer_times.len();
            let (from, goal) = (from_pick % n, goal_pick % n);
            prop_assume!(from != goal);
            let schedule = Schedule::from_spec(&net.spec()).unwrap();
            let timetables = CsaTimetables::build(&schedule);
            let interval = SearchInterval::new(begin, begin + width);
            let Some((time, transfers)) = net.best(from, goal, interval.begin, interval.end) else {
                return Ok(());
            };

            let q = query(&schedule, &timetables, from, goal, interval);
            let start = schedule.graph.station_node(StationId(from as u32));
            for strategy in STRATEGIES {
                for with_price in [false, true] {
                    let mut bounds = build(strategy, &q, with_price);
                    let result = bounds.calculate();
                    prop_assert!(result.target_reachable, "{strategy} price={with_price}");
                    prop_assert!(
                        bounds.time_from_node(start) <= time,
                        "{strategy} price={with_price}: time bound {} above {time}",
                        bounds.time_from_node(start)
                    );
                    prop_assert!(
                        bounds.transfers_from_node(start) <= transfers,
                        "{strategy} price={with_price}: transfer bound {} above {transfers}",
                        bounds.transfers_from_node(start)
                    );
                }
            }
        }

        #[test]
        fn constant_graph_bounds_hold_at_every_station(
            net in network_strategy(),
            goal_pick in 0usize..6,
        ) {
            let n = net.transfer_times.len();
            let goal = goal_pick % n;
            let schedule = Schedule::from_spec(&net.spec()).unwrap();
            let timetables = CsaTimetables::build(&schedule);
            let from = (goal + 1) % n;
            let q = query(&schedule, &timetables, from, goal, SearchInterval::new(360, 480));
            let mut bounds = ConstGraphLowerBounds::new(&q);
            bounds.calculate();

            for station in (0..n).filter(|s| *s != goal) {
                let Some((time, transfers)) = net.best(station, goal, 0, Time::MAX) else {
                    continue;
                };
                let node = schedule.graph.station_node(StationId(station as u32));
                prop_assert!(bounds.time_from_node(node) <= time, "S{station}");
                prop_assert!(bounds.transfers_from_node(node) <= transfers, "S{station}");
            }
        }
    }
}
