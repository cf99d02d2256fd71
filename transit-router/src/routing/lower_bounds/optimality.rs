//! Knowledge of the optimal journeys.
//!
//! A connection scan finds every optimal journey of the interval up front.
//! Each stop of such a journey becomes a time window in which a label at
//! that station may lie on the journey. The search uses the oracle to keep
//! optimal labels alive and to prune others against known optimal results.
//!
//! Windows remember their journey. A label only stays optimal while it
//! follows one journey: reaching a window of another journey that happens
//! to share a station and time with it does not count.

use std::collections::HashMap;
use std::time::Instant;

use crate::csa::{CsaConnection, CsaJourney, CsaLeg, CsaQuery, CsaTimetable, run_query};
use crate::domain::{Direction, SearchInterval, StationId, Time};
use crate::network::{Footpaths, Graph, NodeId, TripId};
use crate::routing::label::{Label, OptimalJourneys};

use super::{
    ConstGraphLowerBounds, CsaTimetables, LowerBounds, LowerBoundsQuery, LowerBoundsResult,
    elapsed_ms,
};

/// A window at one station in which labels may belong to an optimal
/// journey, and how they may be standing there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimalInterval {
    pub begin: Time,
    pub end: Time,
    /// A station node label belongs here: the journey stops or starts.
    pub station: bool,
    /// A route node label belongs here: the journey rides a trip.
    pub route: bool,
    /// A label that walked here belongs here.
    pub foot: bool,
    pub arrival_trip: Option<TripId>,
    pub departure_trip: Option<TripId>,
    /// Index of the optimal journey the window belongs to.
    pub journey: usize,
}

impl OptimalInterval {
    fn contains(&self, time: Time) -> bool {
        self.begin <= time && time <= self.end
    }
}

#[derive(Debug, Clone)]
struct Stop {
    station: StationId,
    arrival: Option<Time>,
    departure: Option<Time>,
    arrival_trip: Option<TripId>,
    departure_trip: Option<TripId>,
    through: bool,
    foot: bool,
}

impl Stop {
    fn at(station: StationId) -> Self {
        Self {
            station,
            arrival: None,
            departure: None,
            arrival_trip: None,
            departure_trip: None,
            through: false,
            foot: false,
        }
    }
}

fn push_stop(stops: &mut Vec<Stop>, stop: Stop) {
    match stops.last_mut() {
        Some(last) if last.station == stop.station => {
            last.arrival = last.arrival.or(stop.arrival);
            last.departure = stop.departure.or(last.departure);
            last.arrival_trip = last.arrival_trip.or(stop.arrival_trip);
            last.departure_trip = stop.departure_trip.or(last.departure_trip);
            last.through = false;
            last.foot |= stop.foot;
        }
        _ => stops.push(stop),
    }
}

/// Stops of a journey in travel order. Consecutive stops at one station
/// are merged.
fn journey_stops(tt: &CsaTimetable, journey: &CsaJourney) -> Vec<Stop> {
    let con = |i: u32| -> Option<&CsaConnection> { tt.connections.get(i as usize) };
    let mut stops: Vec<Stop> = Vec::new();

    for (i, leg) in journey.legs.iter().enumerate() {
        match leg {
            CsaLeg::Trip { connections } => {
                let cons: Vec<&CsaConnection> = connections.iter().filter_map(|c| con(*c)).collect();
                let (Some(first), Some(last)) = (cons.first(), cons.last()) else {
                    continue;
                };
                push_stop(
                    &mut stops,
                    Stop {
                        departure: Some(first.departure),
                        departure_trip: Some(first.trip),
                        ..Stop::at(first.from)
                    },
                );
                for pair in cons.windows(2) {
                    push_stop(
                        &mut stops,
                        Stop {
                            station: pair[1].from,
                            arrival: Some(pair[0].arrival),
                            departure: Some(pair[1].departure),
                            arrival_trip: Some(pair[0].trip),
                            departure_trip: Some(pair[1].trip),
                            through: true,
                            foot: false,
                        },
                    );
                }
                push_stop(
                    &mut stops,
                    Stop {
                        arrival: Some(last.arrival),
                        arrival_trip: Some(last.trip),
                        ..Stop::at(last.to)
                    },
                );
            }
            CsaLeg::Walk {
                from,
                to,
                departure,
                arrival,
            } => {
                let duration = arrival - departure;
                // the walk may start as late as the next trip allows and end
                // as early as the previous trip allows
                let latest_departure = match journey.legs.get(i + 1) {
                    Some(CsaLeg::Trip { connections }) => connections
                        .first()
                        .and_then(|c| con(*c))
                        .map_or(*departure, |c| c.departure - duration),
                    _ => *departure,
                };
                let earliest_arrival = match i.checked_sub(1).and_then(|p| journey.legs.get(p)) {
                    Some(CsaLeg::Trip { connections }) => connections
                        .last()
                        .and_then(|c| con(*c))
                        .map_or(*arrival, |c| c.arrival + duration),
                    _ => *arrival,
                };
                push_stop(
                    &mut stops,
                    Stop {
                        departure: Some(latest_departure.max(*departure)),
                        foot: true,
                        ..Stop::at(*from)
                    },
                );
                push_stop(
                    &mut stops,
                    Stop {
                        arrival: Some(earliest_arrival.min(*arrival)),
                        foot: true,
                        ..Stop::at(*to)
                    },
                );
            }
        }
    }
    stops
}

/// Optimal journeys, indexed by station.
#[derive(Debug, Clone, Default)]
pub struct OptimalityOracle {
    intervals: HashMap<StationId, Vec<OptimalInterval>>,
    journey_count: usize,
}

impl OptimalityOracle {
    pub fn build(
        tt: &CsaTimetable,
        footpaths: &Footpaths,
        graph: &Graph,
        journeys: &[CsaJourney],
        interval: SearchInterval,
        dir: Direction,
    ) -> Self {
        let mut oracle = Self {
            intervals: HashMap::new(),
            journey_count: journeys.len(),
        };
        let query_end = if interval.is_ontrip() {
            interval.begin
        } else {
            interval.end
        };

        for (index, journey) in journeys.iter().enumerate() {
            let stops = journey_stops(tt, journey);
            let last_index = stops.len().saturating_sub(1);
            for (k, stop) in stops.iter().enumerate() {
                let arrival = stop.arrival.or(stop.departure).unwrap_or(journey.departure);
                let departure = stop.departure.or(stop.arrival).unwrap_or(journey.arrival);
                let (begin, end) = if k == 0 {
                    match dir {
                        Direction::Forward => (interval.begin.min(departure), departure),
                        Direction::Backward => (departure, departure),
                    }
                } else if k == last_index {
                    let transfer_time = graph.station(stop.station).transfer_time;
                    match dir {
                        Direction::Forward => (arrival, arrival + transfer_time),
                        Direction::Backward => (arrival, (arrival + transfer_time).max(query_end)),
                    }
                } else {
                    (arrival, departure.max(arrival))
                };
                oracle.insert(
                    stop.station,
                    OptimalInterval {
                        begin,
                        end,
                        station: !stop.through,
                        route: stop.arrival_trip.is_some() || stop.departure_trip.is_some(),
                        foot: stop.foot,
                        arrival_trip: stop.arrival_trip,
                        departure_trip: stop.departure_trip,
                        journey: index,
                    },
                );
            }

            // a walk may pass stations that are themselves footpath hubs
            for window in stops.windows(2) {
                let (x, y) = (&window[0], &window[1]);
                if !(x.foot && y.foot) {
                    continue;
                }
                let (Some(departure), Some(arrival)) = (x.departure, y.arrival) else {
                    continue;
                };
                let Some(duration) = footpaths.get(x.station, y.station) else {
                    continue;
                };
                for (z, to_z) in footpaths.walkable_from(x.station) {
                    if z == x.station || z == y.station {
                        continue;
                    }
                    if footpaths.get(z, y.station).is_some_and(|rest| to_z + rest == duration) {
                        let latest = arrival.max(departure + duration) - duration;
                        oracle.insert(
                            z,
                            OptimalInterval {
                                begin: departure.min(latest) + to_z,
                                end: departure.max(latest) + to_z,
                                station: false,
                                route: false,
                                foot: true,
                                arrival_trip: None,
                                departure_trip: None,
                                journey: index,
                            },
                        );
                    }
                }
            }
        }
        oracle
    }

    fn insert(&mut self, station: StationId, interval: OptimalInterval) {
        let list = self.intervals.entry(station).or_default();
        if !list.contains(&interval) {
            list.push(interval);
        }
    }

    pub fn intervals(&self, station: StationId) -> &[OptimalInterval] {
        self.intervals.get(&station).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn journey_count(&self) -> usize {
        self.journey_count
    }

    /// Whether `label` and all its predecessors lie on an optimal journey.
    pub fn is_optimal(&self, graph: &Graph, dir: Direction, label: &Label) -> bool {
        !self.matching_journeys(graph, dir, label).is_empty()
    }

    /// The journeys `label` lies on, among those its predecessors followed.
    pub fn matching_journeys(&self, graph: &Graph, dir: Direction, label: &Label) -> OptimalJourneys {
        if !label.pred_optimal {
            return OptimalJourneys::NONE;
        }
        let on_route = graph.node(label.node).is_route_node();
        let walked = label.edge_type.is_some_and(|t| t.is_walk());
        self.intervals(graph.station_of(label.node))
            .iter()
            .filter(|iv| iv.contains(label.now) && label.optimal_journeys.contains(iv.journey))
            .filter(|iv| {
                if on_route {
                    iv.route && Self::rides_trip(graph, dir, label, iv)
                } else if walked {
                    iv.foot
                } else {
                    iv.station
                }
            })
            .fold(OptimalJourneys::NONE, |found, iv| {
                found.union(OptimalJourneys::single(iv.journey))
            })
    }

    fn rides_trip(graph: &Graph, dir: Direction, label: &Label, iv: &OptimalInterval) -> bool {
        let ridden = label.connection.and_then(|c| graph.connection(c));
        let (trip, expected) = match (dir, ridden) {
            (Direction::Forward, Some(c)) => (Some(c.trip), iv.arrival_trip),
            (Direction::Backward, Some(c)) => (Some(c.trip), iv.departure_trip),
            (Direction::Forward, None) => (
                graph.next_connection(label.node, dir, label.now).map(|c| c.trip),
                iv.departure_trip,
            ),
            (Direction::Backward, None) => (
                graph.next_connection(label.node, dir, label.now).map(|c| c.trip),
                iv.arrival_trip,
            ),
        };
        trip.is_some() && trip == expected
    }
}

/// Constant graph bounds plus the optimal journey oracle.
pub struct OptimalityLowerBounds<'a> {
    query: &'a LowerBoundsQuery<'a>,
    timetables: &'a CsaTimetables,
    cg: ConstGraphLowerBounds<'a>,
    oracle: OptimalityOracle,
}

impl<'a> OptimalityLowerBounds<'a> {
    pub fn new(query: &'a LowerBoundsQuery<'a>, timetables: &'a CsaTimetables) -> Self {
        Self {
            query,
            timetables,
            cg: ConstGraphLowerBounds::new(query),
            oracle: OptimalityOracle::default(),
        }
    }

    pub fn oracle(&self) -> &OptimalityOracle {
        &self.oracle
    }
}

impl LowerBounds for OptimalityLowerBounds<'_> {
    fn calculate(&mut self) -> LowerBoundsResult {
        let total = Instant::now();
        let mut result = self.cg.calculate();
        if !result.target_reachable {
            return result;
        }

        let started = Instant::now();
        let q = self.query;
        let csa_query = CsaQuery {
            starts: q.starts.clone(),
            targets: q.goals.clone(),
            interval: q.interval,
            dir: q.dir,
            use_start_footpaths: q.use_start_footpaths,
        };
        let tt = &self.timetables.restricted;
        let journeys = run_query(tt, &csa_query);
        self.oracle = OptimalityOracle::build(
            tt,
            &q.schedule.footpaths,
            &q.schedule.graph,
            &journeys,
            q.interval,
            q.dir,
        );
        result.optimality_ms = elapsed_ms(started);
        result.total_ms = elapsed_ms(total);

        tracing::debug!(
            optimal_journeys = self.oracle.journey_count(),
            stations = self.oracle.intervals.len(),
            ms = result.optimality_ms,
            "optimality oracle"
        );
        result
    }

    fn time_from_node(&self, node: NodeId) -> u32 {
        self.cg.time_from_node(node)
    }

    fn transfers_from_node(&self, node: NodeId) -> u32 {
        self.cg.transfers_from_node(node)
    }

    fn is_on_optimal_time_journey(&self, label: &Label) -> bool {
        self.oracle
            .is_optimal(&self.query.schedule.graph, self.query.dir, label)
    }

    fn is_on_optimal_transfers_journey(&self, label: &Label) -> bool {
        self.is_on_optimal_time_journey(label)
    }

    fn optimal_journeys(&self, label: &Label) -> OptimalJourneys {
        self.oracle
            .matching_journeys(&self.query.schedule.graph, self.query.dir, label)
    }

    fn optimal_journey_count(&self) -> usize {
        self.oracle.journey_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::lower_bounds::test_support;

    fn setup() -> (crate::network::Schedule, CsaTimetables) {
        let schedule = test_support::schedule();
        let timetables = CsaTimetables::build(&schedule);
        (schedule, timetables)
    }

    #[test]
    fn intervals_cover_each_stop() {
        let (schedule, timetables) = setup();
        let a = schedule.station_by_code("A").unwrap();
        let b = schedule.station_by_code("B").unwrap();
        let c = schedule.station_by_code("C").unwrap();
        let query = CsaQuery {
            starts: vec![a],
            targets: vec![c],
            interval: SearchInterval::new(480, 485),
            dir: Direction::Forward,
            use_start_footpaths: false,
        };
        let journeys = run_query(&timetables.restricted, &query);
        assert!(!journeys.is_empty());
        let oracle = OptimalityOracle::build(
            &timetables.restricted,
            &schedule.footpaths,
            &schedule.graph,
            &journeys,
            query.interval,
            Direction::Forward,
        );
        assert_eq!(oracle.journey_count(), journeys.len());

        // ICE 2 arrives at B 08:15, ICE 3 leaves 08:25
        let at_b = oracle.intervals(b);
        assert!(at_b.iter().any(|iv| iv.begin == 495 && iv.end == 505 && iv.station));
        let at_c = oracle.intervals(c);
        assert!(at_c.iter().any(|iv| iv.begin == 525 && iv.end == 527));
        assert!(oracle.intervals(schedule.station_by_code("E").unwrap()).is_empty());
    }

    #[test]
    fn labels_off_the_windows_are_not_optimal() {
        let (schedule, timetables) = setup();
        let a = schedule.station_by_code("A").unwrap();
        let c = schedule.station_by_code("C").unwrap();
        let query = LowerBoundsQuery {
            schedule: &schedule,
            timetables: Some(&timetables),
            dir: Direction::Forward,
            starts: vec![a],
            goals: vec![c],
            interval: SearchInterval::new(480, 485),
            extend_earlier: false,
            extend_later: false,
            use_start_footpaths: false,
            query_edges: &[],
        };
        let mut bounds = OptimalityLowerBounds::new(&query, &timetables);
        assert!(bounds.calculate().target_reachable);
        assert!(bounds.optimal_journey_count() > 0);

        let node = schedule.graph.station_node(a);
        let mut on = Label::bare(485, 485);
        on.node = node;
        on.pred_optimal = true;
        assert!(bounds.is_on_optimal_time_journey(&on));

        let mut late = on;
        late.now = 600;
        assert!(!bounds.is_on_optimal_time_journey(&late));

        let mut orphan = on;
        orphan.pred_optimal = false;
        assert!(!bounds.is_on_optimal_transfers_journey(&orphan));
    }

    fn stop_window(begin: Time, end: Time, journey: usize) -> OptimalInterval {
        OptimalInterval {
            begin,
            end,
            station: true,
            route: false,
            foot: false,
            arrival_trip: None,
            departure_trip: None,
            journey,
        }
    }

    #[test]
    fn labels_keep_to_the_journey_they_follow() {
        let (schedule, _) = setup();
        let graph = &schedule.graph;
        let b = schedule.station_by_code("B").unwrap();
        let c = schedule.station_by_code("C").unwrap();

        // both journeys change at B; they reach C at different times
        let mut oracle = OptimalityOracle::default();
        oracle.insert(b, stop_window(495, 505, 0));
        oracle.insert(b, stop_window(495, 505, 1));
        oracle.insert(c, stop_window(525, 527, 0));
        oracle.insert(c, stop_window(540, 542, 1));

        let mut at_b = Label::bare(480, 500);
        at_b.node = graph.station_node(b);
        let shared = oracle.matching_journeys(graph, Direction::Forward, &at_b);
        assert!(shared.contains(0) && shared.contains(1));

        let mut first = at_b;
        first.optimal_journeys = OptimalJourneys::single(0);
        first.node = graph.station_node(c);
        first.now = 526;
        assert!(oracle.is_optimal(graph, Direction::Forward, &first));

        // first half of journey 0, second half of journey 1
        let mut mixed = first;
        mixed.now = 541;
        assert!(!oracle.is_optimal(graph, Direction::Forward, &mixed));

        let mut second = mixed;
        second.optimal_journeys = OptimalJourneys::single(1);
        assert_eq!(
            oracle.matching_journeys(graph, Direction::Forward, &second),
            OptimalJourneys::single(1)
        );
    }

    #[test]
    fn windows_carry_their_journey() {
        let (schedule, timetables) = setup();
        let a = schedule.station_by_code("A").unwrap();
        let c = schedule.station_by_code("C").unwrap();
        let query = CsaQuery {
            starts: vec![a],
            targets: vec![c],
            interval: SearchInterval::new(470, 490),
            dir: Direction::Forward,
            use_start_footpaths: false,
        };
        let journeys = run_query(&timetables.restricted, &query);
        assert!(!journeys.is_empty());
        let oracle = OptimalityOracle::build(
            &timetables.restricted,
            &schedule.footpaths,
            &schedule.graph,
            &journeys,
            query.interval,
            Direction::Forward,
        );

        for index in 0..journeys.len() {
            assert!(oracle.intervals(c).iter().any(|iv| iv.journey == index));
        }
        assert!(oracle.intervals(c).iter().all(|iv| iv.journey < journeys.len()));
    }
}
