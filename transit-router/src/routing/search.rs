//! Query orchestration.
//!
//! [`Router::route`] answers a routing query: it computes lower bounds for
//! the query's goals, turns the start of the query into start labels, runs
//! the Pareto-Dijkstra search and widens the search interval until enough
//! journeys depart inside it. Results are turned into journeys in travel
//! order and ranked.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Direction, Journey, Minutes, SearchInterval, StationId, Time};
use crate::network::{ConnectionRef, Edge, EdgeKind, NodeId, Schedule, TripId};

use super::arena::ArenaPool;
use super::config::RouterConfig;
use super::error::RoutingError;
use super::label::{Label, LabelContext, LabelId};
use super::lower_bounds::{
    self, ConstGraphLowerBounds, CsaTimetables, LowerBounds, LowerBoundsQuery, elapsed_ms,
};
use super::output::reconstruct;
use super::pareto_dijkstra::{ParetoDijkstra, SearchLimits};
use super::profile::{Profile, SearchType};
use super::rank::{deduplicate, rank_journeys};
use super::statistics::SearchStatistics;

/// Where and when the search begins.
///
/// Stations are given in search direction: a backward search starts at the
/// destination of the journey, and its interval holds arrival times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Start {
    /// Any departure (arrival) at the station within the interval.
    Pretrip {
        station: StationId,
        interval: SearchInterval,
    },
    /// Standing at the station at a fixed time.
    OntripStation { station: StationId, time: Time },
    /// Seated on `trip`, which stops at `station` at `time`.
    OntripTrain {
        trip: TripId,
        station: StationId,
        time: Time,
    },
}

impl Start {
    pub fn station(&self) -> StationId {
        match *self {
            Start::Pretrip { station, .. }
            | Start::OntripStation { station, .. }
            | Start::OntripTrain { station, .. } => station,
        }
    }

    pub fn interval(&self) -> SearchInterval {
        match *self {
            Start::Pretrip { interval, .. } => interval,
            Start::OntripStation { time, .. } | Start::OntripTrain { time, .. } => {
                SearchInterval::ontrip(time)
            }
        }
    }
}

/// An edge the caller adds between two stations for one query, for instance
/// a taxi ride to the first station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalEdge {
    pub from: StationId,
    pub to: StationId,
    pub duration: Minutes,
    #[serde(default)]
    pub price: u16,
    /// Taking the edge counts as a transfer.
    #[serde(default)]
    pub transfer: bool,
}

/// A routing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingQuery {
    pub start: Start,
    /// The station the search runs towards: the journey's destination in a
    /// forward search, its origin in a backward search.
    pub destination: StationId,
    #[serde(default)]
    pub dir: Direction,
    #[serde(default)]
    pub search_type: SearchType,
    /// Keep widening a pretrip interval until this many journeys depart in
    /// it.
    #[serde(default)]
    pub min_journey_count: usize,
    #[serde(default)]
    pub extend_interval_earlier: bool,
    #[serde(default)]
    pub extend_interval_later: bool,
    /// Also start at the stations equivalent to the start station.
    #[serde(default)]
    pub use_start_metas: bool,
    /// Also accept the stations equivalent to the destination as goals.
    #[serde(default)]
    pub use_dest_metas: bool,
    /// Also start with departures reachable on foot from the start station.
    #[serde(default = "default_true")]
    pub use_start_footpaths: bool,
    #[serde(default)]
    pub additional_edges: Vec<AdditionalEdge>,
}

fn default_true() -> bool {
    true
}

impl RoutingQuery {
    /// A forward query with the default criteria and no interval extension.
    pub fn new(start: Start, destination: StationId) -> Self {
        Self {
            start,
            destination,
            dir: Direction::Forward,
            search_type: SearchType::Default,
            min_journey_count: 0,
            extend_interval_earlier: false,
            extend_interval_later: false,
            use_start_metas: false,
            use_dest_metas: false,
            use_start_footpaths: true,
            additional_edges: Vec::new(),
        }
    }

    /// Check the query against the schedule.
    ///
    /// # Errors
    ///
    /// Unknown stations or trips, an interval ending before it begins and
    /// backward searches seated on a train are rejected.
    pub fn validate(&self, schedule: &Schedule) -> Result<(), RoutingError> {
        for station in [self.start.station(), self.destination] {
            if station.index() >= schedule.station_count() {
                return Err(RoutingError::UnknownStation(station));
            }
        }
        match self.start {
            Start::Pretrip { interval, .. } if interval.begin > interval.end => Err(
                RoutingError::InvalidQuery("interval ends before it begins".to_string()),
            ),
            Start::OntripTrain { trip, .. } if trip.index() >= schedule.trips.len() => Err(
                RoutingError::InvalidQuery(format!("unknown trip {}", trip.0)),
            ),
            Start::OntripTrain { .. } if !self.dir.is_forward() => Err(RoutingError::InvalidQuery(
                "a search seated on a train must run forward".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Answer to a routing request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Journeys in travel order, ranked by departure.
    pub journeys: Vec<Journey>,
    pub statistics: SearchStatistics,
    /// The interval after all extensions.
    pub interval: SearchInterval,
    /// False if the lower bounds proved the destination unreachable.
    pub target_reachable: bool,
}

/// Constant graph bounds of one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StationLowerBound {
    pub station: StationId,
    /// Minutes, `None` if the goals cannot be reached.
    pub travel_time: Option<u32>,
    pub transfers: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowerBoundsResponse {
    pub target_reachable: bool,
    pub stations: Vec<StationLowerBound>,
}

/// Routes queries over one schedule.
///
/// The router is shared between threads; every query runs synchronously on
/// the calling thread with a label arena from the router's pool.
#[derive(Debug)]
pub struct Router {
    schedule: Arc<Schedule>,
    config: RouterConfig,
    arenas: ArenaPool,
    timetables: OnceLock<CsaTimetables>,
}

impl Router {
    pub fn new(schedule: Arc<Schedule>, config: RouterConfig) -> Self {
        let arenas = ArenaPool::new(config.arena_pool_size, config.arena_capacity);
        Self {
            schedule,
            config,
            arenas,
            timetables: OnceLock::new(),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Connection scan timetables, built on first use by strategies that
    /// need them.
    fn timetables(&self) -> Option<&CsaTimetables> {
        if !self.config.lower_bounds.needs_timetables() {
            return None;
        }
        Some(self.timetables.get_or_init(|| {
            let started = Instant::now();
            let timetables = CsaTimetables::build(&self.schedule);
            debug!(
                connections = timetables.restricted.connections.len(),
                ms = elapsed_ms(started),
                "built connection scan timetables"
            );
            timetables
        }))
    }

    /// Find the Pareto-optimal journeys for `query`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the query is invalid or its search type cannot run in
    /// the requested direction. An unreachable destination is not an error.
    pub fn route(&self, query: &RoutingQuery) -> Result<SearchResponse, RoutingError> {
        let started = Instant::now();
        let schedule = self.schedule.as_ref();
        query.validate(schedule)?;

        let dir = query.dir;
        let profile = Profile::new(&query.search_type, dir)?;
        let starts = start_stations(schedule, query);
        let goals = goal_stations(schedule, query);
        let query_edges = query_edges(schedule, &query.additional_edges);
        let mut interval = query.start.interval();

        debug!(
            start = %query.start.station(),
            destination = %query.destination,
            %dir,
            search_type = %query.search_type,
            %interval,
            goals = goals.len(),
            query_edges = query_edges.len(),
            "routing query"
        );

        let lb_query = LowerBoundsQuery {
            schedule,
            timetables: self.timetables(),
            dir,
            starts: starts.clone(),
            goals: goals.clone(),
            interval,
            extend_earlier: query.extend_interval_earlier,
            extend_later: query.extend_interval_later,
            use_start_footpaths: query.use_start_footpaths,
            query_edges: &query_edges,
        };
        let with_price = profile.kinds().iter().any(|k| k.is_price());
        let mut bounds = lower_bounds::build(self.config.lower_bounds, &lb_query, with_price);
        let lb_result = bounds.calculate();
        debug!(
            strategy = %self.config.lower_bounds,
            reachable = lb_result.target_reachable,
            travel_time_ms = lb_result.travel_time_ms,
            transfers_ms = lb_result.transfers_ms,
            price_ms = lb_result.price_ms,
            optimality_ms = lb_result.optimality_ms,
            total_ms = lb_result.total_ms,
            "lower bounds computed"
        );
        let extended_lower_bounds = self
            .config
            .extended_lb_stats
            .then(|| lower_bounds::extended_stats(bounds.as_ref(), schedule));

        if !lb_result.target_reachable {
            debug!(destination = %query.destination, "destination unreachable, skipping search");
            let statistics = SearchStatistics {
                lower_bounds: lb_result,
                extended_lower_bounds,
                total_ms: elapsed_ms(started),
                ..SearchStatistics::default()
            };
            return Ok(SearchResponse {
                journeys: Vec::new(),
                statistics,
                interval,
                target_reachable: false,
            });
        }

        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: bounds.as_ref(),
            dir,
        };
        let mut arena = self.arenas.checkout(schedule.graph.nodes.len());
        debug!(idle = self.arenas.idle_count(), "label arena checked out");

        let limits = SearchLimits {
            max_label_count: self.config.max_label_count,
            post_search_dominance: self.config.post_search_dominance,
        };
        let mut search = ParetoDijkstra::new(ctx, &profile, &mut *arena, &goals, &query_edges, limits);

        let mut events = StartEvents::default();
        let labels = start_labels(schedule, query, &starts, interval, &mut events, &profile, &ctx)?;
        search.add_start_labels(labels);

        let step = self.config.interval_extension().num_minutes() as Minutes;
        let mut iterations = 0usize;
        loop {
            iterations += 1;
            let max_interval_reached = interval.is_ontrip()
                || ((!query.extend_interval_earlier || interval.begin <= schedule.begin)
                    && (!query.extend_interval_later || interval.end >= schedule.end));

            search.search();

            let in_interval = search
                .results()
                .iter()
                .filter(|r| interval.contains(search.label(**r).start))
                .count();
            debug!(
                iteration = iterations,
                %interval,
                results = search.results().len(),
                in_interval,
                max_interval_reached,
                "search iteration finished"
            );

            if max_interval_reached
                || in_interval >= query.min_journey_count
                || search.statistics().max_label_quit
            {
                break;
            }

            interval = extend_interval(interval, query, schedule, step);
            let labels =
                start_labels(schedule, query, &starts, interval, &mut events, &profile, &ctx)?;
            debug!(%interval, new_start_labels = labels.len(), "interval extended");
            search.add_start_labels(labels);
        }

        let (results, mut statistics) = search.finish();
        let results: Vec<LabelId> = results
            .into_iter()
            .filter(|r| interval.contains(arena.get(*r).start))
            .collect();

        let mut journeys = Vec::with_capacity(results.len());
        for id in &results {
            match reconstruct(schedule, &profile, &arena, *id, &query_edges) {
                Ok(journey) => journeys.push(journey),
                Err(e) => warn!(error = %e, "dropping result that is not a valid journey"),
            }
        }
        let journeys = rank_journeys(deduplicate(journeys));

        statistics.lower_bounds = lb_result;
        statistics.optimal_journey_count = bounds.optimal_journey_count();
        statistics.interval_extensions = iterations - 1;
        statistics.extended_lower_bounds = extended_lower_bounds;
        if self.config.evaluate_lower_bounds {
            statistics.lower_bounds_evaluation =
                Some(lower_bounds::evaluate(bounds.as_ref(), arena.labels(), &results));
        }
        statistics.total_ms = elapsed_ms(started);

        debug!(
            journeys = journeys.len(),
            interval_extensions = statistics.interval_extensions,
            labels_created = statistics.labels_created,
            total_ms = statistics.total_ms,
            "routing query answered"
        );

        Ok(SearchResponse {
            journeys,
            statistics,
            interval,
            target_reachable: true,
        })
    }

    /// Constant graph bounds of every station towards the goals of `query`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the query names unknown stations.
    pub fn lower_bounds(&self, query: &RoutingQuery) -> Result<LowerBoundsResponse, RoutingError> {
        let schedule = self.schedule.as_ref();
        query.validate(schedule)?;

        let query_edges = query_edges(schedule, &query.additional_edges);
        let lb_query = LowerBoundsQuery {
            schedule,
            timetables: None,
            dir: query.dir,
            starts: start_stations(schedule, query),
            goals: goal_stations(schedule, query),
            interval: query.start.interval(),
            extend_earlier: query.extend_interval_earlier,
            extend_later: query.extend_interval_later,
            use_start_footpaths: query.use_start_footpaths,
            query_edges: &query_edges,
        };
        let mut bounds = ConstGraphLowerBounds::new(&lb_query);
        let result = bounds.calculate();

        let stations = schedule
            .graph
            .stations
            .iter()
            .map(|station| {
                let node = schedule.graph.station_node(station.id);
                let time = bounds.time_from_node(node);
                let transfers = bounds.transfers_from_node(node);
                StationLowerBound {
                    station: station.id,
                    travel_time: bounds.is_valid_time_diff(time).then_some(time),
                    transfers: bounds.is_valid_transfer_amount(transfers).then_some(transfers),
                }
            })
            .collect();

        Ok(LowerBoundsResponse {
            target_reachable: result.target_reachable,
            stations,
        })
    }
}

fn with_metas(schedule: &Schedule, station: StationId, metas: bool) -> Vec<StationId> {
    let mut stations = vec![station];
    if metas {
        for &meta in &schedule.graph.station(station).equivalent {
            if meta.index() < schedule.station_count() && !stations.contains(&meta) {
                stations.push(meta);
            }
        }
    }
    stations
}

fn start_stations(schedule: &Schedule, query: &RoutingQuery) -> Vec<StationId> {
    with_metas(schedule, query.start.station(), query.use_start_metas)
}

fn goal_stations(schedule: &Schedule, query: &RoutingQuery) -> Vec<StationId> {
    with_metas(schedule, query.destination, query.use_dest_metas)
}

/// Query edges between known stations. Others are dropped.
fn query_edges(schedule: &Schedule, additional: &[AdditionalEdge]) -> Vec<Edge> {
    let graph = &schedule.graph;
    additional
        .iter()
        .filter(|e| {
            let known = e.from.index() < schedule.station_count()
                && e.to.index() < schedule.station_count();
            if !known {
                debug!(from = %e.from, to = %e.to, "ignoring additional edge to unknown station");
            }
            known
        })
        .map(|e| {
            Edge::new(
                graph.station_node(e.from),
                graph.station_node(e.to),
                EdgeKind::Query {
                    duration: e.duration,
                    price: e.price,
                    transfer: e.transfer,
                },
            )
        })
        .collect()
}

fn extend_interval(
    interval: SearchInterval,
    query: &RoutingQuery,
    schedule: &Schedule,
    step: Minutes,
) -> SearchInterval {
    let begin = if query.extend_interval_earlier {
        (interval.begin - step).max(schedule.begin)
    } else {
        interval.begin
    };
    let end = if query.extend_interval_later {
        (interval.end + step).min(schedule.end)
    } else {
        interval.end
    };
    SearchInterval::new(begin, end)
}

/// Start events already turned into labels, so that widening the interval
/// only adds the new ones.
#[derive(Debug, Default)]
struct StartEvents {
    seen: BTreeSet<(StationId, Time)>,
}

fn start_labels(
    schedule: &Schedule,
    query: &RoutingQuery,
    starts: &[StationId],
    interval: SearchInterval,
    events: &mut StartEvents,
    profile: &Profile,
    ctx: &LabelContext<'_>,
) -> Result<Vec<Label>, RoutingError> {
    let graph = &schedule.graph;
    let labels: Vec<Label> = match query.start {
        Start::Pretrip { .. } => {
            let mut fresh = BTreeSet::new();
            for &station in starts {
                for time in pretrip_times(schedule, station, query.dir, query.use_start_footpaths) {
                    if interval.contains(time) && events.seen.insert((station, time)) {
                        fresh.insert((station, time));
                    }
                }
            }
            fresh
                .into_iter()
                .filter_map(|(station, time)| {
                    Label::start(graph.station_node(station), time, None, profile, ctx)
                })
                .collect()
        }
        Start::OntripStation { time, .. } => starts
            .iter()
            .filter(|s| events.seen.insert((**s, time)))
            .filter_map(|s| Label::start(graph.station_node(*s), time, None, profile, ctx))
            .collect(),
        Start::OntripTrain {
            trip,
            station,
            time,
        } => {
            if !events.seen.insert((station, time)) {
                return Ok(Vec::new());
            }
            let (node, connection) = boarded_trip(schedule, trip, station, time)?;
            Label::start(node, time, Some(connection), profile, ctx)
                .into_iter()
                .collect()
        }
    };
    debug!(count = labels.len(), "start labels created");
    Ok(labels)
}

/// Times a pretrip search can leave `station`: departures of a forward
/// search, arrivals of a backward search. With footpaths, events at
/// stations within walking distance count too, shifted by the walk.
fn pretrip_times(schedule: &Schedule, station: StationId, dir: Direction, footpaths: bool) -> Vec<Time> {
    let mut times = station_events(schedule, station, dir);
    if footpaths {
        let neighbours = match dir {
            Direction::Forward => schedule.footpaths.walkable_from(station),
            Direction::Backward => schedule.footpaths.walkable_to(station),
        };
        for (other, walk) in neighbours {
            if other == station {
                continue;
            }
            times.extend(
                station_events(schedule, other, dir)
                    .into_iter()
                    .map(|t| dir.reverse().advance(t, walk)),
            );
        }
    }
    times
}

fn station_events(schedule: &Schedule, station: StationId, dir: Direction) -> Vec<Time> {
    let graph = &schedule.graph;
    let mut times = Vec::new();
    for &edge_id in graph.edges_in(graph.station_node(station), dir) {
        let edge = graph.edge(edge_id);
        let boards = match dir {
            Direction::Forward => matches!(edge.kind, EdgeKind::Enter),
            Direction::Backward => matches!(edge.kind, EdgeKind::Exit),
        };
        if !boards {
            continue;
        }
        let Some(route_edge) = graph.route_edge(edge.destination(dir), dir) else {
            continue;
        };
        times.extend(graph.edge(route_edge).connections().iter().map(|c| match dir {
            Direction::Forward => c.departure,
            Direction::Backward => c.arrival,
        }));
    }
    times
}

/// The route node where `trip` leaves `station` at or after `time`, and the
/// connection it leaves with.
fn boarded_trip(
    schedule: &Schedule,
    trip: TripId,
    station: StationId,
    time: Time,
) -> Result<(NodeId, ConnectionRef), RoutingError> {
    let graph = &schedule.graph;
    for node in graph
        .nodes
        .iter()
        .filter(|n| n.station == station && n.is_route_node())
    {
        let Some(edge_id) = graph.route_edge(node.id, Direction::Forward) else {
            continue;
        };
        let connections = graph.edge(edge_id).connections();
        if let Some(index) = connections
            .iter()
            .position(|c| c.trip == trip && c.departure >= time)
        {
            return Ok((
                node.id,
                ConnectionRef {
                    edge: edge_id,
                    index: index as u32,
                },
            ));
        }
    }
    Err(RoutingError::InvalidQuery(format!(
        "trip {} does not leave station {station} after the given time",
        schedule.trip_name(trip)
    )))
}
