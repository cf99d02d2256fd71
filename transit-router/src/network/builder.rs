//! Graph construction from a [`NetworkSpec`].

use std::collections::HashMap;

use crate::domain::{
    MINUTES_PER_DAY, ScheduleClock, Station, StationCode, StationId, Time, parse_hhmm,
};

use super::constant_graph::ConstantGraphs;
use super::graph::{Connection, Edge, EdgeId, EdgeKind, Graph, Node, NodeId, NodeKind, RouteId, TripId};
use super::walkable::Footpaths;
use super::{NetworkError, NetworkSpec, Schedule, TripInfo, TripSpec};

/// A stop with parsed times.
#[derive(Debug, Clone)]
struct ParsedStop {
    station: StationId,
    arrival: Time,
    departure: Time,
    price: u16,
    occupancy: u8,
    board: bool,
    alight: bool,
}

/// Trips sharing a stop sequence that never overtake each other.
#[derive(Debug)]
struct RouteBuild {
    key: Vec<(StationId, bool, bool)>,
    trips: Vec<usize>,
}

pub(super) fn build(spec: &NetworkSpec) -> Result<Schedule, NetworkError> {
    let clock = ScheduleClock::parse(&spec.schedule_begin)?;

    let (stations, codes) = build_stations(spec)?;
    let footpaths = build_footpaths(spec, &codes)?;

    let mut parsed = Vec::with_capacity(spec.trips.len());
    for trip in &spec.trips {
        parsed.push(parse_trip(trip, &codes)?);
    }
    let routes = group_routes(&parsed);

    let last_event = parsed
        .iter()
        .flat_map(|stops| stops.iter().map(|s| s.arrival.max(s.departure)))
        .max()
        .unwrap_or(0);
    let end = ((last_event / MINUTES_PER_DAY) + 1) * MINUTES_PER_DAY;

    let mut graph = Graph {
        nodes: stations
            .iter()
            .map(|s| Node {
                id: NodeId(s.id.0),
                kind: NodeKind::Station,
                station: s.id,
                edges: Vec::new(),
                incoming: Vec::new(),
            })
            .collect(),
        stations,
        edges: Vec::new(),
        route_count: routes.len() as u32,
        trip_count: spec.trips.len() as u32,
    };

    for (route_idx, route) in routes.iter().enumerate() {
        add_route(&mut graph, RouteId(route_idx as u32), route, &parsed, spec, &footpaths);
    }

    for (from, to, duration) in footpaths.iter() {
        let from = graph.station_node(from);
        let to = graph.station_node(to);
        push_edge(&mut graph, Edge::new(from, to, EdgeKind::Foot { duration }));
    }

    let lower_bound_graphs = ConstantGraphs::build(&graph);
    let trips = spec
        .trips
        .iter()
        .map(|t| TripInfo {
            name: t.id.clone(),
            class: t.class,
        })
        .collect();

    tracing::debug!(
        stations = graph.stations.len(),
        routes = graph.route_count,
        trips = graph.trip_count,
        edges = graph.edges.len(),
        "built routing graph"
    );

    Ok(Schedule {
        clock,
        graph,
        lower_bound_graphs,
        footpaths,
        trips,
        begin: 0,
        end,
        cheapest_price_per_km: spec.cheapest_price_per_km,
        codes,
    })
}

fn build_stations(
    spec: &NetworkSpec,
) -> Result<(Vec<Station>, HashMap<String, StationId>), NetworkError> {
    let mut codes = HashMap::new();
    let mut stations = Vec::with_capacity(spec.stations.len());

    for (idx, s) in spec.stations.iter().enumerate() {
        let code = StationCode::parse(&s.code).map_err(|source| {
            NetworkError::InvalidStationCode {
                code: s.code.clone(),
                source,
            }
        })?;
        let id = StationId(idx as u32);
        if codes.insert(code.as_str().to_string(), id).is_some() {
            return Err(NetworkError::DuplicateStation(s.code.clone()));
        }
        stations.push(Station {
            id,
            name: if s.name.is_empty() {
                s.code.clone()
            } else {
                s.name.clone()
            },
            code,
            transfer_time: s.transfer_time.max(0),
            lat: s.lat,
            lng: s.lng,
            equivalent: Vec::new(),
        });
    }

    for (idx, s) in spec.stations.iter().enumerate() {
        for other in &s.equivalent {
            let other = lookup(&codes, other)?;
            if other != stations[idx].id && !stations[idx].equivalent.contains(&other) {
                stations[idx].equivalent.push(other);
            }
        }
    }

    Ok((stations, codes))
}

fn build_footpaths(
    spec: &NetworkSpec,
    codes: &HashMap<String, StationId>,
) -> Result<Footpaths, NetworkError> {
    let mut footpaths = Footpaths::new();
    for fp in &spec.footpaths {
        let from = lookup(codes, &fp.from)?;
        let to = lookup(codes, &fp.to)?;
        if fp.duration < 0 {
            return Err(NetworkError::InvalidFootpath {
                from: fp.from.clone(),
                to: fp.to.clone(),
                reason: "duration must not be negative",
            });
        }
        if fp.symmetric {
            footpaths.add(from, to, fp.duration);
        } else {
            footpaths.add_directed(from, to, fp.duration);
        }
    }
    Ok(footpaths)
}

fn lookup(codes: &HashMap<String, StationId>, code: &str) -> Result<StationId, NetworkError> {
    codes
        .get(code)
        .copied()
        .ok_or_else(|| NetworkError::UnknownStation(code.to_string()))
}

fn parse_trip(
    trip: &TripSpec,
    codes: &HashMap<String, StationId>,
) -> Result<Vec<ParsedStop>, NetworkError> {
    let invalid = |reason: String| NetworkError::InvalidTrip {
        trip: trip.id.clone(),
        reason,
    };
    if trip.stops.len() < 2 {
        return Err(invalid("needs at least two stops".into()));
    }

    let parse = |s: &Option<String>| -> Result<Option<Time>, NetworkError> {
        s.as_deref()
            .map(parse_hhmm)
            .transpose()
            .map_err(|e| invalid(e.to_string()))
    };

    let last = trip.stops.len() - 1;
    let mut stops = Vec::with_capacity(trip.stops.len());
    for (idx, stop) in trip.stops.iter().enumerate() {
        let station = lookup(codes, &stop.station)?;
        let arrival = parse(&stop.arrival)?;
        let departure = parse(&stop.departure)?;
        let (arrival, departure) = match (arrival, departure) {
            (Some(a), Some(d)) => (a, d),
            (Some(a), None) if idx == last => (a, a),
            (None, Some(d)) if idx == 0 => (d, d),
            (Some(t), None) | (None, Some(t)) if idx != 0 && idx != last => (t, t),
            _ => return Err(invalid(format!("stop {idx} is missing a time"))),
        };
        stops.push(ParsedStop {
            station,
            arrival,
            departure,
            price: stop.price,
            occupancy: stop.occupancy,
            board: stop.board && idx != last,
            alight: stop.alight && idx != 0,
        });
    }

    for pair in stops.windows(2) {
        if pair[0].arrival > pair[0].departure || pair[0].departure > pair[1].arrival {
            return Err(invalid("times must not decrease along the trip".into()));
        }
    }

    Ok(stops)
}

/// Event times of a trip in stop order: departure, arrival, departure, ...
fn events(stops: &[ParsedStop]) -> impl Iterator<Item = Time> + '_ {
    stops.iter().enumerate().flat_map(|(idx, s)| {
        let arrival = (idx > 0).then_some(s.arrival);
        arrival.into_iter().chain(std::iter::once(s.departure))
    })
}

/// Two trips may share a route if one never overtakes the other.
fn fifo_compatible(a: &[ParsedStop], b: &[ParsedStop]) -> bool {
    let pairs: Vec<(Time, Time)> = events(a).zip(events(b)).collect();
    pairs.iter().all(|(x, y)| x <= y) || pairs.iter().all(|(x, y)| x >= y)
}

fn group_routes(trips: &[Vec<ParsedStop>]) -> Vec<RouteBuild> {
    let mut routes: Vec<RouteBuild> = Vec::new();
    for (trip_idx, stops) in trips.iter().enumerate() {
        let key: Vec<_> = stops.iter().map(|s| (s.station, s.board, s.alight)).collect();
        let existing = routes.iter_mut().find(|r| {
            r.key == key
                && r
                    .trips
                    .iter()
                    .all(|other| fifo_compatible(stops, &trips[*other]))
        });
        match existing {
            Some(route) => route.trips.push(trip_idx),
            None => routes.push(RouteBuild {
                key,
                trips: vec![trip_idx],
            }),
        }
    }
    routes
}

fn push_edge(graph: &mut Graph, edge: Edge) -> EdgeId {
    let id = EdgeId(graph.edges.len() as u32);
    graph.nodes[edge.from.index()].edges.push(id);
    graph.nodes[edge.to.index()].incoming.push(id);
    graph.edges.push(edge);
    id
}

fn add_route(
    graph: &mut Graph,
    route_id: RouteId,
    route: &RouteBuild,
    trips: &[Vec<ParsedStop>],
    spec: &NetworkSpec,
    footpaths: &Footpaths,
) {
    let first_node = graph.nodes.len() as u32;
    for (pos, (station, _, _)) in route.key.iter().enumerate() {
        graph.nodes.push(Node {
            id: NodeId(first_node + pos as u32),
            kind: NodeKind::Route(route_id),
            station: *station,
            edges: Vec::new(),
            incoming: Vec::new(),
        });
    }
    let route_node = |pos: usize| NodeId(first_node + pos as u32);

    for pos in 0..route.key.len() - 1 {
        let mut connections: Vec<Connection> = route
            .trips
            .iter()
            .map(|trip_idx| {
                let stops = &trips[*trip_idx];
                Connection {
                    departure: stops[pos].departure,
                    arrival: stops[pos + 1].arrival,
                    trip: TripId(*trip_idx as u32),
                    class: spec.trips[*trip_idx].class,
                    price: stops[pos].price,
                    occupancy: stops[pos].occupancy,
                }
            })
            .collect();
        connections.sort_by_key(|c| (c.departure, c.arrival));
        push_edge(
            graph,
            Edge::new(route_node(pos), route_node(pos + 1), EdgeKind::Route { connections }),
        );
    }

    for (pos, (station, board, alight)) in route.key.iter().enumerate() {
        let station_node = graph.station_node(*station);
        let node = route_node(pos);
        if *board {
            push_edge(graph, Edge::new(station_node, node, EdgeKind::Enter));
            for (other, duration) in footpaths.walkable_to(*station) {
                let other = graph.station_node(other);
                push_edge(
                    graph,
                    Edge::new(other, node, EdgeKind::AfterTrainBackward { duration }),
                );
            }
        }
        if *alight {
            push_edge(graph, Edge::new(node, station_node, EdgeKind::Exit));
            for (other, duration) in footpaths.walkable_from(*station) {
                let other = graph.station_node(other);
                push_edge(
                    graph,
                    Edge::new(node, other, EdgeKind::AfterTrainForward { duration }),
                );
            }
        }
    }
}
