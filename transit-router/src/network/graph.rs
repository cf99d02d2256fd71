//! Time-dependent routing graph.
//!
//! The first `stations.len()` nodes are station nodes (node `i` belongs to
//! station `i`). Every stop of a route gets its own route node. Route nodes
//! are chained by route edges that carry the timetable connections of all
//! trips of the route. Station and route nodes are linked by enter and exit
//! edges; walking is modelled by foot edges between station nodes and by
//! after-train edges that skip the change time at the station.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Minutes, ServiceClass, Station, StationId, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub u32);

impl TripId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub u32);

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Station,
    Route(RouteId),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub station: StationId,
    /// Outgoing edges.
    pub edges: Vec<EdgeId>,
    /// Incoming edges, traversed by backward searches.
    pub incoming: Vec<EdgeId>,
}

impl Node {
    pub fn is_route_node(&self) -> bool {
        matches!(self.kind, NodeKind::Route(_))
    }

    pub fn is_station_node(&self) -> bool {
        matches!(self.kind, NodeKind::Station)
    }

    pub fn route(&self) -> Option<RouteId> {
        match self.kind {
            NodeKind::Route(route) => Some(route),
            NodeKind::Station => None,
        }
    }
}

/// One elementary trip movement between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub departure: Time,
    pub arrival: Time,
    pub trip: TripId,
    pub class: ServiceClass,
    /// Fare for this segment.
    pub price: u16,
    /// Occupancy level (0 = seats available).
    pub occupancy: u8,
}

impl Connection {
    pub fn travel_time(&self) -> Minutes {
        self.arrival - self.departure
    }
}

/// Reference to a connection stored on a route edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionRef {
    pub edge: EdgeId,
    pub index: u32,
}

#[derive(Debug, Clone)]
pub enum EdgeKind {
    /// Connections sorted by departure. Routes are FIFO, so arrivals are
    /// sorted as well.
    Route { connections: Vec<Connection> },
    /// Station node to route node (boarding).
    Enter,
    /// Route node to station node (alighting).
    Exit,
    /// Walk between two station nodes.
    Foot { duration: Minutes },
    /// Route node to a foreign station node: alight and walk. Forward only.
    AfterTrainForward { duration: Minutes },
    /// Station node to a foreign route node: walk and board. Backward only.
    AfterTrainBackward { duration: Minutes },
    /// Per-query edge injected by the caller.
    Query {
        duration: Minutes,
        price: u16,
        transfer: bool,
    },
}

/// Payload-free copy of [`EdgeKind`] stored in labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Route,
    Enter,
    Exit,
    Foot,
    AfterTrainForward,
    AfterTrainBackward,
    Query,
}

impl EdgeType {
    /// Edges that move the traveller on foot.
    pub fn is_walk(self) -> bool {
        matches!(
            self,
            EdgeType::Foot
                | EdgeType::AfterTrainForward
                | EdgeType::AfterTrainBackward
                | EdgeType::Query
        )
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }

    pub fn edge_type(&self) -> EdgeType {
        match self.kind {
            EdgeKind::Route { .. } => EdgeType::Route,
            EdgeKind::Enter => EdgeType::Enter,
            EdgeKind::Exit => EdgeType::Exit,
            EdgeKind::Foot { .. } => EdgeType::Foot,
            EdgeKind::AfterTrainForward { .. } => EdgeType::AfterTrainForward,
            EdgeKind::AfterTrainBackward { .. } => EdgeType::AfterTrainBackward,
            EdgeKind::Query { .. } => EdgeType::Query,
        }
    }

    /// The node a search in `dir` leaves through this edge.
    pub fn source(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::Forward => self.from,
            Direction::Backward => self.to,
        }
    }

    /// The node a search in `dir` reaches through this edge.
    pub fn destination(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::Forward => self.to,
            Direction::Backward => self.from,
        }
    }

    pub fn connections(&self) -> &[Connection] {
        match &self.kind {
            EdgeKind::Route { connections } => connections,
            _ => &[],
        }
    }

    /// Whether this edge can be traversed at all in `dir`.
    pub fn is_usable(&self, dir: Direction) -> bool {
        match self.kind {
            EdgeKind::AfterTrainForward { .. } => dir.is_forward(),
            EdgeKind::AfterTrainBackward { .. } => !dir.is_forward(),
            _ => true,
        }
    }

    /// Smallest travel time this edge can ever cost, ignoring waiting and
    /// change times. `None` for route edges without connections.
    pub fn minimum_cost(&self) -> Option<Minutes> {
        match &self.kind {
            EdgeKind::Route { connections } => {
                connections.iter().map(Connection::travel_time).min()
            }
            EdgeKind::Enter | EdgeKind::Exit => Some(0),
            EdgeKind::Foot { duration }
            | EdgeKind::AfterTrainForward { duration }
            | EdgeKind::AfterTrainBackward { duration }
            | EdgeKind::Query { duration, .. } => Some(*duration),
        }
    }
}

/// Cost of traversing an edge at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCost {
    pub time: Minutes,
    pub transfer: bool,
    pub price: u16,
    pub connection: Option<ConnectionRef>,
}

impl EdgeCost {
    fn new(time: Minutes, transfer: bool) -> Self {
        Self {
            time,
            transfer,
            price: 0,
            connection: None,
        }
    }
}

/// The routing graph with its stations.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub stations: Vec<Station>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub route_count: u32,
    pub trip_count: u32,
}

impl Graph {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.index()]
    }

    pub fn station_node(&self, id: StationId) -> NodeId {
        NodeId(id.0)
    }

    /// Station a node belongs to.
    pub fn station_of(&self, node: NodeId) -> StationId {
        self.node(node).station
    }

    pub fn connection(&self, r: ConnectionRef) -> Option<&Connection> {
        self.edges
            .get(r.edge.index())?
            .connections()
            .get(r.index as usize)
    }

    /// Edges a search in `dir` relaxes from `node`.
    pub fn edges_in(&self, node: NodeId, dir: Direction) -> &[EdgeId] {
        let node = self.node(node);
        match dir {
            Direction::Forward => &node.edges,
            Direction::Backward => &node.incoming,
        }
    }

    /// The route edge leaving `node` in search direction, if any.
    pub fn route_edge(&self, node: NodeId, dir: Direction) -> Option<EdgeId> {
        self.edges_in(node, dir)
            .iter()
            .copied()
            .find(|e| matches!(self.edge(*e).kind, EdgeKind::Route { .. }))
    }

    /// Cost of traversing `edge` in `dir` when standing at it at `now`.
    ///
    /// `prev` is the connection the traveller is seated in; route edges then
    /// only continue with the same trip. Returns `None` if the edge cannot
    /// be used (no departure left, wrong direction, malformed edge).
    pub fn edge_cost(
        &self,
        edge: &Edge,
        edge_id: Option<EdgeId>,
        dir: Direction,
        now: Time,
        prev: Option<&Connection>,
    ) -> Option<EdgeCost> {
        if !edge.is_usable(dir) {
            return None;
        }
        match &edge.kind {
            EdgeKind::Route { connections } => {
                let edge_id = edge_id?;
                let index = route_connection(connections, dir, now, prev)?;
                let con = &connections[index];
                let time = match dir {
                    Direction::Forward => con.arrival - now,
                    Direction::Backward => now - con.departure,
                };
                Some(EdgeCost {
                    time,
                    transfer: false,
                    price: 0,
                    connection: Some(ConnectionRef {
                        edge: edge_id,
                        index: index as u32,
                    }),
                })
            }
            EdgeKind::Enter => Some(match dir {
                Direction::Forward => EdgeCost::new(0, false),
                Direction::Backward => EdgeCost::new(self.transfer_time(edge.from), true),
            }),
            EdgeKind::Exit => Some(match dir {
                Direction::Forward => EdgeCost::new(self.transfer_time(edge.to), true),
                Direction::Backward => EdgeCost::new(0, false),
            }),
            EdgeKind::Foot { duration } => Some(EdgeCost::new(*duration, false)),
            EdgeKind::AfterTrainForward { duration }
            | EdgeKind::AfterTrainBackward { duration } => Some(EdgeCost::new(*duration, true)),
            EdgeKind::Query {
                duration,
                price,
                transfer,
            } => {
                if *duration < 0 {
                    return None;
                }
                Some(EdgeCost {
                    time: *duration,
                    transfer: *transfer,
                    price: *price,
                    connection: None,
                })
            }
        }
    }

    /// Next connection usable from a route node at `now` in `dir`, used by
    /// the waiting time criterion and the optimality oracle.
    pub fn next_connection(&self, node: NodeId, dir: Direction, now: Time) -> Option<&Connection> {
        let edge = self.edge(self.route_edge(node, dir)?);
        let connections = edge.connections();
        route_connection(connections, dir, now, None).map(|i| &connections[i])
    }

    fn transfer_time(&self, node: NodeId) -> Minutes {
        self.station(self.station_of(node)).transfer_time
    }
}

/// Index of the connection a route edge uses at `now`.
fn route_connection(
    connections: &[Connection],
    dir: Direction,
    now: Time,
    prev: Option<&Connection>,
) -> Option<usize> {
    match dir {
        Direction::Forward => {
            let first = connections.partition_point(|c| c.departure < now);
            match prev {
                Some(p) => connections[first..]
                    .iter()
                    .position(|c| c.trip == p.trip)
                    .map(|i| first + i),
                None => (first < connections.len()).then_some(first),
            }
        }
        Direction::Backward => {
            let end = connections.partition_point(|c| c.arrival <= now);
            match prev {
                Some(p) => connections[..end].iter().rposition(|c| c.trip == p.trip),
                None => end.checked_sub(1),
            }
        }
    }
}
