//! Time-independent graphs for lower bounds.
//!
//! Two graphs per direction are derived from the routing graph:
//!
//! - the travel time graph over stations, weighted by the minimal travel
//!   time of each edge (waiting and change times ignored),
//! - the interchange graph over stations and routes, weighted by boardings.
//!
//! Edges are stored the way the reverse Dijkstra consumes them: `edges(v)`
//! lists the nodes whose distance can be improved once `v` is settled.

use crate::domain::Direction;

use super::graph::{EdgeKind, Graph, NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleEdge {
    pub from: u32,
    pub cost: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantGraph {
    edges: Vec<Vec<SimpleEdge>>,
}

impl ConstantGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            edges: vec![Vec::new(); node_count],
        }
    }

    /// Register that `from` reaches `to` for `cost`.
    pub fn add_edge(&mut self, to: u32, from: u32, cost: u32) {
        let list = &mut self.edges[to as usize];
        match list.iter_mut().find(|e| e.from == from) {
            Some(existing) => existing.cost = existing.cost.min(cost),
            None => list.push(SimpleEdge { from, cost }),
        }
    }

    pub fn edges(&self, node: u32) -> &[SimpleEdge] {
        self.edges
            .get(node as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }
}

/// The precomputed lower-bound graphs of a schedule.
#[derive(Debug, Clone, Default)]
pub struct ConstantGraphs {
    travel_time_fwd: ConstantGraph,
    travel_time_bwd: ConstantGraph,
    transfers_fwd: ConstantGraph,
    transfers_bwd: ConstantGraph,
    route_offset: u32,
}

impl ConstantGraphs {
    pub fn build(graph: &Graph) -> Self {
        let station_count = graph.stations.len();
        let interchange_count = station_count + graph.route_count as usize;
        let mut graphs = Self {
            travel_time_fwd: ConstantGraph::new(station_count),
            travel_time_bwd: ConstantGraph::new(station_count),
            transfers_fwd: ConstantGraph::new(interchange_count),
            transfers_bwd: ConstantGraph::new(interchange_count),
            route_offset: station_count as u32,
        };

        for edge in &graph.edges {
            let from_station = graph.station_of(edge.from).0;
            let to_station = graph.station_of(edge.to).0;
            if from_station != to_station {
                if let Some(cost) = edge.minimum_cost() {
                    let cost = cost.max(0) as u32;
                    graphs.travel_time_fwd.add_edge(to_station, from_station, cost);
                    graphs.travel_time_bwd.add_edge(from_station, to_station, cost);
                }
            }

            let from = graphs.interchange_node(graph, edge.from);
            let to = graphs.interchange_node(graph, edge.to);
            if from != to {
                let boardings = match edge.kind {
                    EdgeKind::Enter | EdgeKind::AfterTrainBackward { .. } => 1,
                    _ => 0,
                };
                graphs.transfers_fwd.add_edge(to, from, boardings);
                graphs.transfers_bwd.add_edge(from, to, boardings);
            }
        }

        graphs
    }

    /// Node of the interchange graph: the station for station nodes, one
    /// node per route for route nodes.
    pub fn interchange_node(&self, graph: &Graph, node: NodeId) -> u32 {
        let node = graph.node(node);
        match node.kind {
            NodeKind::Station => node.station.0,
            NodeKind::Route(route) => self.route_offset + route.0,
        }
    }

    pub fn travel_time(&self, dir: Direction) -> &ConstantGraph {
        match dir {
            Direction::Forward => &self.travel_time_fwd,
            Direction::Backward => &self.travel_time_bwd,
        }
    }

    pub fn transfers(&self, dir: Direction) -> &ConstantGraph {
        match dir {
            Direction::Forward => &self.transfers_fwd,
            Direction::Backward => &self.transfers_bwd,
        }
    }
}
