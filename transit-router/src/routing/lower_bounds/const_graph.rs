use std::collections::HashMap;
use std::time::Instant;

use crate::domain::Direction;
use crate::network::{ConstantGraph, EdgeKind, NodeId, SimpleEdge};
use crate::routing::bucket_queue::BucketQueue;
use crate::routing::criteria::{INVALID_BOUND, MAX_TRANSFERS, MAX_TRAVEL_TIME};

use super::{LowerBounds, LowerBoundsQuery, LowerBoundsResult, elapsed_ms};

/// Boardings the transfer search explores before giving up.
const MAX_BOARDINGS: u32 = MAX_TRANSFERS + 1;

/// Distances from the goals over one constant graph. Nodes further away
/// than `max` keep [`INVALID_BOUND`].
pub(super) fn reverse_dijkstra(
    graph: &ConstantGraph,
    goals: &[u32],
    extra: &HashMap<u32, Vec<SimpleEdge>>,
    max: u32,
) -> Vec<u32> {
    let mut dist = vec![INVALID_BOUND; graph.node_count()];
    let mut queue: BucketQueue<(u32, u32)> = BucketQueue::new(max as usize);
    for &goal in goals {
        if let Some(d) = dist.get_mut(goal as usize) {
            *d = 0;
            queue.push(0, (0, goal));
        }
    }

    while let Some((d, node)) = queue.pop() {
        if d > dist[node as usize] {
            continue;
        }
        let extra_edges = extra.get(&node).map(Vec::as_slice).unwrap_or(&[]);
        for edge in graph.edges(node).iter().chain(extra_edges) {
            let next = d + edge.cost;
            let Some(current) = dist.get_mut(edge.from as usize) else {
                continue;
            };
            if next <= max && next < *current {
                *current = next;
                queue.push(next as usize, (next, edge.from));
            }
        }
    }
    dist
}

/// Bounds from shortest paths over the precomputed constant graphs.
pub struct ConstGraphLowerBounds<'a> {
    query: &'a LowerBoundsQuery<'a>,
    travel_time: Vec<u32>,
    transfers: Vec<u32>,
}

impl<'a> ConstGraphLowerBounds<'a> {
    pub fn new(query: &'a LowerBoundsQuery<'a>) -> Self {
        Self {
            query,
            travel_time: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Query edges in the form the reverse search consumes: keyed by the
    /// station a label reaches last.
    fn extra_edges(&self) -> (HashMap<u32, Vec<SimpleEdge>>, HashMap<u32, Vec<SimpleEdge>>) {
        let graph = &self.query.schedule.graph;
        let mut travel_time: HashMap<u32, Vec<SimpleEdge>> = HashMap::new();
        let mut transfers: HashMap<u32, Vec<SimpleEdge>> = HashMap::new();
        for edge in self.query.query_edges {
            let EdgeKind::Query {
                duration, transfer, ..
            } = edge.kind
            else {
                continue;
            };
            let from = graph.station_of(edge.from).0;
            let to = graph.station_of(edge.to).0;
            let (settled, improved) = match self.query.dir {
                Direction::Forward => (to, from),
                Direction::Backward => (from, to),
            };
            let cost = duration.max(0) as u32;
            travel_time.entry(settled).or_default().push(SimpleEdge {
                from: improved,
                cost,
            });
            transfers.entry(settled).or_default().push(SimpleEdge {
                from: improved,
                cost: u32::from(transfer),
            });
        }
        (travel_time, transfers)
    }
}

impl LowerBounds for ConstGraphLowerBounds<'_> {
    fn calculate(&mut self) -> LowerBoundsResult {
        let total = Instant::now();
        let schedule = self.query.schedule;
        let dir = self.query.dir;
        let graphs = &schedule.lower_bound_graphs;
        let goals: Vec<u32> = self.query.goals.iter().map(|s| s.0).collect();
        let (extra_time, extra_transfers) = self.extra_edges();

        let started = Instant::now();
        self.travel_time =
            reverse_dijkstra(graphs.travel_time(dir), &goals, &extra_time, MAX_TRAVEL_TIME);
        let travel_time_ms = elapsed_ms(started);

        let started = Instant::now();
        self.transfers =
            reverse_dijkstra(graphs.transfers(dir), &goals, &extra_transfers, MAX_BOARDINGS);
        let transfers_ms = elapsed_ms(started);

        let target_reachable = self
            .query
            .start_nodes()
            .any(|node| self.is_valid_time_diff(self.time_from_node(node)));

        tracing::debug!(
            %dir,
            goals = goals.len(),
            target_reachable,
            travel_time_ms,
            transfers_ms,
            "constant graph bounds"
        );

        LowerBoundsResult {
            target_reachable,
            travel_time_ms,
            transfers_ms,
            total_ms: elapsed_ms(total),
            ..LowerBoundsResult::default()
        }
    }

    fn time_from_node(&self, node: NodeId) -> u32 {
        let station = self.query.schedule.graph.station_of(node);
        self.travel_time
            .get(station.index())
            .copied()
            .unwrap_or(INVALID_BOUND)
    }

    fn transfers_from_node(&self, node: NodeId) -> u32 {
        let schedule = self.query.schedule;
        let idx = schedule
            .lower_bound_graphs
            .interchange_node(&schedule.graph, node);
        let boardings = self
            .transfers
            .get(idx as usize)
            .copied()
            .unwrap_or(INVALID_BOUND);
        if boardings == INVALID_BOUND {
            return INVALID_BOUND;
        }
        // a seated forward label still has to leave its trip; the first
        // boarding of a journey is free
        if self.query.dir.is_forward() && schedule.graph.node(node).is_route_node() {
            boardings
        } else {
            boardings.saturating_sub(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchInterval;
    use crate::network::{Edge, Schedule};
    use crate::routing::lower_bounds::test_support;

    fn query<'a>(
        schedule: &'a Schedule,
        dir: Direction,
        start: &str,
        goal: &str,
        edges: &'a [Edge],
    ) -> LowerBoundsQuery<'a> {
        LowerBoundsQuery {
            schedule,
            timetables: None,
            dir,
            starts: vec![schedule.station_by_code(start).unwrap()],
            goals: vec![schedule.station_by_code(goal).unwrap()],
            interval: SearchInterval::new(470, 500),
            extend_earlier: false,
            extend_later: false,
            use_start_footpaths: false,
            query_edges: edges,
        }
    }

    fn node(schedule: &Schedule, code: &str) -> NodeId {
        schedule
            .graph
            .station_node(schedule.station_by_code(code).unwrap())
    }

    #[test]
    fn dial_search_respects_cap() {
        let mut graph = ConstantGraph::new(3);
        graph.add_edge(0, 1, 5);
        graph.add_edge(1, 2, 5);
        let dist = reverse_dijkstra(&graph, &[0], &HashMap::new(), 8);
        assert_eq!(dist, vec![0, 5, INVALID_BOUND]);
    }

    #[test]
    fn forward_bounds_use_fastest_trips() {
        let schedule = test_support::schedule();
        let q = query(&schedule, Direction::Forward, "A", "C", &[]);
        let mut bounds = ConstGraphLowerBounds::new(&q);
        assert!(bounds.calculate().target_reachable);

        // ICE 2 takes 10 minutes to B, ICE 3 takes 20 on to C
        assert_eq!(bounds.time_from_node(node(&schedule, "A")), 30);
        assert_eq!(bounds.time_from_node(node(&schedule, "B")), 20);
        assert_eq!(bounds.time_from_node(node(&schedule, "C")), 0);

        // RB 1 runs through
        assert_eq!(bounds.transfers_from_node(node(&schedule, "A")), 0);
        assert_eq!(bounds.transfers_from_node(node(&schedule, "C")), 0);
    }

    #[test]
    fn backward_bounds_measure_from_origin() {
        let schedule = test_support::schedule();
        let q = query(&schedule, Direction::Backward, "C", "A", &[]);
        let mut bounds = ConstGraphLowerBounds::new(&q);
        assert!(bounds.calculate().target_reachable);
        assert_eq!(bounds.time_from_node(node(&schedule, "C")), 30);
        assert_eq!(bounds.time_from_node(node(&schedule, "B")), 10);
    }

    #[test]
    fn unreachable_goal() {
        let schedule = test_support::schedule();
        let q = query(&schedule, Direction::Forward, "A", "E", &[]);
        let mut bounds = ConstGraphLowerBounds::new(&q);
        assert!(!bounds.calculate().target_reachable);
        assert_eq!(bounds.time_from_node(node(&schedule, "A")), INVALID_BOUND);
        assert!(!bounds.is_valid_time_diff(bounds.time_from_node(node(&schedule, "A"))));
    }

    #[test]
    fn query_edges_extend_the_graph() {
        let schedule = test_support::schedule();
        let c = schedule.station_by_code("C").unwrap();
        let e = schedule.station_by_code("E").unwrap();
        let edges = vec![Edge::new(
            schedule.graph.station_node(c),
            schedule.graph.station_node(e),
            EdgeKind::Query {
                duration: 15,
                price: 0,
                transfer: false,
            },
        )];
        let q = query(&schedule, Direction::Forward, "A", "E", &edges);
        let mut bounds = ConstGraphLowerBounds::new(&q);
        assert!(bounds.calculate().target_reachable);
        assert_eq!(bounds.time_from_node(node(&schedule, "C")), 15);
        assert_eq!(bounds.time_from_node(node(&schedule, "A")), 45);
    }

    #[test]
    fn transfer_query_edges_cost_a_transfer() {
        let schedule = test_support::schedule();
        let c = schedule.station_by_code("C").unwrap();
        let e = schedule.station_by_code("E").unwrap();
        // RB 1 runs through from A to C, the query edge continues to E
        for (transfer, expected) in [(false, 0), (true, 1)] {
            let edges = vec![Edge::new(
                schedule.graph.station_node(c),
                schedule.graph.station_node(e),
                EdgeKind::Query {
                    duration: 15,
                    price: 0,
                    transfer,
                },
            )];
            let q = query(&schedule, Direction::Forward, "A", "E", &edges);
            let mut bounds = ConstGraphLowerBounds::new(&q);
            assert!(bounds.calculate().target_reachable);
            assert_eq!(bounds.transfers_from_node(node(&schedule, "A")), expected);
            assert_eq!(bounds.transfers_from_node(node(&schedule, "C")), 0);
        }
    }
}
