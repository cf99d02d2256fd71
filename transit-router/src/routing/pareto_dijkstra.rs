//! Multi-criteria label-setting search.
//!
//! Labels wait in three pools. Labels on optimal journeys go on the
//! optimals stack and are always expanded first. A child whose sort key
//! equals its parent's goes on the equals stack, everything else into a
//! bucket queue keyed by the profile. Every node keeps the labels that no
//! other label at the node dominates; a label reaching a goal station
//! becomes a result if no result dominates it.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::domain::{Direction, StationId};
use crate::network::{Edge, EdgeType, NodeId};

use super::arena::LabelArena;
use super::bucket_queue::BucketQueue;
use super::label::{EdgeRef, Label, LabelContext, LabelId};
use super::profile::Profile;
use super::statistics::SearchStatistics;

/// Search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_label_count: usize,
    pub post_search_dominance: bool,
}

pub struct ParetoDijkstra<'a> {
    ctx: LabelContext<'a>,
    profile: &'a Profile,
    arena: &'a mut LabelArena,
    is_goal: Vec<bool>,
    query_edges: &'a [Edge],
    additional_edges: HashMap<NodeId, Vec<u32>>,
    limits: SearchLimits,

    queue: BucketQueue<LabelId>,
    optimals: Vec<LabelId>,
    equals: Vec<LabelId>,
    results: Vec<LabelId>,
    optimal_results: Vec<LabelId>,
    stats: SearchStatistics,
}

impl<'a> ParetoDijkstra<'a> {
    pub fn new(
        ctx: LabelContext<'a>,
        profile: &'a Profile,
        arena: &'a mut LabelArena,
        goals: &[StationId],
        query_edges: &'a [Edge],
        limits: SearchLimits,
    ) -> Self {
        let graph = ctx.graph;
        let mut is_goal = vec![false; graph.stations.len()];
        for goal in goals {
            if let Some(g) = is_goal.get_mut(goal.index()) {
                *g = true;
            }
        }

        let mut additional_edges: HashMap<NodeId, Vec<u32>> = HashMap::new();
        for (i, edge) in query_edges.iter().enumerate() {
            let valid = edge.from.index() < graph.nodes.len() && edge.to.index() < graph.nodes.len();
            if !valid {
                trace!(from = %edge.from, to = %edge.to, "skipping query edge to unknown node");
                continue;
            }
            additional_edges
                .entry(edge.source(ctx.dir))
                .or_default()
                .push(i as u32);
        }

        Self {
            ctx,
            profile,
            arena,
            is_goal,
            query_edges,
            additional_edges,
            limits,
            queue: BucketQueue::new(profile.max_bucket()),
            optimals: Vec::new(),
            equals: Vec::new(),
            results: Vec::new(),
            optimal_results: Vec::new(),
            stats: SearchStatistics::default(),
        }
    }

    /// Register start labels. They are stored at their nodes without a
    /// dominance check.
    pub fn add_start_labels(&mut self, labels: impl IntoIterator<Item = Label>) {
        for label in labels {
            let node = label.node.index();
            let id = self.arena.push(label);
            self.arena.node_labels_mut(node).push(id);
            if self.profile.is_on_optimal_journey(&label) {
                self.push_optimal(id);
            } else {
                self.push_queue(id);
            }
            self.stats.start_label_count += 1;
        }
        debug!(
            start_labels = self.stats.start_label_count,
            optimal = self.optimals.len(),
            "start labels added"
        );
    }

    /// Run until the pools are empty or the label budget is spent.
    pub fn search(&mut self) {
        let started = Instant::now();

        loop {
            if self.budget_exceeded() {
                self.stats.max_label_quit = true;
                warn!(
                    labels_created = self.stats.labels_created,
                    max = self.limits.max_label_count,
                    results = self.results.len(),
                    "label budget exhausted"
                );
                break;
            }
            let Some(id) = self.pop() else {
                break;
            };
            self.stats.labels_popped_after_last_result += 1;

            let label = *self.arena.get(id);
            if label.dominated {
                self.stats.labels_dominated_by_later_labels += 1;
                continue;
            }
            if !self.may_be_in_result_set(&label) {
                self.stats.labels_dominated_by_results += 1;
                continue;
            }
            if self.is_goal_node(label.node) {
                continue;
            }

            if let Some(extra) = self.additional_edges.get(&label.node).cloned() {
                let query_edges = self.query_edges;
                for i in extra {
                    let edge = &query_edges[i as usize];
                    self.create_new_label(id, &label, edge, EdgeRef::Query(i));
                }
            }
            let graph = self.ctx.graph;
            for &edge_id in graph.edges_in(label.node, self.ctx.dir) {
                let edge = graph.edge(edge_id);
                if !edge.is_usable(self.ctx.dir) {
                    continue;
                }
                self.create_new_label(id, &label, edge, EdgeRef::Graph(edge_id));
            }
        }

        self.filter_results();
        self.stats.pareto_dijkstra_ms += started.elapsed().as_millis() as u64;

        debug!(
            dir = %self.ctx.dir,
            results = self.results.len(),
            optimal_results = self.optimal_results.len(),
            labels_created = self.stats.labels_created,
            labels_popped = self.stats.labels_popped,
            dominated_by_results = self.stats.labels_dominated_by_results,
            dominated_by_former = self.stats.labels_dominated_by_former_labels,
            max_label_quit = self.stats.max_label_quit,
            "pareto dijkstra finished"
        );
    }

    pub fn results(&self) -> &[LabelId] {
        &self.results
    }

    pub fn label(&self, id: LabelId) -> &Label {
        self.arena.get(id)
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    /// Results and counters. The labels stay in the arena.
    pub fn finish(self) -> (Vec<LabelId>, SearchStatistics) {
        (self.results, self.stats)
    }

    fn budget_exceeded(&self) -> bool {
        let created = self.stats.labels_created;
        let max = self.limits.max_label_count;
        (created > max / 2 && self.results.is_empty()) || created > max
    }

    fn total_popped(&self) -> usize {
        self.stats.labels_popped + self.stats.labels_optimals_popped + self.stats.labels_equals_popped
    }

    fn pop(&mut self) -> Option<LabelId> {
        loop {
            if let Some(id) = self.optimals.pop() {
                self.stats.labels_optimals_popped += 1;
                let label = self.arena.get_mut(id);
                if label.expanded_as_optimal {
                    continue;
                }
                label.expanded_as_optimal = true;
                return Some(id);
            }
            if let Some(id) = self.equals.pop() {
                self.stats.labels_equals_popped += 1;
                if self.profile.is_on_optimal_journey(self.arena.get(id)) {
                    continue;
                }
                return Some(id);
            }
            let id = self.queue.pop()?;
            self.stats.labels_popped += 1;
            if self.profile.is_on_optimal_journey(self.arena.get(id)) {
                continue;
            }
            return Some(id);
        }
    }

    fn push_optimal(&mut self, id: LabelId) {
        self.optimals.push(id);
        self.stats.optimals_max_size = self.stats.optimals_max_size.max(self.optimals.len());
    }

    fn push_queue(&mut self, id: LabelId) {
        let bucket = self.profile.bucket(self.arena.get(id));
        self.queue.push(bucket, id);
        self.stats.priority_queue_max_size = self.stats.priority_queue_max_size.max(self.queue.len());
    }

    fn is_goal_station(&self, station: StationId) -> bool {
        self.is_goal.get(station.index()).copied().unwrap_or(false)
    }

    fn is_goal_node(&self, node: NodeId) -> bool {
        let graph = self.ctx.graph;
        graph.node(node).is_station_node() && self.is_goal_station(graph.station_of(node))
    }

    fn may_be_in_result_set(&self, label: &Label) -> bool {
        let results: Vec<&Label> = self.results.iter().map(|r| self.arena.get(*r)).collect();
        self.profile.may_be_in_result_set(label, &results)
    }

    fn create_new_label(&mut self, parent_id: LabelId, parent: &Label, edge: &Edge, edge_ref: EdgeRef) {
        let dir = self.ctx.dir;
        let graph = self.ctx.graph;
        let edge_type = edge.edge_type();
        let leaves_goal = self.is_goal_station(graph.station_of(edge.source(dir)));
        let no_cost = leaves_goal
            && match dir {
                Direction::Forward => edge_type == EdgeType::Exit,
                Direction::Backward => edge_type == EdgeType::Enter,
            };
        let final_walk = matches!(
            edge_type,
            EdgeType::AfterTrainForward | EdgeType::AfterTrainBackward
        ) && self.is_goal_node(edge.destination(dir));

        let Some(child) = parent.create_child(
            parent_id,
            edge,
            edge_ref,
            no_cost,
            final_walk,
            self.profile,
            &self.ctx,
        ) else {
            return;
        };
        self.stats.labels_created += 1;
        self.stats.labels_created_after_last_result += 1;

        if self.is_goal_node(child.node) {
            let id = self.arena.push(child);
            if self.add_result(id) && self.stats.labels_popped_until_first_result == 0 {
                self.stats.labels_popped_until_first_result = self.total_popped();
            }
            return;
        }

        let all_optimal_found = self.optimal_results.len() >= self.ctx.bounds.optimal_journey_count();
        if all_optimal_found && !self.may_be_in_result_set(&child) {
            self.stats.labels_dominated_by_results += 1;
            return;
        }

        let id = self.arena.push(child);
        if !self.add_label_to_node(id) {
            self.stats.labels_dominated_by_former_labels += 1;
            return;
        }
        let child = *self.arena.get(id);
        if self.profile.is_on_optimal_journey(&child) {
            self.push_optimal(id);
        } else if self.profile.less(parent, &child) {
            self.push_queue(id);
        } else {
            self.equals.push(id);
        }
    }

    fn add_result(&mut self, id: LabelId) -> bool {
        let mut new = *self.arena.get(id);
        let mut i = 0;
        while i < self.results.len() {
            let rid = self.results[i];
            let result = *self.arena.get(rid);
            if self.profile.dominates(&new, &result) {
                if self.profile.is_on_optimal_journey(&result) {
                    self.profile.transfer_optimality(&result, &mut new);
                    self.optimal_results.retain(|r| *r != rid);
                }
                self.results.remove(i);
                continue;
            }
            if self.profile.dominates(&result, &new) {
                return false;
            }
            i += 1;
        }

        *self.arena.get_mut(id) = new;
        self.results.push(id);
        if self.profile.is_on_optimal_journey(&new) {
            self.optimal_results.push(id);
        }
        self.stats.labels_popped_after_last_result = 0;
        self.stats.labels_created_after_last_result = 0;
        trace!(
            departure = new.departure(self.ctx.dir),
            arrival = new.arrival(self.ctx.dir),
            transfers = new.values.transfers,
            "result added"
        );
        true
    }

    fn add_label_to_node(&mut self, id: LabelId) -> bool {
        let mut new = *self.arena.get(id);
        let node = new.node.index();
        let stored = std::mem::take(self.arena.node_labels_mut(node));
        let new_optimal = self.profile.is_on_optimal_journey(&new);

        let mut kept: Vec<LabelId> = Vec::with_capacity(stored.len() + 1);
        kept.push(id);
        for (i, &other_id) in stored.iter().enumerate() {
            let other = *self.arena.get(other_id);
            if self.profile.dominates(&other, &new) {
                if new_optimal && !self.profile.is_on_optimal_journey(&other) {
                    let blocker = self.arena.get_mut(other_id);
                    self.profile.transfer_optimality(&new, blocker);
                    self.push_optimal(other_id);
                }
                kept.remove(0);
                kept.extend_from_slice(&stored[i..]);
                *self.arena.node_labels_mut(node) = kept;
                return false;
            }
            if self.profile.dominates(&new, &other) {
                self.arena.get_mut(other_id).dominated = true;
                if self.profile.is_on_optimal_journey(&other) {
                    self.profile.transfer_optimality(&other, &mut new);
                }
                continue;
            }
            kept.push(other_id);
        }

        *self.arena.get_mut(id) = new;
        *self.arena.node_labels_mut(node) = kept;
        true
    }

    /// Drop results another result beats on departure, arrival and the
    /// remaining criteria.
    fn filter_results(&mut self) {
        if !self.limits.post_search_dominance {
            return;
        }
        'restart: loop {
            for i in 0..self.results.len() {
                let victim = *self.arena.get(self.results[i]);
                let beaten = self.results.iter().enumerate().any(|(j, r)| {
                    j != i && self.profile.dominates_post_search(self.arena.get(*r), &victim)
                });
                if beaten {
                    let removed = self.results.remove(i);
                    self.optimal_results.retain(|r| *r != removed);
                    continue 'restart;
                }
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Schedule;
    use crate::routing::arena::ArenaPool;
    use crate::routing::lower_bounds::{NoLowerBounds, test_support};
    use crate::routing::profile::SearchType;

    const LIMITS: SearchLimits = SearchLimits {
        max_label_count: 1 << 20,
        post_search_dominance: false,
    };

    fn run(schedule: &Schedule, limits: SearchLimits) -> (Vec<Label>, SearchStatistics) {
        let profile = Profile::new(&SearchType::Default, Direction::Forward).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let a = schedule.station_by_code("A").unwrap();
        let c = schedule.station_by_code("C").unwrap();
        let pool = ArenaPool::new(1, 64);
        let mut arena = pool.checkout(schedule.graph.nodes.len());

        let start = Label::start(schedule.graph.station_node(a), 480, None, &profile, &ctx).unwrap();
        let mut search = ParetoDijkstra::new(ctx, &profile, &mut arena, &[c], &[], limits);
        search.add_start_labels([start]);
        search.search();
        let (ids, stats) = search.finish();
        let labels = ids.iter().map(|id| *arena.get(*id)).collect();
        (labels, stats)
    }

    #[test]
    fn finds_direct_and_faster_journey() {
        let schedule = test_support::schedule();
        let (mut results, stats) = run(&schedule, LIMITS);
        results.sort_by_key(|l| l.values.transfers);

        assert_eq!(results.len(), 2);
        // RB 1 all the way: 08:00 to 09:10
        assert_eq!(results[0].values.transfers, 0);
        assert_eq!(results[0].now, 550);
        // ICE 2 and ICE 3 via B
        assert_eq!(results[1].values.transfers, 1);
        assert_eq!(results[1].now, 525);

        assert_eq!(stats.start_label_count, 1);
        assert!(stats.labels_created > 0);
        assert!(stats.labels_popped_until_first_result > 0);
        assert!(!stats.max_label_quit);
    }

    #[test]
    fn results_form_an_antichain() {
        let schedule = test_support::schedule();
        let profile = Profile::new(&SearchType::Default, Direction::Forward).unwrap();
        let (results, _) = run(&schedule, LIMITS);
        for a in &results {
            for b in &results {
                assert!(!profile.dominates(a, b));
            }
        }
    }

    #[test]
    fn tiny_budget_quits() {
        let schedule = test_support::schedule();
        let (_, stats) = run(
            &schedule,
            SearchLimits {
                max_label_count: 2,
                post_search_dominance: false,
            },
        );
        assert!(stats.max_label_quit);
    }

    #[test]
    fn post_search_filter_keeps_incomparable_results() {
        let schedule = test_support::schedule();
        let (results, _) = run(
            &schedule,
            SearchLimits {
                max_label_count: 1 << 20,
                post_search_dominance: true,
            },
        );
        // same departure: the slower direct trip still has fewer transfers
        assert_eq!(results.len(), 2);
    }
}
