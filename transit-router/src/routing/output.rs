//! Turn result labels into journeys.
//!
//! A result label and its predecessors describe the journey hop by hop.
//! Forward searches store the chain from destination to origin, backward
//! searches from origin to destination; both are brought into travel order
//! first. Consecutive route hops of one trip become a leg; walks, footpaths
//! after trips and query edges between two stations become walks.

use crate::domain::{
    Direction, DomainError, Journey, JourneyCriteria, Leg, LegStop, Segment, ServiceClass, StationId,
    Walk,
};
use crate::network::{Connection, Edge, EdgeKind, Schedule, TripId};

use super::arena::LabelArena;
use super::label::{EdgeRef, Label, LabelId};
use super::profile::Profile;

struct OpenLeg {
    trip: TripId,
    class: ServiceClass,
    stops: Vec<LegStop>,
}

impl OpenLeg {
    fn close(self, schedule: &Schedule) -> Result<Leg, DomainError> {
        Leg::new(schedule.trip_name(self.trip).to_string(), self.class, self.stops)
    }
}

fn edge_of<'a>(schedule: &'a Schedule, query_edges: &'a [Edge], label: &Label) -> Option<&'a Edge> {
    match label.edge? {
        EdgeRef::Graph(id) => Some(schedule.graph.edge(id)),
        EdgeRef::Query(i) => query_edges.get(i as usize),
    }
}

/// Build the journey ending in `result`.
///
/// # Errors
///
/// Returns `Err` if the hops do not form a valid journey, for instance when
/// the result is a start label that never left the goal.
pub fn reconstruct(
    schedule: &Schedule,
    profile: &Profile,
    arena: &LabelArena,
    result: LabelId,
    query_edges: &[Edge],
) -> Result<Journey, DomainError> {
    let dir = profile.direction();
    let graph = &schedule.graph;
    let mut chain: Vec<&Label> = arena.chain(result).collect();
    if dir.is_forward() {
        chain.reverse();
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut open: Option<OpenLeg> = None;

    for pair in chain.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        // the label created by traversing the hop carries its edge
        let carrier = match dir {
            Direction::Forward => next,
            Direction::Backward => prev,
        };
        let Some(edge) = edge_of(schedule, query_edges, carrier) else {
            continue;
        };

        match &edge.kind {
            EdgeKind::Route { .. } => {
                let Some(con) = carrier.connection.and_then(|c| graph.connection(c)) else {
                    continue;
                };
                let from = graph.station_of(edge.from);
                let to = graph.station_of(edge.to);
                extend_leg(schedule, &mut open, &mut segments, con, from, to)?;
            }
            EdgeKind::Enter | EdgeKind::Exit => {}
            EdgeKind::Foot { .. }
            | EdgeKind::AfterTrainForward { .. }
            | EdgeKind::AfterTrainBackward { .. }
            | EdgeKind::Query { .. } => {
                if let Some(leg) = open.take() {
                    segments.push(Segment::Trip(leg.close(schedule)?));
                }
                let from = graph.station_of(prev.node);
                let to = graph.station_of(next.node);
                if from != to {
                    segments.push(Segment::Walk(Walk::new(from, to, prev.now, next.now)));
                }
            }
        }
    }
    if let Some(leg) = open.take() {
        segments.push(Segment::Trip(leg.close(schedule)?));
    }

    let journey = Journey::new(segments)?;
    let label = arena.get(result);
    let criteria = JourneyCriteria {
        transfers: journey.change_count() as u32,
        ..profile.summary(label)
    };
    Ok(journey.with_criteria(criteria))
}

fn extend_leg(
    schedule: &Schedule,
    open: &mut Option<OpenLeg>,
    segments: &mut Vec<Segment>,
    con: &Connection,
    from: StationId,
    to: StationId,
) -> Result<(), DomainError> {
    match open {
        Some(leg) if leg.trip == con.trip => {
            if let Some(last) = leg.stops.last_mut() {
                last.departure = Some(con.departure);
            }
        }
        _ => {
            if let Some(leg) = open.take() {
                segments.push(Segment::Trip(leg.close(schedule)?));
            }
            *open = Some(OpenLeg {
                trip: con.trip,
                class: con.class,
                stops: vec![LegStop {
                    station: from,
                    arrival: None,
                    departure: Some(con.departure),
                }],
            });
        }
    }
    if let Some(leg) = open.as_mut() {
        leg.stops.push(LegStop {
            station: to,
            arrival: Some(con.arrival),
            departure: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::arena::ArenaPool;
    use crate::routing::label::LabelContext;
    use crate::routing::lower_bounds::{NoLowerBounds, test_support};
    use crate::routing::pareto_dijkstra::{ParetoDijkstra, SearchLimits};
    use crate::routing::profile::SearchType;

    fn journeys(dir: Direction) -> Vec<Journey> {
        let schedule = test_support::schedule();
        let profile = Profile::new(&SearchType::Default, dir).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir,
        };
        let a = schedule.station_by_code("A").unwrap();
        let c = schedule.station_by_code("C").unwrap();
        let (start, goal, time) = match dir {
            Direction::Forward => (a, c, 480),
            Direction::Backward => (c, a, 560),
        };
        let pool = ArenaPool::new(1, 64);
        let mut arena = pool.checkout(schedule.graph.nodes.len());
        let label = Label::start(schedule.graph.station_node(start), time, None, &profile, &ctx).unwrap();
        let limits = SearchLimits {
            max_label_count: 1 << 20,
            post_search_dominance: false,
        };
        let mut search = ParetoDijkstra::new(ctx, &profile, &mut arena, &[goal], &[], limits);
        search.add_start_labels([label]);
        search.search();
        let (results, _) = search.finish();
        let mut out: Vec<Journey> = results
            .iter()
            .map(|r| reconstruct(&schedule, &profile, &arena, *r, &[]).unwrap())
            .collect();
        out.sort_by_key(|j| j.change_count());
        out
    }

    #[test]
    fn forward_journeys_in_travel_order() {
        let out = journeys(Direction::Forward);
        assert_eq!(out.len(), 2);

        let direct = &out[0];
        assert!(direct.is_direct());
        assert_eq!(direct.departure_time(), 480);
        assert_eq!(direct.arrival_time(), 550);
        let leg = direct.legs().next().unwrap();
        assert_eq!(leg.trip_name(), "RB 1");
        // A, B, C
        assert_eq!(leg.stops().len(), 3);

        let fast = &out[1];
        assert_eq!(fast.change_count(), 1);
        assert_eq!(fast.criteria().transfers, 1);
        let names: Vec<_> = fast.legs().map(|l| l.trip_name().to_string()).collect();
        assert_eq!(names, vec!["ICE 2", "ICE 3"]);
        assert_eq!(fast.departure_time(), 485);
        assert_eq!(fast.arrival_time(), 525);
    }

    #[test]
    fn backward_journeys_in_travel_order() {
        let out = journeys(Direction::Backward);
        assert!(!out.is_empty());
        for journey in &out {
            assert_eq!(journey.origin(), StationId(0));
            assert!(journey.arrival_time() <= 560);
        }
        let fast = out.iter().find(|j| j.change_count() == 1).unwrap();
        assert_eq!(fast.departure_time(), 485);
        assert_eq!(fast.arrival_time(), 525);
    }
}
