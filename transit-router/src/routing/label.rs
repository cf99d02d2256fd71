//! Search labels.
//!
//! A label is one partial journey: where it is, since when, how it got there
//! and what it cost so far. Labels are stored in an arena and refer to their
//! predecessor by index, so the chain of a label can always be walked back
//! to its start.

use crate::domain::{Direction, Time};
use crate::network::{ConnectionRef, Edge, EdgeId, EdgeType, Graph, NodeId};

use super::criteria::PriceValues;
use super::lower_bounds::LowerBounds;
use super::profile::Profile;

/// Index of a label in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl LabelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The edge a label was created through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeRef {
    /// An edge of the schedule graph.
    Graph(EdgeId),
    /// An edge added by the query, indexed into its query edges.
    Query(u32),
}

/// The optimal journeys a label may still be following, one bit per
/// journey. Journeys past the 128th share bits with earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptimalJourneys(u128);

impl OptimalJourneys {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u128::MAX);

    pub fn single(journey: usize) -> Self {
        Self(1 << (journey % 128))
    }

    pub fn contains(self, journey: usize) -> bool {
        self.0 & Self::single(journey).0 != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Per-criterion state of a label. Bounds that could not be computed hold
/// [`INVALID_BOUND`](super::criteria::INVALID_BOUND).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CriteriaValues {
    pub travel_time: u32,
    pub travel_time_lb: u32,
    pub transfers: u32,
    pub transfers_lb: u32,
    pub price: PriceValues,
    pub occupancy: u32,
    pub max_occupancy: u8,
    pub sitting: bool,
    pub waiting_time: u32,
    pub adjusted_waiting_time: u32,
}

/// What criteria need to look at while updating a label.
#[derive(Clone, Copy)]
pub struct LabelContext<'a> {
    pub graph: &'a Graph,
    pub bounds: &'a dyn LowerBounds,
    pub dir: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub pred: Option<LabelId>,
    /// Node of the predecessor. A label never steps straight back there.
    pub pred_node: Option<NodeId>,
    pub node: NodeId,
    pub on_route_node: bool,
    pub edge: Option<EdgeRef>,
    pub edge_type: Option<EdgeType>,
    /// Trip connection just ridden.
    pub connection: Option<ConnectionRef>,
    pub start: Time,
    pub now: Time,
    pub dominated: bool,
    /// The predecessor lies on an optimal journey. Start labels count as
    /// having one.
    pub pred_optimal: bool,
    /// Which optimal journeys the label and its predecessors lie on.
    pub optimal_journeys: OptimalJourneys,
    pub optimal_time: bool,
    pub optimal_transfers: bool,
    pub expanded_as_optimal: bool,
    pub values: CriteriaValues,
}

impl Label {
    /// Create a start label at `node` and initialise its criteria.
    ///
    /// Returns `None` if a criterion filters the label right away, which
    /// happens when the target cannot be reached from `node`.
    pub fn start(
        node: NodeId,
        time: Time,
        connection: Option<ConnectionRef>,
        profile: &Profile,
        ctx: &LabelContext<'_>,
    ) -> Option<Label> {
        let mut label = Label {
            pred: None,
            pred_node: None,
            node,
            on_route_node: ctx.graph.node(node).is_route_node(),
            edge: None,
            edge_type: None,
            connection,
            start: time,
            now: time,
            dominated: false,
            pred_optimal: true,
            optimal_journeys: OptimalJourneys::ALL,
            optimal_time: false,
            optimal_transfers: false,
            expanded_as_optimal: false,
            values: CriteriaValues::default(),
        };
        profile.init(&mut label, ctx);
        label.optimal_journeys = ctx.bounds.optimal_journeys(&label);
        (!profile.is_filtered(&label)).then_some(label)
    }

    /// Extend this label along `edge`.
    ///
    /// `no_cost` makes the edge free of time and transfers (used when
    /// leaving the search through a goal station). `final_walk` drops the
    /// transfer of a walk into a goal station.
    #[allow(clippy::too_many_arguments)]
    pub fn create_child(
        &self,
        id: LabelId,
        edge: &Edge,
        edge_ref: EdgeRef,
        no_cost: bool,
        final_walk: bool,
        profile: &Profile,
        ctx: &LabelContext<'_>,
    ) -> Option<Label> {
        let dir = ctx.dir;
        let destination = edge.destination(dir);
        if self.pred_node == Some(destination) {
            return None;
        }

        // Boarding and walking off at the same stop rides nothing; the
        // station's own footpath covers that walk.
        let edge_type = edge.edge_type();
        let boarded_and_left = match dir {
            Direction::Forward => {
                edge_type == EdgeType::AfterTrainForward && self.edge_type == Some(EdgeType::Enter)
            }
            Direction::Backward => {
                edge_type == EdgeType::AfterTrainBackward && self.edge_type == Some(EdgeType::Exit)
            }
        };
        if boarded_and_left {
            return None;
        }

        let prev = self.connection.and_then(|c| ctx.graph.connection(c));
        let edge_id = match edge_ref {
            EdgeRef::Graph(id) => Some(id),
            EdgeRef::Query(_) => None,
        };
        let mut cost = ctx.graph.edge_cost(edge, edge_id, dir, self.now, prev)?;
        if no_cost {
            cost.time = 0;
            cost.transfer = false;
        }
        if final_walk {
            cost.transfer = false;
        }

        let mut child = *self;
        child.pred = Some(id);
        child.pred_node = Some(self.node);
        child.node = destination;
        child.on_route_node = ctx.graph.node(destination).is_route_node();
        child.edge = Some(edge_ref);
        child.edge_type = Some(edge_type);
        child.connection = cost.connection;
        child.now = dir.advance(self.now, cost.time);
        child.dominated = false;
        child.pred_optimal = self.is_on_optimal_journey();
        child.expanded_as_optimal = false;

        profile.update(&mut child, &cost, ctx);
        child.optimal_journeys = ctx.bounds.optimal_journeys(&child);
        (!profile.is_filtered(&child)).then_some(child)
    }

    pub fn is_on_optimal_journey(&self) -> bool {
        self.optimal_time || self.optimal_transfers
    }

    /// The earlier end of the label's time span in real time.
    pub fn current_begin(&self, dir: Direction) -> Time {
        match dir {
            Direction::Forward => self.start,
            Direction::Backward => self.now,
        }
    }

    /// The later end of the label's time span in real time.
    pub fn current_end(&self, dir: Direction) -> Time {
        match dir {
            Direction::Forward => self.now,
            Direction::Backward => self.start,
        }
    }

    /// A label that begins earlier or ends later than `other` can never
    /// dominate it.
    pub fn incomparable(&self, other: &Label, dir: Direction) -> bool {
        self.current_begin(dir) < other.current_begin(dir)
            || self.current_end(dir) > other.current_end(dir)
    }

    /// Departure and arrival of the partial journey in real time.
    pub fn departure(&self, dir: Direction) -> Time {
        self.current_begin(dir)
    }

    pub fn arrival(&self, dir: Direction) -> Time {
        self.current_end(dir)
    }
}

#[cfg(test)]
impl Label {
    /// A bare station label for comparing criteria by hand.
    pub(crate) fn bare(start: Time, now: Time) -> Self {
        Label {
            pred: None,
            pred_node: None,
            node: NodeId(0),
            on_route_node: false,
            edge: None,
            edge_type: None,
            connection: None,
            start,
            now,
            dominated: false,
            pred_optimal: true,
            optimal_journeys: OptimalJourneys::ALL,
            optimal_time: false,
            optimal_transfers: false,
            expanded_as_optimal: false,
            values: CriteriaValues::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeKind, Schedule};
    use crate::routing::lower_bounds::NoLowerBounds;
    use crate::routing::profile::SearchType;

    const LINE: &str = r#"{
        "schedule_begin": "2024-03-15T00:00",
        "stations": [
            {"code": "A", "transfer_time": 2},
            {"code": "B", "transfer_time": 3}
        ],
        "trips": [
            {"id": "RE1", "class": "re", "stops": [
                {"station": "A", "departure": "08:00", "price": 250},
                {"station": "B", "arrival": "08:30"}
            ]}
        ]
    }"#;

    fn find_edge(schedule: &Schedule, ty: EdgeType) -> (EdgeId, &Edge) {
        let (i, edge) = schedule
            .graph
            .edges
            .iter()
            .enumerate()
            .find(|(_, e)| e.edge_type() == ty)
            .unwrap();
        (EdgeId(i as u32), edge)
    }

    fn profile(dir: Direction) -> Profile {
        Profile::new(&SearchType::Default, dir).unwrap()
    }

    #[test]
    fn forward_chain_accumulates_time() {
        let schedule = Schedule::from_json_str(LINE).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let profile = profile(Direction::Forward);

        let root = Label::start(NodeId(0), 470, None, &profile, &ctx).unwrap();
        let (enter_id, enter) = find_edge(&schedule, EdgeType::Enter);
        let boarded = root
            .create_child(LabelId(0), enter, EdgeRef::Graph(enter_id), false, false, &profile, &ctx)
            .unwrap();
        assert!(boarded.on_route_node);
        assert_eq!(boarded.now, 470);

        let (route_id, route) = find_edge(&schedule, EdgeType::Route);
        let ridden = boarded
            .create_child(LabelId(1), route, EdgeRef::Graph(route_id), false, false, &profile, &ctx)
            .unwrap();
        assert_eq!(ridden.now, 510);
        assert_eq!(ridden.values.travel_time, 40);
        assert_eq!(ridden.pred, Some(LabelId(1)));
        assert_eq!(ridden.pred_node, Some(boarded.node));
        assert!(ridden.connection.is_some());
    }

    #[test]
    fn never_steps_back_to_predecessor() {
        let schedule = Schedule::from_json_str(LINE).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let profile = profile(Direction::Forward);

        let root = Label::start(NodeId(0), 470, None, &profile, &ctx).unwrap();
        let (enter_id, enter) = find_edge(&schedule, EdgeType::Enter);
        let boarded = root
            .create_child(LabelId(0), enter, EdgeRef::Graph(enter_id), false, false, &profile, &ctx)
            .unwrap();
        let back = Edge::new(boarded.node, NodeId(0), EdgeKind::Exit);
        assert!(boarded
            .create_child(LabelId(1), &back, EdgeRef::Query(0), false, false, &profile, &ctx)
            .is_none());
    }

    #[test]
    fn no_cost_edges_are_free() {
        let schedule = Schedule::from_json_str(LINE).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let profile = profile(Direction::Forward);

        let (exit_id, exit) = find_edge(&schedule, EdgeType::Exit);
        let at_route = Label::start(exit.from, 510, None, &profile, &ctx).unwrap();
        let charged = at_route
            .create_child(LabelId(0), exit, EdgeRef::Graph(exit_id), false, false, &profile, &ctx)
            .unwrap();
        assert_eq!(charged.now, 513);
        assert_eq!(charged.values.transfers, 1);

        let free = at_route
            .create_child(LabelId(0), exit, EdgeRef::Graph(exit_id), true, false, &profile, &ctx)
            .unwrap();
        assert_eq!(free.now, 510);
        assert_eq!(free.values.transfers, 0);
    }

    #[test]
    fn comparability_follows_direction() {
        let schedule = Schedule::from_json_str(LINE).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let profile = profile(Direction::Forward);
        let mut a = Label::start(NodeId(1), 480, None, &profile, &ctx).unwrap();
        let mut b = a;
        a.now = 500;
        b.now = 510;

        // forward: same start, `a` arrives earlier
        assert!(!a.incomparable(&b, Direction::Forward));
        assert!(b.incomparable(&a, Direction::Forward));

        // backward: `now` is the departure, so `a` leaves earlier
        assert!(a.incomparable(&b, Direction::Backward));
        assert!(!b.incomparable(&a, Direction::Backward));
    }

    #[test]
    fn walking_off_needs_a_ride_first() {
        let schedule = Schedule::from_json_str(LINE).unwrap();
        let bounds = NoLowerBounds;
        let ctx = LabelContext {
            graph: &schedule.graph,
            bounds: &bounds,
            dir: Direction::Forward,
        };
        let profile = profile(Direction::Forward);
        let a = schedule.station_by_code("A").unwrap();
        let b = schedule.station_by_code("B").unwrap();

        let root = Label::start(schedule.graph.station_node(a), 470, None, &profile, &ctx).unwrap();
        let (enter_id, enter) = find_edge(&schedule, EdgeType::Enter);
        let boarded = root
            .create_child(LabelId(0), enter, EdgeRef::Graph(enter_id), false, false, &profile, &ctx)
            .unwrap();
        let walk_off = Edge::new(
            boarded.node,
            schedule.graph.station_node(b),
            EdgeKind::AfterTrainForward { duration: 5 },
        );
        assert!(boarded
            .create_child(LabelId(1), &walk_off, EdgeRef::Query(0), false, false, &profile, &ctx)
            .is_none());

        let (route_id, route) = find_edge(&schedule, EdgeType::Route);
        let ridden = boarded
            .create_child(LabelId(1), route, EdgeRef::Graph(route_id), false, false, &profile, &ctx)
            .unwrap();
        let walk_on = Edge::new(
            ridden.node,
            schedule.graph.station_node(a),
            EdgeKind::AfterTrainForward { duration: 5 },
        );
        let walked = ridden
            .create_child(LabelId(2), &walk_on, EdgeRef::Query(0), false, false, &profile, &ctx)
            .unwrap();
        assert_eq!(walked.now, 515);
        assert_eq!(walked.edge_type, Some(EdgeType::AfterTrainForward));
    }
}
