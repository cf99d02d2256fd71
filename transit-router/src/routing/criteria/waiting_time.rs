use crate::domain::Direction;
use crate::network::EdgeCost;

use super::{Criterion, CriterionKind, Domination, MAX_TRAVEL_TIME};
use crate::routing::label::{Label, LabelContext};

/// Waits up to this long are not counted in the adjusted waiting time.
pub const MAX_NEGLECTED_WAITING_TIME: u32 = 10;
pub const MAX_WAITING_TIME: u32 = MAX_TRAVEL_TIME;

/// Time spent waiting for trips at boarding points.
#[derive(Debug, Clone, Copy)]
pub struct WaitingTime {
    dir: Direction,
}

impl WaitingTime {
    pub fn new(dir: Direction) -> Self {
        Self { dir }
    }

    /// Standing at a route node without having ridden into it: the label
    /// waits there for the next trip.
    fn is_waiting(label: &Label) -> bool {
        label.on_route_node && label.connection.is_none()
    }

    fn compare(&self, a: &Label, b: &Label, adjust: bool) -> Domination {
        let mut awt = a.values.adjusted_waiting_time;
        if adjust && self.dir.is_better(a.now, b.now) && !Self::is_waiting(a) {
            // `a` may have to wait until `b`'s time for the same trips
            awt += a.now.abs_diff(b.now);
        }
        Domination::compare(awt, b.values.adjusted_waiting_time)
    }
}

impl Criterion for WaitingTime {
    fn kind(&self) -> CriterionKind {
        CriterionKind::WaitingTime
    }

    fn init(&self, label: &mut Label, _ctx: &LabelContext<'_>) {
        label.values.waiting_time = 0;
        label.values.adjusted_waiting_time = 0;
    }

    fn update(&self, label: &mut Label, _cost: &EdgeCost, ctx: &LabelContext<'_>) {
        if !Self::is_waiting(label) {
            return;
        }
        let next = ctx.graph.next_connection(label.node, ctx.dir, label.now);
        let Some(con) = next else {
            label.values.waiting_time = MAX_WAITING_TIME + 1;
            label.values.adjusted_waiting_time = MAX_WAITING_TIME + 1;
            return;
        };
        let event = match ctx.dir {
            Direction::Forward => con.departure,
            Direction::Backward => con.arrival,
        };
        let wait = event.abs_diff(label.now);
        label.values.waiting_time += wait;
        if wait > MAX_NEGLECTED_WAITING_TIME {
            label.values.adjusted_waiting_time += wait - MAX_NEGLECTED_WAITING_TIME;
        }
    }

    fn dominates(&self, a: &Label, b: &Label) -> Domination {
        self.compare(a, b, true)
    }

    fn result_dominates(&self, result: &Label, label: &Label, _merge: Option<&Label>) -> Domination {
        self.compare(result, label, false)
    }

    fn is_filtered(&self, label: &Label) -> bool {
        label.values.waiting_time > MAX_WAITING_TIME
    }

    fn sort_key(&self, label: &Label) -> u32 {
        label.values.adjusted_waiting_time
    }
}
