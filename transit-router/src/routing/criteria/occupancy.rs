use crate::network::EdgeCost;

use super::{Criterion, CriterionKind, Domination};
use crate::routing::label::{Label, LabelContext};

/// Which occupancy value is minimised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyMode {
    /// Occupancy level times minutes, summed over the journey.
    Sum,
    /// Highest occupancy level met on the journey.
    Max,
}

/// Crowding along the journey.
///
/// A connection with occupancy 0 has free seats: the traveller sits down.
/// With `sit` enabled a seated traveller ignores the occupancy of later
/// connections until the next transfer.
#[derive(Debug, Clone, Copy)]
pub struct Occupancy {
    mode: OccupancyMode,
    sit: bool,
}

impl Occupancy {
    pub fn new(mode: OccupancyMode, sit: bool) -> Self {
        Self { mode, sit }
    }

    pub fn mode(&self) -> OccupancyMode {
        self.mode
    }

    fn value(&self, label: &Label) -> u32 {
        match self.mode {
            OccupancyMode::Sum => label.values.occupancy,
            OccupancyMode::Max => u32::from(label.values.max_occupancy),
        }
    }
}

impl Criterion for Occupancy {
    fn kind(&self) -> CriterionKind {
        match (self.mode, self.sit) {
            (OccupancyMode::Max, _) => CriterionKind::Occupancy,
            (OccupancyMode::Sum, false) => CriterionKind::OccupancySum,
            (OccupancyMode::Sum, true) => CriterionKind::OccupancySit,
        }
    }

    fn init(&self, label: &mut Label, _ctx: &LabelContext<'_>) {
        label.values.occupancy = 0;
        label.values.max_occupancy = 0;
        label.values.sitting = false;
    }

    fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>) {
        if cost.transfer {
            label.values.sitting = false;
        }
        let Some(con) = cost.connection.and_then(|c| ctx.graph.connection(c)) else {
            return;
        };
        if self.sit && label.values.sitting {
            return;
        }
        if con.occupancy == 0 {
            label.values.sitting = true;
        } else {
            let minutes = con.travel_time().max(0) as u32;
            label.values.occupancy += u32::from(con.occupancy) * minutes;
            label.values.max_occupancy = label.values.max_occupancy.max(con.occupancy);
        }
    }

    fn dominates(&self, a: &Label, b: &Label) -> Domination {
        Domination::compare(self.value(a), self.value(b))
    }

    fn sort_key(&self, label: &Label) -> u32 {
        self.value(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Occupancy::new(OccupancyMode::Max, false).kind(),
            CriterionKind::Occupancy
        );
        assert_eq!(
            Occupancy::new(OccupancyMode::Sum, true).kind(),
            CriterionKind::OccupancySit
        );
    }

    #[test]
    fn modes_compare_different_fields() {
        let mut a = Label::bare(0, 0);
        let mut b = Label::bare(0, 0);
        a.values.occupancy = 100;
        a.values.max_occupancy = 1;
        b.values.occupancy = 50;
        b.values.max_occupancy = 2;

        assert!(Occupancy::new(OccupancyMode::Sum, false).dominates(&a, &b).greater);
        assert!(Occupancy::new(OccupancyMode::Max, false).dominates(&a, &b).smaller);
    }
}
