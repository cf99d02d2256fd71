use crate::network::EdgeCost;

use super::{Criterion, CriterionKind, Domination, INVALID_BOUND};
use crate::routing::label::{Label, LabelContext};

/// Longest journey the search considers (minutes).
pub const MAX_TRAVEL_TIME: u32 = 1440;

/// Minutes since the start label, compared through their lower bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct TravelTime;

impl TravelTime {
    fn refresh(label: &mut Label, ctx: &LabelContext<'_>) {
        label.optimal_time = ctx.bounds.is_on_optimal_time_journey(label);
        let lb = ctx.bounds.time_from_node(label.node);
        label.values.travel_time_lb = if ctx.bounds.is_valid_time_diff(lb) {
            label.values.travel_time.saturating_add(lb)
        } else {
            INVALID_BOUND
        };
    }
}

impl Criterion for TravelTime {
    fn kind(&self) -> CriterionKind {
        CriterionKind::TravelTime
    }

    fn init(&self, label: &mut Label, ctx: &LabelContext<'_>) {
        label.values.travel_time = label.now.abs_diff(label.start);
        Self::refresh(label, ctx);
    }

    fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>) {
        label.values.travel_time = label
            .values
            .travel_time
            .saturating_add(cost.time.max(0) as u32);
        Self::refresh(label, ctx);
    }

    fn dominates(&self, a: &Label, b: &Label) -> Domination {
        Domination::compare(a.values.travel_time_lb, b.values.travel_time_lb)
    }

    fn result_dominates(&self, result: &Label, label: &Label, merge: Option<&Label>) -> Domination {
        let merged_lb = merge.map_or(0, |m| m.values.travel_time_lb);
        Domination::compare(
            result.values.travel_time_lb,
            label.values.travel_time_lb.max(merged_lb),
        )
    }

    fn is_filtered(&self, label: &Label) -> bool {
        label.values.travel_time_lb > MAX_TRAVEL_TIME
    }

    fn is_on_optimal_journey(&self, label: &Label) -> bool {
        label.optimal_time
    }

    fn transfer_optimality(&self, from: &Label, to: &mut Label) {
        if from.optimal_time {
            to.optimal_time = true;
        }
    }

    fn sort_key(&self, label: &Label) -> u32 {
        label.values.travel_time_lb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_lb(lb: u32) -> Label {
        let mut l = Label::bare(0, 0);
        l.values.travel_time_lb = lb;
        l
    }

    #[test]
    fn compares_lower_bounds() {
        let d = TravelTime.dominates(&with_lb(30), &with_lb(40));
        assert!(d.smaller && !d.greater);
        let d = TravelTime.dominates(&with_lb(40), &with_lb(30));
        assert!(d.greater && !d.smaller);
    }

    #[test]
    fn merge_target_raises_the_bar() {
        let result = with_lb(50);
        let label = with_lb(40);
        let merge = with_lb(60);
        assert!(TravelTime.result_dominates(&result, &label, None).greater);
        let d = TravelTime.result_dominates(&result, &label, Some(&merge));
        assert!(d.smaller && !d.greater);
    }

    #[test]
    fn filters_invalid_and_long_journeys() {
        assert!(!TravelTime.is_filtered(&with_lb(1440)));
        assert!(TravelTime.is_filtered(&with_lb(1441)));
        assert!(TravelTime.is_filtered(&with_lb(INVALID_BOUND)));
    }

    #[test]
    fn optimality_only_spreads() {
        let mut from = Label::bare(0, 0);
        let mut to = Label::bare(0, 0);
        from.optimal_time = true;
        TravelTime.transfer_optimality(&from, &mut to);
        assert!(to.optimal_time);

        from.optimal_time = false;
        TravelTime.transfer_optimality(&from, &mut to);
        assert!(to.optimal_time);
    }
}
