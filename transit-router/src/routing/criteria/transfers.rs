use crate::network::EdgeCost;

use super::{Criterion, CriterionKind, Domination, INVALID_BOUND};
use crate::routing::label::{Label, LabelContext};

/// Most transfers a journey may have.
pub const MAX_TRANSFERS: u32 = 7;

/// Number of changes between trips.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transfers;

impl Transfers {
    fn refresh(label: &mut Label, ctx: &LabelContext<'_>) {
        label.optimal_transfers = ctx.bounds.is_on_optimal_transfers_journey(label);
        let lb = ctx.bounds.transfers_from_node(label.node);
        label.values.transfers_lb = if ctx.bounds.is_valid_transfer_amount(lb) {
            label.values.transfers.saturating_add(lb)
        } else {
            INVALID_BOUND
        };
    }
}

impl Criterion for Transfers {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Transfers
    }

    fn init(&self, label: &mut Label, ctx: &LabelContext<'_>) {
        label.values.transfers = 0;
        Self::refresh(label, ctx);
    }

    fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>) {
        if cost.transfer {
            label.values.transfers += 1;
        }
        Self::refresh(label, ctx);
    }

    fn dominates(&self, a: &Label, b: &Label) -> Domination {
        Domination::compare(a.values.transfers_lb, b.values.transfers_lb)
    }

    /// A result off the optimal time journeys cannot beat a label on one by
    /// its transfers alone.
    fn result_dominates(&self, result: &Label, label: &Label, _merge: Option<&Label>) -> Domination {
        if label.optimal_time && !result.optimal_time {
            return Domination {
                greater: result.values.travel_time_lb > label.values.travel_time_lb,
                smaller: false,
            };
        }
        self.dominates(result, label)
    }

    fn merge_with_optimal_result(&self, original: &Label, result: &Label, merged: &mut Label) {
        merged.values.transfers_lb = original.values.transfers_lb.max(result.values.transfers_lb);
    }

    fn is_filtered(&self, label: &Label) -> bool {
        label.values.transfers_lb > MAX_TRANSFERS
    }

    fn is_on_optimal_journey(&self, label: &Label) -> bool {
        label.optimal_transfers
    }

    fn transfer_optimality(&self, from: &Label, to: &mut Label) {
        if from.optimal_transfers {
            to.optimal_transfers = true;
        }
    }

    fn sort_key(&self, label: &Label) -> u32 {
        label.values.transfers_lb
    }
}
