//! Check the bounds against the journeys a search actually found.

use serde::Serialize;

use crate::routing::label::{Label, LabelId};

use super::LowerBounds;

/// How close the bounds came to the real remaining costs of the result
/// journeys. A tightness of 1 means the bound was exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LowerBoundsEvaluation {
    /// Labels on result chains that were checked.
    pub labels: usize,
    pub time_tightness: f64,
    pub transfers_tightness: f64,
    /// Bounds exceeding the real remaining cost.
    pub violations: usize,
}

/// Walk every result chain and compare each label's bounds with what the
/// rest of the journey really cost.
pub fn evaluate(bounds: &dyn LowerBounds, labels: &[Label], results: &[LabelId]) -> LowerBoundsEvaluation {
    let mut eval = LowerBoundsEvaluation::default();
    let (mut time_sum, mut time_count) = (0.0, 0usize);
    let (mut transfer_sum, mut transfer_count) = (0.0, 0usize);

    for id in results {
        let Some(result) = labels.get(id.index()) else {
            continue;
        };
        let mut current = Some(*id);
        while let Some(label) = current.and_then(|c| labels.get(c.index())) {
            eval.labels += 1;

            let remaining_time = result.values.travel_time.saturating_sub(label.values.travel_time);
            let time_bound = bounds.time_from_node(label.node);
            if bounds.is_valid_time_diff(time_bound) {
                if time_bound > remaining_time {
                    eval.violations += 1;
                    tracing::warn!(
                        node = %label.node,
                        bound = time_bound,
                        remaining = remaining_time,
                        "travel time bound too high"
                    );
                }
                if remaining_time > 0 {
                    time_sum += f64::from(time_bound) / f64::from(remaining_time);
                    time_count += 1;
                }
            }

            let remaining_transfers = result.values.transfers.saturating_sub(label.values.transfers);
            let transfer_bound = bounds.transfers_from_node(label.node);
            if bounds.is_valid_transfer_amount(transfer_bound) {
                if transfer_bound > remaining_transfers {
                    eval.violations += 1;
                    tracing::warn!(
                        node = %label.node,
                        bound = transfer_bound,
                        remaining = remaining_transfers,
                        "transfer bound too high"
                    );
                }
                if remaining_transfers > 0 {
                    transfer_sum += f64::from(transfer_bound) / f64::from(remaining_transfers);
                    transfer_count += 1;
                }
            }

            current = label.pred;
        }
    }

    if time_count > 0 {
        eval.time_tightness = time_sum / time_count as f64;
    }
    if transfer_count > 0 {
        eval.transfers_tightness = transfer_sum / transfer_count as f64;
    }
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeId;
    use crate::routing::lower_bounds::{LowerBoundsResult, NoLowerBounds};

    struct Fixed(u32);

    impl LowerBounds for Fixed {
        fn calculate(&mut self) -> LowerBoundsResult {
            LowerBoundsResult::default()
        }

        fn time_from_node(&self, _node: NodeId) -> u32 {
            self.0
        }

        fn transfers_from_node(&self, _node: NodeId) -> u32 {
            0
        }
    }

    fn chain() -> Vec<Label> {
        let mut start = Label::bare(0, 0);
        start.values.travel_time = 0;
        let mut result = Label::bare(0, 40);
        result.pred = Some(LabelId(0));
        result.values.travel_time = 40;
        vec![start, result]
    }

    #[test]
    fn zero_bounds_never_violate() {
        let labels = chain();
        let eval = evaluate(&NoLowerBounds, &labels, &[LabelId(1)]);
        assert_eq!(eval.labels, 2);
        assert_eq!(eval.violations, 0);
        assert_eq!(eval.time_tightness, 0.0);
    }

    #[test]
    fn too_high_bounds_are_counted() {
        let labels = chain();
        let eval = evaluate(&Fixed(50), &labels, &[LabelId(1)]);
        // the start label has 40 minutes to go, the result none
        assert_eq!(eval.violations, 2);

        let exact = evaluate(&Fixed(40), &labels, &[LabelId(1)]);
        assert_eq!(exact.violations, 1);
        assert_eq!(exact.time_tightness, 1.0);
    }
}
