//! Counters reported with every search response.

use serde::Serialize;

use super::lower_bounds::{ExtendedLowerBoundStats, LowerBoundsEvaluation, LowerBoundsResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStatistics {
    pub labels_created: usize,
    pub start_label_count: usize,
    pub labels_popped: usize,
    pub labels_optimals_popped: usize,
    pub labels_equals_popped: usize,
    pub labels_dominated_by_results: usize,
    pub labels_dominated_by_former_labels: usize,
    pub labels_dominated_by_later_labels: usize,
    pub labels_popped_until_first_result: usize,
    pub labels_popped_after_last_result: usize,
    pub labels_created_after_last_result: usize,
    pub priority_queue_max_size: usize,
    pub optimals_max_size: usize,
    /// The label budget ran out; results are best effort.
    pub max_label_quit: bool,
    pub interval_extensions: usize,

    pub lower_bounds: LowerBoundsResult,
    pub pareto_dijkstra_ms: u64,
    pub total_ms: u64,
    pub optimal_journey_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_lower_bounds: Option<ExtendedLowerBoundStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bounds_evaluation: Option<LowerBoundsEvaluation>,
}

impl SearchStatistics {
    /// Fold the counters of another search run over the same query into
    /// these. Maxima are kept, counts are summed.
    pub fn accumulate(&mut self, run: &SearchStatistics) {
        self.labels_created += run.labels_created;
        self.start_label_count += run.start_label_count;
        self.labels_popped += run.labels_popped;
        self.labels_optimals_popped += run.labels_optimals_popped;
        self.labels_equals_popped += run.labels_equals_popped;
        self.labels_dominated_by_results += run.labels_dominated_by_results;
        self.labels_dominated_by_former_labels += run.labels_dominated_by_former_labels;
        self.labels_dominated_by_later_labels += run.labels_dominated_by_later_labels;
        if self.labels_popped_until_first_result == 0 {
            self.labels_popped_until_first_result = run.labels_popped_until_first_result;
        }
        self.labels_popped_after_last_result = run.labels_popped_after_last_result;
        self.labels_created_after_last_result = run.labels_created_after_last_result;
        self.priority_queue_max_size = self.priority_queue_max_size.max(run.priority_queue_max_size);
        self.optimals_max_size = self.optimals_max_size.max(run.optimals_max_size);
        self.max_label_quit |= run.max_label_quit;
        self.pareto_dijkstra_ms += run.pareto_dijkstra_ms;
    }
}
