//! Router configuration.

use chrono::Duration;
use serde::Deserialize;

use super::lower_bounds::LowerBoundsStrategy;

/// Labels a single query may create before the search gives up.
pub const DEFAULT_MAX_LABEL_COUNT: usize = 128 * 1024 * 1024;

/// Configuration parameters for the router.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// How lower bounds are computed before the search.
    pub lower_bounds: LowerBoundsStrategy,

    /// Collect average bounds and invalid node counts into the statistics.
    pub extended_lb_stats: bool,

    /// Label budget. Past half of it the search stops if nothing was found
    /// yet; past all of it the search stops with what it has.
    pub max_label_count: usize,

    /// Drop results beaten on departure, arrival and every other criterion
    /// by another result after the search.
    pub post_search_dominance: bool,

    /// How far the interval grows per extension step (minutes).
    pub interval_extension_mins: i64,

    /// Label arenas kept around between queries.
    pub arena_pool_size: usize,

    /// Initial label capacity of a fresh arena.
    pub arena_capacity: usize,

    /// Measure how tight the bounds were along every result.
    pub evaluate_lower_bounds: bool,
}

impl RouterConfig {
    /// Create a new configuration with the given parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lower_bounds: LowerBoundsStrategy,
        extended_lb_stats: bool,
        max_label_count: usize,
        post_search_dominance: bool,
        interval_extension_mins: i64,
        arena_pool_size: usize,
        arena_capacity: usize,
        evaluate_lower_bounds: bool,
    ) -> Self {
        Self {
            lower_bounds,
            extended_lb_stats,
            max_label_count,
            post_search_dominance,
            interval_extension_mins,
            arena_pool_size,
            arena_capacity,
            evaluate_lower_bounds,
        }
    }

    /// Returns the interval extension step as a Duration.
    pub fn interval_extension(&self) -> Duration {
        Duration::minutes(self.interval_extension_mins)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            lower_bounds: LowerBoundsStrategy::ConstantGraph,
            extended_lb_stats: false,
            max_label_count: DEFAULT_MAX_LABEL_COUNT,
            post_search_dominance: false,
            interval_extension_mins: 60,
            arena_pool_size: 4,
            arena_capacity: 1 << 16,
            evaluate_lower_bounds: false,
        }
    }
}
