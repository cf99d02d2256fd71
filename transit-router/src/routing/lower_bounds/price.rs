use std::time::Instant;

use crate::network::NodeId;
use crate::routing::label::{Label, OptimalJourneys};

use super::{LowerBounds, LowerBoundsQuery, LowerBoundsResult, elapsed_ms};

/// Distance to the goal the traveller may cover on foot, free of charge.
const FREE_WALK_KM: f64 = 5.0;

/// Adds a price bound to another strategy: the beeline distance to the
/// nearest goal, less a short walk, at the cheapest fare per kilometre.
pub struct PriceLowerBounds<'a> {
    query: &'a LowerBoundsQuery<'a>,
    inner: Box<dyn LowerBounds + 'a>,
    remaining: Vec<u32>,
}

impl<'a> PriceLowerBounds<'a> {
    pub fn new(query: &'a LowerBoundsQuery<'a>, inner: Box<dyn LowerBounds + 'a>) -> Self {
        Self {
            query,
            inner,
            remaining: Vec::new(),
        }
    }
}

impl LowerBounds for PriceLowerBounds<'_> {
    fn calculate(&mut self) -> LowerBoundsResult {
        let mut result = self.inner.calculate();
        let started = Instant::now();
        let schedule = self.query.schedule;
        let per_km = schedule.cheapest_price_per_km.max(0.0);

        self.remaining = schedule
            .graph
            .stations
            .iter()
            .map(|station| {
                self.query
                    .goals
                    .iter()
                    .map(|goal| {
                        let km = station.distance_km(schedule.graph.station(*goal));
                        let km = (km - FREE_WALK_KM).max(0.0);
                        (km * per_km).min(f64::from(u32::MAX)) as u32
                    })
                    .min()
                    .unwrap_or(0)
            })
            .collect();

        result.price_ms = elapsed_ms(started);
        result.total_ms += result.price_ms;
        result
    }

    fn time_from_node(&self, node: NodeId) -> u32 {
        self.inner.time_from_node(node)
    }

    fn is_valid_time_diff(&self, diff: u32) -> bool {
        self.inner.is_valid_time_diff(diff)
    }

    fn transfers_from_node(&self, node: NodeId) -> u32 {
        self.inner.transfers_from_node(node)
    }

    fn is_valid_transfer_amount(&self, amount: u32) -> bool {
        self.inner.is_valid_transfer_amount(amount)
    }

    fn price_from_node(&self, node: NodeId) -> u32 {
        let station = self.query.schedule.graph.station_of(node);
        self.remaining.get(station.index()).copied().unwrap_or(0)
    }

    fn is_on_optimal_time_journey(&self, label: &Label) -> bool {
        self.inner.is_on_optimal_time_journey(label)
    }

    fn is_on_optimal_transfers_journey(&self, label: &Label) -> bool {
        self.inner.is_on_optimal_transfers_journey(label)
    }

    fn optimal_journeys(&self, label: &Label) -> OptimalJourneys {
        self.inner.optimal_journeys(label)
    }

    fn optimal_journey_count(&self) -> usize {
        self.inner.optimal_journey_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, SearchInterval};
    use crate::routing::lower_bounds::{ConstGraphLowerBounds, test_support};

    #[test]
    fn price_grows_with_distance() {
        let schedule = test_support::schedule();
        let c = schedule.station_by_code("C").unwrap();
        let query = LowerBoundsQuery {
            schedule: &schedule,
            timetables: None,
            dir: Direction::Forward,
            starts: vec![schedule.station_by_code("A").unwrap()],
            goals: vec![c],
            interval: SearchInterval::new(470, 490),
            extend_earlier: false,
            extend_later: false,
            use_start_footpaths: false,
            query_edges: &[],
        };
        let inner = Box::new(ConstGraphLowerBounds::new(&query));
        let mut bounds = PriceLowerBounds::new(&query, inner);
        assert!(bounds.calculate().target_reachable);

        let node = |code| schedule.graph.station_node(schedule.station_by_code(code).unwrap());
        // B is 22 km from C, A is 33 km away: 10 cents per km beyond 5 km
        assert_eq!(bounds.price_from_node(node("C")), 0);
        let b = bounds.price_from_node(node("B"));
        let a = bounds.price_from_node(node("A"));
        assert!((160..=180).contains(&b), "{b}");
        assert!((270..=290).contains(&a), "{a}");
        assert_eq!(bounds.time_from_node(node("A")), 30);
    }
}
