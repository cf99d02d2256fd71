use std::collections::BTreeSet;
use std::time::Instant;

use crate::csa::{CsaJourney, CsaQuery, CsaSearch, run_query};
use crate::domain::{Direction, SearchInterval, Time};
use crate::network::NodeId;
use crate::routing::criteria::INVALID_BOUND;

use super::{CsaTimetables, LowerBounds, LowerBoundsQuery, LowerBoundsResult, elapsed_ms};

/// Bounds from connection scans.
///
/// A first scan over the restricted timetable finds the optimal journeys of
/// the (possibly widened) interval. A second scan runs from the goals at
/// the times those journeys reach them, against the search direction, over
/// the unrestricted timetable. The time it needs to reach a station bounds
/// the remaining travel time of every label there.
pub struct CsaLowerBounds<'a> {
    query: &'a LowerBoundsQuery<'a>,
    timetables: &'a CsaTimetables,
    travel_time: Vec<u32>,
    transfers: Vec<u32>,
    journeys: Vec<CsaJourney>,
}

impl<'a> CsaLowerBounds<'a> {
    pub fn new(query: &'a LowerBoundsQuery<'a>, timetables: &'a CsaTimetables) -> Self {
        Self {
            query,
            timetables,
            travel_time: Vec::new(),
            transfers: Vec::new(),
            journeys: Vec::new(),
        }
    }

    /// Journeys of the first scan.
    pub fn journeys(&self) -> &[CsaJourney] {
        &self.journeys
    }

    fn scan_interval(&self) -> SearchInterval {
        let q = self.query;
        if q.interval.is_ontrip() {
            return q.interval;
        }
        let begin = if q.extend_earlier {
            q.schedule.begin
        } else {
            q.interval.begin
        };
        let end = if q.extend_later {
            q.schedule.end
        } else {
            q.interval.end
        };
        SearchInterval::new(begin, end)
    }
}

/// The times journeys reach the goals of a search in `dir`.
fn goal_times(journeys: &[CsaJourney], dir: Direction) -> BTreeSet<Time> {
    journeys
        .iter()
        .map(|j| match dir {
            Direction::Forward => j.arrival,
            Direction::Backward => j.departure,
        })
        .collect()
}

impl LowerBounds for CsaLowerBounds<'_> {
    fn calculate(&mut self) -> LowerBoundsResult {
        let total = Instant::now();
        let q = self.query;
        let station_count = q.schedule.station_count();

        let csa_query = CsaQuery {
            starts: q.starts.clone(),
            targets: q.goals.clone(),
            interval: self.scan_interval(),
            dir: q.dir,
            use_start_footpaths: q.use_start_footpaths,
        };
        self.journeys = run_query(&self.timetables.restricted, &csa_query);
        self.travel_time = vec![INVALID_BOUND; station_count];
        self.transfers = vec![INVALID_BOUND; station_count];

        if self.journeys.is_empty() {
            tracing::debug!(interval = %csa_query.interval, "no journeys, target unreachable");
            return LowerBoundsResult {
                total_ms: elapsed_ms(total),
                ..LowerBoundsResult::unreachable()
            };
        }

        let tt = &self.timetables.unrestricted;
        let mut search = CsaSearch::new(tt, q.dir.reverse());
        let times = goal_times(&self.journeys, q.dir);
        for goal in &q.goals {
            for time in &times {
                search.add_start(*goal, *time);
            }
        }
        search.search();

        for (s, station) in tt.stations.iter().enumerate() {
            let Some(needed) = search.needed_time(station.id) else {
                continue;
            };
            let mut best: Option<(usize, i32)> = None;
            for (trips, minutes) in needed.iter().enumerate() {
                if *minutes == i32::MAX {
                    continue;
                }
                if best.is_none() {
                    // fewest trips reaching the station
                    self.transfers[s] = (trips as u32).saturating_sub(1);
                }
                if best.is_none_or(|(_, m)| *minutes < m) {
                    best = Some((trips, *minutes));
                }
            }
            if let Some((_, minutes)) = best {
                // the scan charges the change time of the station itself
                self.travel_time[s] = (minutes - station.transfer_time).max(0) as u32;
            }
        }
        let ms = elapsed_ms(total);

        tracing::debug!(
            dir = %q.dir,
            journeys = self.journeys.len(),
            goal_times = times.len(),
            ms,
            "connection scan bounds"
        );

        let target_reachable = q
            .start_nodes()
            .any(|node| self.is_valid_time_diff(self.time_from_node(node)));
        LowerBoundsResult {
            target_reachable,
            travel_time_ms: ms,
            transfers_ms: 0,
            total_ms: ms,
            ..LowerBoundsResult::default()
        }
    }

    fn time_from_node(&self, node: NodeId) -> u32 {
        let station = self.query.schedule.graph.station_of(node);
        self.travel_time
            .get(station.index())
            .copied()
            .unwrap_or(INVALID_BOUND)
    }

    fn transfers_from_node(&self, node: NodeId) -> u32 {
        let station = self.query.schedule.graph.station_of(node);
        self.transfers
            .get(station.index())
            .copied()
            .unwrap_or(INVALID_BOUND)
    }
}
