//! Point-to-point connection scan queries.
//!
//! Pretrip queries run one scan per departure event of the origin (arrival
//! event of the destination when searching backward) inside the interval and
//! keep the Pareto-optimal journeys over departure, arrival and transfers.
//! Ontrip queries run a single scan.

use std::collections::BTreeSet;

use crate::domain::{Direction, SearchInterval, StationId, Time};

use super::search::{CsaJourney, CsaSearch, MAX_TRANSFERS};
use super::timetable::CsaTimetable;

/// A connection scan query. `starts` are the stations the scan begins at:
/// the origins when searching forward, the destinations when searching
/// backward.
#[derive(Debug, Clone)]
pub struct CsaQuery {
    pub starts: Vec<StationId>,
    pub targets: Vec<StationId>,
    pub interval: SearchInterval,
    pub dir: Direction,
    /// Also start from events reachable by a footpath from a start station.
    pub use_start_footpaths: bool,
}

/// Run a point-to-point query and return the Pareto-optimal journeys.
pub fn run_query(tt: &CsaTimetable, query: &CsaQuery) -> Vec<CsaJourney> {
    let events: Vec<(StationId, Time)> = if query.interval.is_ontrip() {
        query.starts.iter().map(|s| (*s, query.interval.begin)).collect()
    } else {
        start_events(tt, query).into_iter().collect()
    };

    let mut journeys = Vec::new();
    for (station, time) in &events {
        let mut search = CsaSearch::new(tt, query.dir);
        if !query.interval.is_ontrip() {
            search.fix_departure();
        }
        search.add_start(*station, *time);
        for target in &query.targets {
            search.add_target(*target);
        }
        search.search();
        for trips in 0..=MAX_TRANSFERS {
            if let Some(journey) = search.reconstruct(0, trips) {
                journeys.push(journey);
            }
        }
    }

    if !query.interval.is_ontrip() {
        journeys.retain(|j| query.interval.contains(search_start(j, query.dir)));
    }
    let journeys = pareto_filter(journeys, query.dir, query.interval.is_ontrip());

    tracing::debug!(
        direction = %query.dir,
        interval = %query.interval,
        start_events = events.len(),
        journeys = journeys.len(),
        "CSA query finished"
    );
    journeys
}

/// Departure events at the start stations (arrival events when scanning
/// backward) inside the interval, deduplicated.
fn start_events(tt: &CsaTimetable, query: &CsaQuery) -> BTreeSet<(StationId, Time)> {
    let SearchInterval { begin, end } = query.interval;
    let mut events = BTreeSet::new();

    for start in &query.starts {
        let mut sources = vec![(*start, 0)];
        if query.use_start_footpaths {
            let station = &tt.stations[start.index()];
            match query.dir {
                Direction::Forward => sources.extend(
                    station
                        .footpaths
                        .iter()
                        .filter(|fp| fp.to != *start)
                        .map(|fp| (fp.to, fp.duration)),
                ),
                Direction::Backward => sources.extend(
                    station
                        .incoming_footpaths
                        .iter()
                        .filter(|fp| fp.from != *start)
                        .map(|fp| (fp.from, fp.duration)),
                ),
            }
        }

        for (station, walk) in sources {
            for con in &tt.connections {
                let event = match query.dir {
                    Direction::Forward if con.from == station && con.from_in_allowed => {
                        con.departure - walk
                    }
                    Direction::Backward if con.to == station && con.to_out_allowed => {
                        con.arrival + walk
                    }
                    _ => continue,
                };
                if begin <= event && event <= end {
                    events.insert((*start, event));
                }
            }
        }
    }
    events
}

/// Time the journey leaves the start: departure forward, arrival backward.
fn search_start(journey: &CsaJourney, dir: Direction) -> Time {
    match dir {
        Direction::Forward => journey.departure,
        Direction::Backward => journey.arrival,
    }
}

/// Compared values of a journey. Ontrip journeys share their start time, so
/// that end is left out.
fn criteria(journey: &CsaJourney, dir: Direction, ontrip: bool) -> (Option<Time>, Option<Time>, u32) {
    let departure = (!ontrip || !dir.is_forward()).then_some(journey.departure);
    let arrival = (!ontrip || dir.is_forward()).then_some(journey.arrival);
    (departure, arrival, journey.transfers)
}

/// Later departure, earlier arrival and fewer transfers are better.
fn dominates(a: &CsaJourney, b: &CsaJourney, dir: Direction, ontrip: bool) -> bool {
    let (a_dep, a_arr, a_tr) = criteria(a, dir, ontrip);
    let (b_dep, b_arr, b_tr) = criteria(b, dir, ontrip);
    let not_worse = a_dep >= b_dep && a_arr <= b_arr && a_tr <= b_tr;
    not_worse && (a_dep, a_arr, a_tr) != (b_dep, b_arr, b_tr)
}

/// Keep the non-dominated journeys. Of equivalent journeys the first one
/// found is kept.
pub fn pareto_filter(journeys: Vec<CsaJourney>, dir: Direction, ontrip: bool) -> Vec<CsaJourney> {
    let mut kept: Vec<CsaJourney> = Vec::new();
    for journey in journeys {
        let key = criteria(&journey, dir, ontrip);
        if kept.iter().any(|k| {
            dominates(k, &journey, dir, ontrip) || criteria(k, dir, ontrip) == key
        }) {
            continue;
        }
        kept.retain(|k| !dominates(&journey, k, dir, ontrip));
        kept.push(journey);
    }
    kept.sort_by_key(|j| (j.departure, j.arrival, j.transfers));
    kept
}
