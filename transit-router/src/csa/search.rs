//! Multistart connection scan.
//!
//! State is kept per station, per start and per number of trips used
//! (`0..=MAX_TRANSFERS`). Arrival times at stations include the change time
//! through the station's own footpath loop, so a connection can be boarded
//! from a station exactly when `arrival_time <= departure`. Arrivals at the
//! target stations are tracked separately without that change time.

use crate::domain::{Direction, Minutes, StationId, Time};

use super::timetable::{CsaFootpath, CsaTimetable};

/// Highest number of trips a scanned journey may use.
pub const MAX_TRANSFERS: usize = 7;

/// Scans stop this many minutes after (before) the start.
pub const MAX_TRAVEL_TIME: Minutes = 1440;

/// One value per number of trips used, `0..=MAX_TRANSFERS`.
pub type TransferArray<T> = [T; MAX_TRANSFERS + 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPoint {
    pub station: StationId,
    pub time: Time,
}

/// How a station (or a target) was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalPointer {
    /// The start station itself.
    Start,
    /// Walked from the start station.
    StartWalk { from: StationId, duration: Minutes },
    /// Rode a trip from connection `entry` to connection `exit` (both in scan
    /// order), optionally followed by a walk.
    Trip {
        entry: u32,
        exit: u32,
        walk: Option<(StationId, Minutes)>,
    },
}

/// A leg of a reconstructed journey, in travel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsaLeg {
    Trip {
        /// Connection indices from boarding to alighting.
        connections: Vec<u32>,
    },
    Walk {
        from: StationId,
        to: StationId,
        departure: Time,
        arrival: Time,
    },
}

/// A journey found by a connection scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsaJourney {
    pub departure: Time,
    pub arrival: Time,
    pub transfers: u32,
    pub legs: Vec<CsaLeg>,
}

impl CsaJourney {
    pub fn trip_count(&self) -> usize {
        self.legs
            .iter()
            .filter(|l| matches!(l, CsaLeg::Trip { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
enum WalkOrigin {
    Start,
    Trip { entry: u32, exit: u32 },
}

/// A connection scan from one or more start points.
pub struct CsaSearch<'a> {
    tt: &'a CsaTimetable,
    dir: Direction,
    starts: Vec<StartPoint>,
    fixed_departure: bool,
    is_target: Vec<bool>,
    arrival_time: Vec<Vec<TransferArray<Time>>>,
    pointers: Vec<Vec<TransferArray<Option<ArrivalPointer>>>>,
    trip_reachable: Vec<Vec<TransferArray<Option<u32>>>>,
    best_arrival: Vec<TransferArray<Time>>,
    needed_time: Vec<TransferArray<Minutes>>,
    target_arrival: Vec<TransferArray<Time>>,
    target_pointer: Vec<TransferArray<Option<(StationId, ArrivalPointer)>>>,
}

impl<'a> CsaSearch<'a> {
    pub fn new(tt: &'a CsaTimetable, dir: Direction) -> Self {
        Self {
            tt,
            dir,
            starts: Vec::new(),
            fixed_departure: false,
            is_target: vec![false; tt.stations.len()],
            arrival_time: Vec::new(),
            pointers: Vec::new(),
            trip_reachable: Vec::new(),
            best_arrival: Vec::new(),
            needed_time: Vec::new(),
            target_arrival: Vec::new(),
            target_pointer: Vec::new(),
        }
    }

    /// Register a start point. Returns its index.
    pub fn add_start(&mut self, station: StationId, time: Time) -> usize {
        self.starts.push(StartPoint { station, time });
        self.starts.len() - 1
    }

    /// Only board the first trip at exactly the start time (plus the walk to
    /// its station). Pretrip queries use this so that each departure event
    /// yields journeys departing at that event.
    pub fn fix_departure(&mut self) {
        self.fixed_departure = true;
    }

    pub fn add_target(&mut self, station: StationId) {
        if let Some(t) = self.is_target.get_mut(station.index()) {
            *t = true;
        }
    }

    pub fn starts(&self) -> &[StartPoint] {
        &self.starts
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Run the scan for all registered starts.
    pub fn search(&mut self) {
        let tt = self.tt;
        let dir = self.dir;
        let station_count = tt.stations.len();
        let start_count = self.starts.len();
        let worst = dir.worst_time();

        self.arrival_time = vec![vec![[worst; MAX_TRANSFERS + 1]; start_count]; station_count];
        self.pointers = vec![vec![[None; MAX_TRANSFERS + 1]; start_count]; station_count];
        self.trip_reachable = vec![vec![[None; MAX_TRANSFERS + 1]; start_count]; tt.trip_count()];
        self.best_arrival = vec![[worst; MAX_TRANSFERS + 1]; station_count];
        self.needed_time = vec![[Minutes::MAX; MAX_TRANSFERS + 1]; station_count];
        self.target_arrival = vec![[worst; MAX_TRANSFERS + 1]; start_count];
        self.target_pointer = vec![[None; MAX_TRANSFERS + 1]; start_count];

        if start_count == 0 {
            return;
        }

        for i in 0..start_count {
            let StartPoint { station, time } = self.starts[i];
            let s = station.index();
            if s >= station_count {
                continue;
            }
            self.arrival_time[s][i][0] = time;
            self.pointers[s][i][0] = Some(ArrivalPointer::Start);
            self.needed_time[s][0] = 0;
            if dir.is_better(time, self.best_arrival[s][0]) {
                self.best_arrival[s][0] = time;
            }
            if self.is_target[s] && dir.is_better(time, self.target_arrival[i][0]) {
                self.target_arrival[i][0] = time;
                self.target_pointer[i][0] = Some((station, ArrivalPointer::Start));
            }
            self.expand_footpaths(station, time, 0, i, WalkOrigin::Start);
        }

        let time_limits: Vec<Time> = self
            .starts
            .iter()
            .map(|s| dir.advance(s.time, MAX_TRAVEL_TIME))
            .collect();
        let first_start = self
            .starts
            .iter()
            .map(|s| s.time)
            .reduce(|a, b| if dir.is_better(b, a) { b } else { a })
            .unwrap_or(0);
        let overall_limit = time_limits
            .iter()
            .copied()
            .reduce(|a, b| if dir.is_better(a, b) { b } else { a })
            .unwrap_or(first_start);

        let mut scanned = 0usize;
        for pos in tt.first_connection(dir, first_start)..tt.connections.len() {
            let idx = tt.scan_index(dir, pos);
            let event = tt.scan_time(dir, idx);
            if dir.is_better(overall_limit, event) {
                break;
            }
            scanned += 1;
            for i in 0..start_count {
                if dir.is_better(time_limits[i], event) {
                    continue;
                }
                self.scan_connection(idx, i);
            }
        }

        tracing::trace!(
            direction = %dir,
            starts = start_count,
            scanned,
            "connection scan finished"
        );
    }

    fn scan_connection(&mut self, idx: u32, i: usize) {
        let dir = self.dir;
        let tt = self.tt;
        let con = &tt.connections[idx as usize];
        let (board_station, alight_station, board_time, alight_time, can_board, can_alight) =
            match dir {
                Direction::Forward => (
                    con.from,
                    con.to,
                    con.departure,
                    con.arrival,
                    con.from_in_allowed,
                    con.to_out_allowed,
                ),
                Direction::Backward => (
                    con.to,
                    con.from,
                    con.arrival,
                    con.departure,
                    con.to_out_allowed,
                    con.from_in_allowed,
                ),
            };
        let trip = con.trip.index();

        // level k counts trips; riding this connection reaches level k + 1
        for k in 0..MAX_TRANSFERS {
            let via_trip = self.trip_reachable[trip][i][k];
            let ready = self.arrival_time[board_station.index()][i][k];
            let via_station = can_board
                && if self.fixed_departure && k == 0 {
                    board_time == ready
                } else {
                    !dir.is_better(board_time, ready)
                };
            let entry = match via_trip {
                Some(entry) => entry,
                None if via_station => {
                    self.trip_reachable[trip][i][k] = Some(idx);
                    idx
                }
                None => continue,
            };
            if !can_alight {
                continue;
            }
            let exit = idx;
            let level = k + 1;
            let a = alight_station.index();

            if dir.is_better(alight_time, self.arrival_time[a][i][level]) {
                self.expand_footpaths(
                    alight_station,
                    alight_time,
                    level,
                    i,
                    WalkOrigin::Trip { entry, exit },
                );
            }
            if self.is_target[a] && dir.is_better(alight_time, self.target_arrival[i][level]) {
                self.target_arrival[i][level] = alight_time;
                self.target_pointer[i][level] = Some((
                    alight_station,
                    ArrivalPointer::Trip {
                        entry,
                        exit,
                        walk: None,
                    },
                ));
            }
        }
    }

    fn expand_footpaths(
        &mut self,
        station: StationId,
        time: Time,
        level: usize,
        i: usize,
        origin: WalkOrigin,
    ) {
        let dir = self.dir;
        let tt = self.tt;
        let footpaths: &[CsaFootpath] = match dir {
            Direction::Forward => &tt.stations[station.index()].footpaths,
            Direction::Backward => &tt.stations[station.index()].incoming_footpaths,
        };
        let start_time = self.starts[i].time;

        for fp in footpaths {
            let to = match dir {
                Direction::Forward => fp.to,
                Direction::Backward => fp.from,
            };
            let t = to.index();
            let fp_arrival = dir.advance(time, fp.duration);
            let diff = dir.elapsed(start_time, fp_arrival);
            let own_loop = to == station;

            let pointer = match origin {
                WalkOrigin::Start if own_loop => ArrivalPointer::Start,
                WalkOrigin::Start => ArrivalPointer::StartWalk {
                    from: station,
                    duration: fp.duration,
                },
                WalkOrigin::Trip { entry, exit } => ArrivalPointer::Trip {
                    entry,
                    exit,
                    walk: (!own_loop).then_some((station, fp.duration)),
                },
            };

            if !own_loop
                && self.is_target[t]
                && dir.is_better(fp_arrival, self.target_arrival[i][level])
            {
                self.target_arrival[i][level] = fp_arrival;
                self.target_pointer[i][level] = Some((to, pointer));
            }

            if dir.is_better(self.best_arrival[t][level], fp_arrival)
                && diff > self.needed_time[t][level]
            {
                continue;
            }
            if dir.is_better(fp_arrival, self.arrival_time[t][i][level]) {
                self.arrival_time[t][i][level] = fp_arrival;
                self.pointers[t][i][level] = Some(pointer);
            }
            if diff < self.needed_time[t][level] {
                self.needed_time[t][level] = diff;
                self.best_arrival[t][level] = fp_arrival;
            }
        }
    }

    /// Ready times at `station` for start `i`, per number of trips.
    pub fn arrival_time(&self, station: StationId, i: usize) -> Option<&TransferArray<Time>> {
        self.arrival_time.get(station.index())?.get(i)
    }

    /// Minimal time needed from any start to `station`, per number of trips.
    pub fn needed_time(&self, station: StationId) -> Option<&TransferArray<Minutes>> {
        self.needed_time.get(station.index())
    }

    /// Raw arrival times at the targets for start `i`, per number of trips.
    pub fn target_arrival(&self, i: usize) -> Option<&TransferArray<Time>> {
        self.target_arrival.get(i)
    }

    /// Rebuild the journey reaching a target from start `i` with `trips`
    /// trips.
    pub fn reconstruct(&self, i: usize, trips: usize) -> Option<CsaJourney> {
        let tt = self.tt;
        let dir = self.dir;
        let (mut station, mut pointer) = (*self.target_pointer.get(i)?.get(trips)?)?;
        let mut level = trips;

        // legs in search order
        let mut raw: Vec<RawLeg> = Vec::new();
        loop {
            match pointer {
                ArrivalPointer::Start => break,
                ArrivalPointer::StartWalk { from, duration } => {
                    raw.push(RawLeg::Walk {
                        reached_from: from,
                        reached: station,
                        duration,
                    });
                    break;
                }
                ArrivalPointer::Trip { entry, exit, walk } => {
                    let entry_con = &tt.connections[entry as usize];
                    if let Some((from, duration)) = walk {
                        raw.push(RawLeg::Walk {
                            reached_from: from,
                            reached: station,
                            duration,
                        });
                    }
                    raw.push(RawLeg::Trip { entry, exit });
                    station = match dir {
                        Direction::Forward => entry_con.from,
                        Direction::Backward => entry_con.to,
                    };
                    level = level.checked_sub(1)?;
                    pointer = (*self.pointers.get(station.index())?.get(i)?.get(level)?)?;
                }
            }
        }
        if level != 0 {
            // a start walk or the start itself was found above level zero
            return None;
        }

        if dir.is_forward() {
            raw.reverse();
        }
        Some(self.assemble(i, raw))
    }

    fn assemble(&self, i: usize, raw: Vec<RawLeg>) -> CsaJourney {
        let tt = self.tt;
        let dir = self.dir;
        let start_time = self.starts[i].time;

        let mut legs: Vec<CsaLeg> = Vec::with_capacity(raw.len());
        for leg in &raw {
            match *leg {
                RawLeg::Trip { entry, exit } => {
                    let (board, alight) = match dir {
                        Direction::Forward => (entry, exit),
                        Direction::Backward => (exit, entry),
                    };
                    legs.push(CsaLeg::Trip {
                        connections: trip_segment(tt, board, alight),
                    });
                }
                RawLeg::Walk {
                    reached_from,
                    reached,
                    duration,
                } => {
                    let (from, to) = match dir {
                        Direction::Forward => (reached_from, reached),
                        Direction::Backward => (reached, reached_from),
                    };
                    legs.push(CsaLeg::Walk {
                        from,
                        to,
                        departure: 0,
                        arrival: duration,
                    });
                }
            }
        }

        // place the walks in time
        match dir {
            Direction::Forward => {
                let mut t = start_time;
                for leg in legs.iter_mut() {
                    match leg {
                        CsaLeg::Trip { connections } => {
                            if let Some(last) = connections.last() {
                                t = tt.connections[*last as usize].arrival;
                            }
                        }
                        CsaLeg::Walk {
                            departure, arrival, ..
                        } => {
                            let duration = *arrival - *departure;
                            *departure = t;
                            *arrival = t + duration;
                            t = *arrival;
                        }
                    }
                }
            }
            Direction::Backward => {
                let mut t = start_time;
                for leg in legs.iter_mut().rev() {
                    match leg {
                        CsaLeg::Trip { connections } => {
                            if let Some(first) = connections.first() {
                                t = tt.connections[*first as usize].departure;
                            }
                        }
                        CsaLeg::Walk {
                            departure, arrival, ..
                        } => {
                            let duration = *arrival - *departure;
                            *arrival = t;
                            *departure = t - duration;
                            t = *departure;
                        }
                    }
                }
            }
        }

        let departure = legs
            .first()
            .map(|l| leg_departure(tt, l))
            .unwrap_or(start_time);
        let arrival = legs
            .last()
            .map(|l| leg_arrival(tt, l))
            .unwrap_or(start_time);
        let trips = legs
            .iter()
            .filter(|l| matches!(l, CsaLeg::Trip { .. }))
            .count() as u32;

        CsaJourney {
            departure,
            arrival,
            transfers: trips.saturating_sub(1),
            legs,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RawLeg {
    Trip {
        entry: u32,
        exit: u32,
    },
    /// Walk found while scanning: `reached` was reached from `reached_from`.
    Walk {
        reached_from: StationId,
        reached: StationId,
        duration: Minutes,
    },
}

/// Connection indices of a trip between two of its connections, inclusive.
fn trip_segment(tt: &CsaTimetable, board: u32, alight: u32) -> Vec<u32> {
    let trip = tt.connections[board as usize].trip;
    let all = &tt.trip_connections[trip.index()];
    let first = all.iter().position(|c| *c == board);
    let last = all.iter().position(|c| *c == alight);
    match (first, last) {
        (Some(f), Some(l)) if f <= l => all[f..=l].to_vec(),
        _ => vec![board, alight],
    }
}

pub(crate) fn leg_departure(tt: &CsaTimetable, leg: &CsaLeg) -> Time {
    match leg {
        CsaLeg::Trip { connections } => connections
            .first()
            .map(|c| tt.connections[*c as usize].departure)
            .unwrap_or(0),
        CsaLeg::Walk { departure, .. } => *departure,
    }
}

pub(crate) fn leg_arrival(tt: &CsaTimetable, leg: &CsaLeg) -> Time {
    match leg {
        CsaLeg::Trip { connections } => connections
            .last()
            .map(|c| tt.connections[*c as usize].arrival)
            .unwrap_or(0),
        CsaLeg::Walk { arrival, .. } => *arrival,
    }
}
