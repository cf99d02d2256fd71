//! Connection arrays for the connection scan.

use crate::domain::{Direction, Minutes, ServiceClass, StationId, Time};
use crate::network::{EdgeKind, EdgeType, Schedule, TripId};

/// A single trip movement between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsaConnection {
    pub from: StationId,
    pub to: StationId,
    pub departure: Time,
    pub arrival: Time,
    pub trip: TripId,
    pub class: ServiceClass,
    pub price: u16,
    /// Passengers may board at `from`.
    pub from_in_allowed: bool,
    /// Passengers may alight at `to`.
    pub to_out_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsaFootpath {
    pub from: StationId,
    pub to: StationId,
    pub duration: Minutes,
}

#[derive(Debug, Clone)]
pub struct CsaStation {
    pub id: StationId,
    pub transfer_time: Minutes,
    /// Outgoing footpaths, including the loop to itself that costs the
    /// transfer time.
    pub footpaths: Vec<CsaFootpath>,
    /// Incoming footpaths for backward scans, including the loop.
    pub incoming_footpaths: Vec<CsaFootpath>,
}

/// Timetable for connection scans.
///
/// `connections` is sorted by departure. Backward scans walk it through
/// `bwd_order`, which is sorted by arrival, latest first.
#[derive(Debug, Clone)]
pub struct CsaTimetable {
    pub stations: Vec<CsaStation>,
    pub connections: Vec<CsaConnection>,
    pub bwd_order: Vec<u32>,
    /// Connection indices of every trip in travel order.
    pub trip_connections: Vec<Vec<u32>>,
}

impl CsaTimetable {
    /// Build the timetable from a schedule.
    ///
    /// With `ignore_restrictions`, boarding and alighting are allowed at
    /// every stop. Lower bounds use that variant so restricted stations are
    /// never reported unreachable.
    pub fn build(schedule: &Schedule, ignore_restrictions: bool) -> Self {
        let graph = &schedule.graph;

        let mut stations: Vec<CsaStation> = graph
            .stations
            .iter()
            .map(|s| {
                let own = CsaFootpath {
                    from: s.id,
                    to: s.id,
                    duration: s.transfer_time,
                };
                CsaStation {
                    id: s.id,
                    transfer_time: s.transfer_time,
                    footpaths: vec![own],
                    incoming_footpaths: vec![own],
                }
            })
            .collect();
        for (from, to, duration) in schedule.footpaths.iter() {
            let fp = CsaFootpath { from, to, duration };
            stations[from.index()].footpaths.push(fp);
            stations[to.index()].incoming_footpaths.push(fp);
        }

        let has_edge = |edges: &[crate::network::EdgeId], ty: EdgeType| {
            edges.iter().any(|e| graph.edge(*e).edge_type() == ty)
        };

        let mut connections = Vec::new();
        for edge in &graph.edges {
            let EdgeKind::Route { connections: route_cons } = &edge.kind else {
                continue;
            };
            let from_node = graph.node(edge.from);
            let to_node = graph.node(edge.to);
            let from_in_allowed =
                ignore_restrictions || has_edge(&from_node.incoming, EdgeType::Enter);
            let to_out_allowed = ignore_restrictions || has_edge(&to_node.edges, EdgeType::Exit);
            for con in route_cons {
                connections.push(CsaConnection {
                    from: from_node.station,
                    to: to_node.station,
                    departure: con.departure,
                    arrival: con.arrival,
                    trip: con.trip,
                    class: con.class,
                    price: con.price,
                    from_in_allowed,
                    to_out_allowed,
                });
            }
        }
        connections.sort_by_key(|c| (c.departure, c.arrival, c.trip));

        let mut bwd_order: Vec<u32> = (0..connections.len() as u32).collect();
        bwd_order.sort_by_key(|i| {
            let c = &connections[*i as usize];
            (std::cmp::Reverse(c.arrival), std::cmp::Reverse(c.departure), c.trip)
        });

        let mut trip_connections = vec![Vec::new(); graph.trip_count as usize];
        for (idx, con) in connections.iter().enumerate() {
            trip_connections[con.trip.index()].push(idx as u32);
        }

        tracing::debug!(
            connections = connections.len(),
            stations = stations.len(),
            ignore_restrictions,
            "built CSA timetable"
        );

        Self {
            stations,
            connections,
            bwd_order,
            trip_connections,
        }
    }

    pub fn trip_count(&self) -> usize {
        self.trip_connections.len()
    }

    /// Index into `connections` of the `pos`-th connection in scan order.
    pub fn scan_index(&self, dir: Direction, pos: usize) -> u32 {
        match dir {
            Direction::Forward => pos as u32,
            Direction::Backward => self.bwd_order[pos],
        }
    }

    /// First scan position that can be used from `time`.
    pub fn first_connection(&self, dir: Direction, time: Time) -> usize {
        match dir {
            Direction::Forward => self.connections.partition_point(|c| c.departure < time),
            Direction::Backward => self
                .bwd_order
                .partition_point(|i| self.connections[*i as usize].arrival > time),
        }
    }

    /// Time a scan in `dir` meets the connection at: its departure when
    /// scanning forward, its arrival when scanning backward.
    pub fn scan_time(&self, dir: Direction, idx: u32) -> Time {
        let con = &self.connections[idx as usize];
        match dir {
            Direction::Forward => con.departure,
            Direction::Backward => con.arrival,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule::from_json_str(
            r#"{
            "schedule_begin": "2024-03-15T00:00",
            "stations": [
                {"code": "A", "transfer_time": 3},
                {"code": "B", "transfer_time": 4},
                {"code": "C", "transfer_time": 5}
            ],
            "footpaths": [{"from": "B", "to": "C", "duration": 7, "symmetric": false}],
            "trips": [
                {"id": "T1", "class": "ic", "stops": [
                    {"station": "A", "departure": "09:00"},
                    {"station": "B", "arrival": "09:30", "departure": "09:32", "board": false},
                    {"station": "C", "arrival": "10:00"}
                ]},
                {"id": "T2", "class": "re", "stops": [
                    {"station": "A", "departure": "08:00"},
                    {"station": "C", "arrival": "08:50"}
                ]}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn connections_sorted_in_both_orders() {
        let tt = CsaTimetable::build(&schedule(), false);
        assert_eq!(tt.connections.len(), 3);
        let deps: Vec<Time> = tt.connections.iter().map(|c| c.departure).collect();
        assert_eq!(deps, vec![480, 540, 572]);

        let arrs: Vec<Time> = tt
            .bwd_order
            .iter()
            .map(|i| tt.connections[*i as usize].arrival)
            .collect();
        assert_eq!(arrs, vec![600, 570, 530]);
    }

    #[test]
    fn first_connection_binary_search() {
        let tt = CsaTimetable::build(&schedule(), false);
        assert_eq!(tt.first_connection(Direction::Forward, 500), 1);
        assert_eq!(tt.first_connection(Direction::Forward, 700), 3);
        assert_eq!(tt.first_connection(Direction::Backward, 580), 1);
        assert_eq!(tt.scan_time(Direction::Backward, tt.scan_index(Direction::Backward, 1)), 570);
    }

    #[test]
    fn restrictions_and_their_override() {
        let schedule = schedule();
        let strict = CsaTimetable::build(&schedule, false);
        let b_to_c = strict.connections.iter().find(|c| c.departure == 572).unwrap();
        assert!(!b_to_c.from_in_allowed);
        assert!(b_to_c.to_out_allowed);

        let relaxed = CsaTimetable::build(&schedule, true);
        assert!(relaxed.connections.iter().all(|c| c.from_in_allowed && c.to_out_allowed));
    }

    #[test]
    fn footpaths_include_transfer_loops() {
        let tt = CsaTimetable::build(&schedule(), false);
        let b = &tt.stations[1];
        assert_eq!(b.footpaths.len(), 2);
        assert_eq!(b.footpaths[0].duration, 4);
        let c = &tt.stations[2];
        assert_eq!(c.incoming_footpaths.len(), 2);
        assert_eq!(c.incoming_footpaths[1].from, StationId(1));
    }

    #[test]
    fn trip_connections_in_travel_order() {
        let tt = CsaTimetable::build(&schedule(), false);
        let t1 = &tt.trip_connections[0];
        assert_eq!(t1.len(), 2);
        assert!(tt.connections[t1[0] as usize].departure < tt.connections[t1[1] as usize].departure);
    }
}
