//! Journey types.
//!
//! A `Journey` represents a complete trip from origin to destination,
//! made of trip legs and walks between stations.

use serde::Serialize;

use super::{DomainError, Minutes, ServiceClass, StationId, Time};

/// A stop of a trip leg. The boarding stop has no arrival, the alighting
/// stop no departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegStop {
    pub station: StationId,
    pub arrival: Option<Time>,
    pub departure: Option<Time>,
}

/// A leg of a journey (one trip).
///
/// # Invariants
///
/// - At least two stops (boarding and alighting)
/// - Departure time exists at the boarding stop
/// - Arrival time exists at the alighting stop
/// - Times never decrease along the stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leg {
    trip_name: String,
    class: ServiceClass,
    stops: Vec<LegStop>,
    departure: Time,
    arrival: Time,
}

impl Leg {
    /// Construct a leg, validating its stops.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than two stops are given, the boarding or
    /// alighting time is missing, or times run backwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::{Leg, LegStop, ServiceClass, StationId};
    ///
    /// let leg = Leg::new(
    ///     "RE 4711".into(),
    ///     ServiceClass::Re,
    ///     vec![
    ///         LegStop { station: StationId(0), arrival: None, departure: Some(600) },
    ///         LegStop { station: StationId(1), arrival: Some(625), departure: None },
    ///     ],
    /// )
    /// .unwrap();
    /// assert_eq!(leg.duration(), 25);
    /// ```
    pub fn new(trip_name: String, class: ServiceClass, stops: Vec<LegStop>) -> Result<Self, DomainError> {
        if stops.len() < 2 {
            return Err(DomainError::InvalidLeg("needs a boarding and an alighting stop"));
        }
        let departure = stops[0]
            .departure
            .ok_or(DomainError::InvalidLeg("missing boarding departure"))?;
        let arrival = stops[stops.len() - 1]
            .arrival
            .ok_or(DomainError::InvalidLeg("missing alighting arrival"))?;

        let times: Vec<Time> = stops
            .iter()
            .flat_map(|s| s.arrival.into_iter().chain(s.departure))
            .collect();
        if times.windows(2).any(|w| w[0] > w[1]) {
            return Err(DomainError::InvalidLeg("times must not decrease"));
        }

        Ok(Self {
            trip_name,
            class,
            stops,
            departure,
            arrival,
        })
    }

    pub fn trip_name(&self) -> &str {
        &self.trip_name
    }

    pub fn class(&self) -> ServiceClass {
        self.class
    }

    /// All stops from boarding to alighting.
    pub fn stops(&self) -> &[LegStop] {
        &self.stops
    }

    pub fn board_station(&self) -> StationId {
        self.stops[0].station
    }

    pub fn alight_station(&self) -> StationId {
        self.stops[self.stops.len() - 1].station
    }

    pub fn departure_time(&self) -> Time {
        self.departure
    }

    pub fn arrival_time(&self) -> Time {
        self.arrival
    }

    pub fn duration(&self) -> Minutes {
        self.arrival - self.departure
    }
}

/// A walk between nearby stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Walk {
    pub from: StationId,
    pub to: StationId,
    pub departure: Time,
    pub arrival: Time,
}

impl Walk {
    pub fn new(from: StationId, to: StationId, departure: Time, arrival: Time) -> Self {
        Self {
            from,
            to,
            departure,
            arrival,
        }
    }

    pub fn duration(&self) -> Minutes {
        self.arrival - self.departure
    }
}

/// A segment of a journey: either a trip leg or a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Trip(Leg),
    Walk(Walk),
}

impl Segment {
    pub fn origin(&self) -> StationId {
        match self {
            Segment::Trip(leg) => leg.board_station(),
            Segment::Walk(walk) => walk.from,
        }
    }

    pub fn destination(&self) -> StationId {
        match self {
            Segment::Trip(leg) => leg.alight_station(),
            Segment::Walk(walk) => walk.to,
        }
    }

    pub fn departure_time(&self) -> Time {
        match self {
            Segment::Trip(leg) => leg.departure_time(),
            Segment::Walk(walk) => walk.departure,
        }
    }

    pub fn arrival_time(&self) -> Time {
        match self {
            Segment::Trip(leg) => leg.arrival_time(),
            Segment::Walk(walk) => walk.arrival,
        }
    }

    pub fn is_trip(&self) -> bool {
        matches!(self, Segment::Trip(_))
    }

    pub fn is_walk(&self) -> bool {
        matches!(self, Segment::Walk(_))
    }

    pub fn as_leg(&self) -> Option<&Leg> {
        match self {
            Segment::Trip(leg) => Some(leg),
            Segment::Walk(_) => None,
        }
    }

    pub fn as_walk(&self) -> Option<&Walk> {
        match self {
            Segment::Trip(_) => None,
            Segment::Walk(walk) => Some(walk),
        }
    }
}

/// Criteria values of a journey as computed by the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JourneyCriteria {
    pub travel_time: Minutes,
    pub transfers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_occupancy: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_time: Option<Minutes>,
}

/// A complete journey from origin to destination.
///
/// # Invariants
///
/// - At least one segment
/// - Consecutive segments connect (destination of one = origin of next)
/// - No segment departs before its predecessor arrives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Journey {
    segments: Vec<Segment>,
    criteria: JourneyCriteria,
}

impl Journey {
    /// Constructs a journey from segments in travel order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the list is empty, consecutive segments do not meet
    /// at the same station, or a segment departs before the previous one
    /// arrives.
    pub fn new(segments: Vec<Segment>) -> Result<Self, DomainError> {
        if segments.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        for window in segments.windows(2) {
            let prev_dest = window[0].destination();
            let next_origin = window[1].origin();
            if prev_dest != next_origin {
                return Err(DomainError::StationsNotConnected(prev_dest, next_origin));
            }
            let arrival = window[0].arrival_time();
            let departure = window[1].departure_time();
            if departure < arrival {
                return Err(DomainError::TimeTravel { arrival, departure });
            }
        }

        let trips = segments.iter().filter(|s| s.is_trip()).count() as u32;
        let criteria = JourneyCriteria {
            travel_time: segments[segments.len() - 1].arrival_time() - segments[0].departure_time(),
            transfers: trips.saturating_sub(1),
            ..JourneyCriteria::default()
        };
        Ok(Journey { segments, criteria })
    }

    /// Replace the criteria computed from the segments with the values
    /// reported by the search.
    pub fn with_criteria(mut self, criteria: JourneyCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn criteria(&self) -> &JourneyCriteria {
        &self.criteria
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of trip legs (excluding walks).
    pub fn leg_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_trip()).count()
    }

    /// Returns the number of changes (legs - 1, or 0 for direct).
    pub fn change_count(&self) -> usize {
        self.leg_count().saturating_sub(1)
    }

    pub fn legs(&self) -> impl Iterator<Item = &Leg> {
        self.segments.iter().filter_map(|s| s.as_leg())
    }

    pub fn walks(&self) -> impl Iterator<Item = &Walk> {
        self.segments.iter().filter_map(|s| s.as_walk())
    }

    pub fn origin(&self) -> StationId {
        self.segments[0].origin()
    }

    pub fn destination(&self) -> StationId {
        self.segments[self.segments.len() - 1].destination()
    }

    pub fn departure_time(&self) -> Time {
        self.segments[0].departure_time()
    }

    pub fn arrival_time(&self) -> Time {
        self.segments[self.segments.len() - 1].arrival_time()
    }

    pub fn total_duration(&self) -> Minutes {
        self.arrival_time() - self.departure_time()
    }

    pub fn total_walk_duration(&self) -> Minutes {
        self.walks().map(Walk::duration).sum()
    }

    pub fn is_direct(&self) -> bool {
        self.leg_count() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: u32) -> StationId {
        StationId(i)
    }

    fn leg(from: u32, to: u32, dep: Time, arr: Time) -> Leg {
        Leg::new(
            format!("T{from}{to}"),
            ServiceClass::Re,
            vec![
                LegStop {
                    station: s(from),
                    arrival: None,
                    departure: Some(dep),
                },
                LegStop {
                    station: s(to),
                    arrival: Some(arr),
                    departure: None,
                },
            ],
        )
        .unwrap()
    }

    // Leg tests

    #[test]
    fn leg_accessors() {
        let leg = leg(0, 1, 600, 625);
        assert_eq!(leg.board_station(), s(0));
        assert_eq!(leg.alight_station(), s(1));
        assert_eq!(leg.departure_time(), 600);
        assert_eq!(leg.arrival_time(), 625);
        assert_eq!(leg.duration(), 25);
        assert_eq!(leg.trip_name(), "T01");
    }

    #[test]
    fn leg_rejects_bad_stops() {
        let one = vec![LegStop {
            station: s(0),
            arrival: None,
            departure: Some(600),
        }];
        assert!(Leg::new("X".into(), ServiceClass::Re, one).is_err());

        let backwards = vec![
            LegStop {
                station: s(0),
                arrival: None,
                departure: Some(600),
            },
            LegStop {
                station: s(1),
                arrival: Some(590),
                departure: None,
            },
        ];
        assert_eq!(
            Leg::new("X".into(), ServiceClass::Re, backwards),
            Err(DomainError::InvalidLeg("times must not decrease"))
        );

        let missing = vec![
            LegStop {
                station: s(0),
                arrival: None,
                departure: None,
            },
            LegStop {
                station: s(1),
                arrival: Some(620),
                departure: None,
            },
        ];
        assert!(Leg::new("X".into(), ServiceClass::Re, missing).is_err());
    }

    // Segment tests

    #[test]
    fn segment_walk() {
        let segment = Segment::Walk(Walk::new(s(1), s(2), 630, 635));
        assert!(segment.is_walk());
        assert!(!segment.is_trip());
        assert!(segment.as_leg().is_none());
        assert_eq!(segment.origin(), s(1));
        assert_eq!(segment.destination(), s(2));
        assert_eq!(segment.as_walk().map(Walk::duration), Some(5));
    }

    // Journey tests

    #[test]
    fn journey_single_leg() {
        let journey = Journey::new(vec![Segment::Trip(leg(0, 1, 600, 625))]).unwrap();

        assert_eq!(journey.segment_count(), 1);
        assert_eq!(journey.leg_count(), 1);
        assert_eq!(journey.change_count(), 0);
        assert!(journey.is_direct());
        assert_eq!(journey.origin(), s(0));
        assert_eq!(journey.destination(), s(1));
        assert_eq!(journey.total_duration(), 25);
        assert_eq!(journey.criteria().transfers, 0);
    }

    #[test]
    fn journey_with_walk_between_legs() {
        let journey = Journey::new(vec![
            Segment::Trip(leg(0, 1, 600, 625)),
            Segment::Walk(Walk::new(s(1), s(2), 625, 630)),
            Segment::Trip(leg(2, 3, 640, 700)),
        ])
        .unwrap();

        assert_eq!(journey.leg_count(), 2);
        assert_eq!(journey.change_count(), 1);
        assert_eq!(journey.total_walk_duration(), 5);
        assert_eq!(journey.criteria().travel_time, 100);
        assert_eq!(journey.walks().count(), 1);
    }

    #[test]
    fn journey_rejects_gaps() {
        let err = Journey::new(vec![
            Segment::Trip(leg(0, 1, 600, 625)),
            Segment::Trip(leg(2, 3, 640, 700)),
        ])
        .unwrap_err();
        assert_eq!(err, DomainError::StationsNotConnected(s(1), s(2)));

        let err = Journey::new(vec![
            Segment::Trip(leg(0, 1, 600, 625)),
            Segment::Trip(leg(1, 3, 620, 700)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::TimeTravel {
                arrival: 625,
                departure: 620
            }
        );

        assert_eq!(Journey::new(vec![]), Err(DomainError::EmptyJourney));
    }

    #[test]
    fn criteria_can_be_replaced() {
        let journey = Journey::new(vec![Segment::Trip(leg(0, 1, 600, 625))])
            .unwrap()
            .with_criteria(JourneyCriteria {
                travel_time: 25,
                transfers: 0,
                price: Some(1200),
                ..JourneyCriteria::default()
            });
        assert_eq!(journey.criteria().price, Some(1200));
    }
}
