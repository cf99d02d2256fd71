//! Ordering of search results.
//!
//! The label search returns results in the order they were found, which
//! depends on the queue. Responses list them by departure instead.

use std::cmp::Ordering;

use crate::domain::Journey;

fn rank_key(journey: &Journey) -> (i32, i32, usize, i32) {
    (
        journey.departure_time(),
        journey.arrival_time(),
        journey.change_count(),
        journey.total_duration(),
    )
}

/// Sort journeys by departure, then arrival, then changes, then duration.
///
/// The sort is stable: journeys equal on all four keep their order.
pub fn rank_journeys(mut journeys: Vec<Journey>) -> Vec<Journey> {
    journeys.sort_by(|a, b| compare(a, b));
    journeys
}

fn compare(a: &Journey, b: &Journey) -> Ordering {
    rank_key(a).cmp(&rank_key(b))
}

/// Drop journeys identical to an earlier one.
///
/// Two results can describe the same journey when equivalent labels reach
/// the goal through different start events.
pub fn deduplicate(journeys: Vec<Journey>) -> Vec<Journey> {
    let mut result: Vec<Journey> = Vec::with_capacity(journeys.len());
    for journey in journeys {
        if !result.contains(&journey) {
            result.push(journey);
        }
    }
    result
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{Leg, LegStop, Segment, ServiceClass, StationId, Time};
    use proptest::prelude::*;

    fn stop(station: u32, arrival: Option<Time>, departure: Option<Time>) -> LegStop {
        LegStop {
            station: StationId(station),
            arrival,
            departure,
        }
    }

    fn direct(id: u32, dep: Time, duration: Time) -> Journey {
        let leg = Leg::new(
            format!("RE {id}"),
            ServiceClass::Re,
            vec![stop(0, None, Some(dep)), stop(1, Some(dep + duration), None)],
        )
        .unwrap();
        Journey::new(vec![Segment::Trip(leg)]).unwrap()
    }

    fn with_change(id: u32, dep: Time, first: Time, wait: Time, second: Time) -> Journey {
        let change_at = dep + first;
        let leg1 = Leg::new(
            format!("RE {id}a"),
            ServiceClass::Re,
            vec![stop(0, None, Some(dep)), stop(2, Some(change_at), None)],
        )
        .unwrap();
        let leg2 = Leg::new(
            format!("RE {id}b"),
            ServiceClass::Rb,
            vec![
                stop(2, None, Some(change_at + wait)),
                stop(1, Some(change_at + wait + second), None),
            ],
        )
        .unwrap();
        Journey::new(vec![Segment::Trip(leg1), Segment::Trip(leg2)]).unwrap()
    }

    fn journey_strategy() -> impl Strategy<Value = Journey> {
        prop_oneof![
            (0u32..20, 300i32..1200, 10i32..120).prop_map(|(id, dep, dur)| direct(id, dep, dur)),
            (0u32..20, 300i32..1200, 10i32..60, 0i32..30, 10i32..60)
                .prop_map(|(id, dep, a, w, b)| with_change(id, dep, a, w, b)),
        ]
    }

    fn journeys_strategy() -> impl Strategy<Value = Vec<Journey>> {
        prop::collection::vec(journey_strategy(), 0..15)
    }

    // ========== rank_journeys properties ==========

    proptest! {
        #[test]
        fn rank_journeys_is_sorted(journeys in journeys_strategy()) {
            let ranked = rank_journeys(journeys);

            for window in ranked.windows(2) {
                let a = rank_key(&window[0]);
                let b = rank_key(&window[1]);
                prop_assert!(a <= b, "Not sorted: {:?} should come before {:?}", a, b);
            }
        }

        #[test]
        fn rank_journeys_preserves_elements(journeys in journeys_strategy()) {
            let original_len = journeys.len();
            let ranked = rank_journeys(journeys);

            prop_assert_eq!(ranked.len(), original_len);
        }
    }

    // ========== deduplicate properties ==========

    proptest! {
        #[test]
        fn deduplicate_leaves_no_equal_pair(journeys in journeys_strategy()) {
            let result = deduplicate(journeys);

            for (i, a) in result.iter().enumerate() {
                for b in &result[i + 1..] {
                    prop_assert_ne!(a, b);
                }
            }
        }

        #[test]
        fn deduplicate_keeps_every_distinct_journey(journeys in journeys_strategy()) {
            let result = deduplicate(journeys.clone());

            prop_assert!(result.len() <= journeys.len());
            for journey in &journeys {
                prop_assert!(result.contains(journey));
            }
        }

        #[test]
        fn deduplicate_is_idempotent(journeys in journeys_strategy()) {
            let once = deduplicate(journeys);
            let twice = deduplicate(once.clone());

            prop_assert_eq!(once, twice);
        }
    }
}
