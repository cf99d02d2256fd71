//! Station types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Minutes;

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code: {reason}")]
pub struct InvalidStationCode {
    reason: &'static str,
}

/// A station code as used in timetable files.
///
/// Codes are 1 to 16 characters of ASCII letters, digits, `_` or `-`.
///
/// # Examples
///
/// ```
/// use transit_router::domain::StationCode;
///
/// let code = StationCode::parse("FFM_HBF").unwrap();
/// assert_eq!(code.as_str(), "FFM_HBF");
///
/// assert!(StationCode::parse("").is_err());
/// assert!(StationCode::parse("has space").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationCode(String);

impl StationCode {
    /// Parse a station code from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        if s.is_empty() || s.len() > 16 {
            return Err(InvalidStationCode {
                reason: "must be 1-16 characters",
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(InvalidStationCode {
                reason: "must be ASCII letters, digits, '_' or '-'",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.0)
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense index of a station inside a loaded schedule.
///
/// Station `i` is always represented by graph node `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationId(pub u32);

impl StationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A station of the schedule.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub code: StationCode,
    pub name: String,
    /// Minimum time to change trains at this station.
    pub transfer_time: Minutes,
    pub lat: f64,
    pub lng: f64,
    /// Stations treated as the same place when meta stations are requested.
    pub equivalent: Vec<StationId>,
}

impl Station {
    /// Great-circle distance to another station in kilometres.
    pub fn distance_km(&self, other: &Station) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(lat: f64, lng: f64) -> Station {
        Station {
            id: StationId(0),
            code: StationCode::parse("X").unwrap(),
            name: "X".into(),
            transfer_time: 2,
            lat,
            lng,
            equivalent: Vec::new(),
        }
    }

    #[test]
    fn distance_between_frankfurt_and_mainz() {
        let ffm = station(50.1071, 8.6636);
        let mainz = station(50.0012, 8.2587);
        let d = ffm.distance_km(&mainz);
        assert!((d - 31.0).abs() < 1.5, "distance was {d}");
        assert_eq!(ffm.distance_km(&ffm), 0.0);
    }

    #[test]
    fn code_display() {
        let code = StationCode::parse("DA-HBF").unwrap();
        assert_eq!(code.to_string(), "DA-HBF");
        assert_eq!(format!("{code:?}"), "StationCode(DA-HBF)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in "[A-Za-z0-9_-]{1,16}") {
            let code = StationCode::parse(&s).unwrap();
            prop_assert_eq!(code.as_str(), s.as_str());
        }

        /// Over-long codes are always rejected
        #[test]
        fn too_long_rejected(s in "[A-Z]{17,30}") {
            prop_assert!(StationCode::parse(&s).is_err());
        }

        /// Whitespace and punctuation are rejected
        #[test]
        fn punctuation_rejected(s in "[A-Z]{0,4}[ .:/][A-Z]{0,4}") {
            prop_assert!(StationCode::parse(&s).is_err());
        }

        /// Distances are symmetric
        #[test]
        fn distance_symmetric(
            a in (-80.0f64..80.0, -179.0f64..179.0),
            b in (-80.0f64..80.0, -179.0f64..179.0),
        ) {
            let mut s1 = Station {
                id: StationId(0),
                code: StationCode::parse("A").unwrap(),
                name: String::new(),
                transfer_time: 0,
                lat: a.0,
                lng: a.1,
                equivalent: Vec::new(),
            };
            let mut s2 = s1.clone();
            s2.lat = b.0;
            s2.lng = b.1;
            s1.id = StationId(1);
            let d1 = s1.distance_km(&s2);
            let d2 = s2.distance_km(&s1);
            prop_assert!((d1 - d2).abs() < 1e-6);
            prop_assert!(d1 >= 0.0);
        }
    }
}
