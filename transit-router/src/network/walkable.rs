//! Walkable connections between stations.
//!
//! Stations close enough to walk between are linked by footpaths. The graph
//! builder turns them into foot and after-train edges, the CSA timetable into
//! footpath adjacency lists.

use std::collections::BTreeMap;

use crate::domain::{Minutes, StationId};

/// A collection of footpaths between stations.
///
/// Footpaths added with [`Footpaths::add`] are symmetric: if you can walk
/// from A to B, you can walk from B to A in the same time.
#[derive(Debug, Clone, Default)]
pub struct Footpaths {
    /// Map from (from, to) to walk duration in minutes. Ordered so that
    /// graph construction is deterministic.
    paths: BTreeMap<(StationId, StationId), Minutes>,
}

impl Footpaths {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a walkable connection in both directions.
    ///
    /// A shorter duration replaces a longer one already stored.
    pub fn add(&mut self, from: StationId, to: StationId, duration: Minutes) {
        self.add_directed(from, to, duration);
        self.add_directed(to, from, duration);
    }

    /// Add a one-way footpath.
    pub fn add_directed(&mut self, from: StationId, to: StationId, duration: Minutes) {
        if from == to {
            return;
        }
        self.paths
            .entry((from, to))
            .and_modify(|d| *d = (*d).min(duration))
            .or_insert(duration);
    }

    /// Get the walk duration between two stations, if walkable.
    pub fn get(&self, from: StationId, to: StationId) -> Option<Minutes> {
        self.paths.get(&(from, to)).copied()
    }

    /// Check if two stations are walkable.
    pub fn is_walkable(&self, from: StationId, to: StationId) -> bool {
        self.paths.contains_key(&(from, to))
    }

    /// All stations walkable from a given station.
    pub fn walkable_from(&self, from: StationId) -> Vec<(StationId, Minutes)> {
        self.paths
            .range((from, StationId(0))..=(from, StationId(u32::MAX)))
            .map(|((_, to), d)| (*to, *d))
            .collect()
    }

    /// All stations with a footpath into `to`.
    pub fn walkable_to(&self, to: StationId) -> Vec<(StationId, Minutes)> {
        self.paths
            .iter()
            .filter(|((_, t), _)| *t == to)
            .map(|((f, _), d)| (*f, *d))
            .collect()
    }

    /// Iterate over every directed footpath.
    pub fn iter(&self) -> impl Iterator<Item = (StationId, StationId, Minutes)> + '_ {
        self.paths.iter().map(|((f, t), d)| (*f, *t, *d))
    }

    /// Returns the number of directed footpaths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if there are no footpaths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Builder for creating footpaths.
///
/// Provides a fluent API for adding connections.
#[derive(Debug, Default)]
pub struct FootpathsBuilder {
    inner: Footpaths,
}

impl FootpathsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symmetric footpath.
    pub fn add(mut self, from: u32, to: u32, duration: Minutes) -> Self {
        self.inner.add(StationId(from), StationId(to), duration);
        self
    }

    /// Add a one-way footpath.
    pub fn add_directed(mut self, from: u32, to: u32, duration: Minutes) -> Self {
        self.inner
            .add_directed(StationId(from), StationId(to), duration);
        self
    }

    /// Build the footpaths.
    pub fn build(self) -> Footpaths {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: u32) -> StationId {
        StationId(i)
    }

    #[test]
    fn symmetric_connection() {
        let mut paths = Footpaths::new();
        paths.add(s(0), s(1), 5);

        assert_eq!(paths.get(s(0), s(1)), Some(5));
        assert_eq!(paths.get(s(1), s(0)), Some(5));
        assert!(paths.is_walkable(s(1), s(0)));
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn directed_connection() {
        let paths = FootpathsBuilder::new().add_directed(0, 1, 7).build();
        assert_eq!(paths.get(s(0), s(1)), Some(7));
        assert_eq!(paths.get(s(1), s(0)), None);
    }

    #[test]
    fn shorter_duration_wins() {
        let paths = FootpathsBuilder::new().add(0, 1, 9).add(1, 0, 4).build();
        assert_eq!(paths.get(s(0), s(1)), Some(4));
    }

    #[test]
    fn self_loops_ignored() {
        let paths = FootpathsBuilder::new().add(3, 3, 1).build();
        assert!(paths.is_empty());
    }

    #[test]
    fn walkable_from_and_to() {
        let paths = FootpathsBuilder::new()
            .add(0, 1, 5)
            .add(0, 2, 8)
            .add_directed(3, 1, 2)
            .build();

        assert_eq!(paths.walkable_from(s(0)), vec![(s(1), 5), (s(2), 8)]);
        assert_eq!(paths.walkable_to(s(1)), vec![(s(0), 5), (s(3), 2)]);
        assert!(paths.walkable_from(s(9)).is_empty());
    }
}
