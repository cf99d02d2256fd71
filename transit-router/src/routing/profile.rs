//! Search profiles.
//!
//! A profile is the ordered list of criteria a search optimises. It composes
//! the per-criterion comparisons into label dominance, result dominance and
//! the queue order.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, JourneyCriteria, Minutes};
use crate::network::EdgeCost;

use super::criteria::{
    Criterion, CriterionKind, MAX_PRICE_BUCKET, MAX_PRICE_WAGE_BUCKET, MAX_TRAVEL_TIME,
};
use super::error::RoutingError;
use super::label::{Label, LabelContext};

/// Named criteria combinations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Travel time and transfers.
    #[default]
    Default,
    SingleCriterion,
    Price,
    PriceRegio,
    PriceWage,
    PriceWageRegio,
    /// Highest occupancy.
    Occupancy,
    OccupancySum,
    /// Summed occupancy, free once seated until the next transfer.
    OccupancySit,
    PriceOccupancy,
    WaitingTime,
    Custom(Vec<CriterionKind>),
}

impl SearchType {
    pub fn criteria(&self) -> Vec<CriterionKind> {
        use CriterionKind as K;
        match self {
            SearchType::Default => vec![K::TravelTime, K::Transfers],
            SearchType::SingleCriterion => vec![K::TravelTime],
            SearchType::Price => vec![K::TravelTime, K::Transfers, K::Price],
            SearchType::PriceRegio => vec![K::TravelTime, K::Transfers, K::PriceRegio],
            SearchType::PriceWage => vec![K::TravelTime, K::Transfers, K::PriceWage],
            SearchType::PriceWageRegio => vec![K::TravelTime, K::Transfers, K::PriceWageRegio],
            SearchType::Occupancy => vec![K::TravelTime, K::Transfers, K::Occupancy],
            SearchType::OccupancySum => vec![K::TravelTime, K::Transfers, K::OccupancySum],
            SearchType::OccupancySit => vec![K::TravelTime, K::Transfers, K::OccupancySit],
            SearchType::PriceOccupancy => {
                vec![K::TravelTime, K::Transfers, K::Price, K::Occupancy]
            }
            SearchType::WaitingTime => vec![K::TravelTime, K::Transfers, K::WaitingTime],
            SearchType::Custom(kinds) => kinds.clone(),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchType::Default => "default",
            SearchType::SingleCriterion => "single_criterion",
            SearchType::Price => "price",
            SearchType::PriceRegio => "price_regio",
            SearchType::PriceWage => "price_wage",
            SearchType::PriceWageRegio => "price_wage_regio",
            SearchType::Occupancy => "occupancy",
            SearchType::OccupancySum => "occupancy_sum",
            SearchType::OccupancySit => "occupancy_sit",
            SearchType::PriceOccupancy => "price_occupancy",
            SearchType::WaitingTime => "waiting_time",
            SearchType::Custom(kinds) => {
                let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                return write!(f, "custom({})", names.join(","));
            }
        };
        write!(f, "{name}")
    }
}

/// What the Dial queue buckets labels by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucketing {
    TravelTime,
    Price,
    PriceWage,
}

#[derive(Debug)]
pub struct Profile {
    search_type: SearchType,
    dir: Direction,
    kinds: Vec<CriterionKind>,
    criteria: Vec<Box<dyn Criterion>>,
    bucketing: Bucketing,
}

impl Profile {
    /// Assemble the criteria of `search_type` for a search in `dir`.
    ///
    /// # Errors
    ///
    /// Price criteria only support forward search. Custom lists must be
    /// non-empty, start with travel time and name each family once.
    pub fn new(search_type: &SearchType, dir: Direction) -> Result<Self, RoutingError> {
        let kinds = search_type.criteria();
        validate(&kinds)?;
        if !dir.is_forward() && kinds.iter().any(|k| k.is_price()) {
            return Err(RoutingError::UnsupportedSearchType {
                search_type: search_type.to_string(),
                direction: dir,
            });
        }

        let bucketing = match search_type {
            SearchType::Price | SearchType::PriceRegio => Bucketing::Price,
            SearchType::PriceWage | SearchType::PriceWageRegio => Bucketing::PriceWage,
            _ => Bucketing::TravelTime,
        };
        let criteria = kinds.iter().map(|k| k.build(dir)).collect();

        Ok(Self {
            search_type: search_type.clone(),
            dir,
            kinds,
            criteria,
            bucketing,
        })
    }

    pub fn search_type(&self) -> &SearchType {
        &self.search_type
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn kinds(&self) -> &[CriterionKind] {
        &self.kinds
    }

    pub fn has(&self, family: &str) -> bool {
        self.kinds.iter().any(|k| k.family() == family)
    }

    pub fn init(&self, label: &mut Label, ctx: &LabelContext<'_>) {
        for c in &self.criteria {
            c.init(label, ctx);
        }
    }

    pub fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>) {
        for c in &self.criteria {
            c.update(label, cost, ctx);
        }
    }

    pub fn is_filtered(&self, label: &Label) -> bool {
        self.criteria.iter().any(|c| c.is_filtered(label))
    }

    /// `a` dominates `b`: comparable, never worse, and better on at least
    /// one criterion.
    pub fn dominates(&self, a: &Label, b: &Label) -> bool {
        if a.incomparable(b, self.dir) {
            return false;
        }
        let mut could_dominate = false;
        for c in &self.criteria {
            let d = c.dominates(a, b);
            if d.greater {
                return false;
            }
            could_dominate |= d.smaller;
        }
        could_dominate
    }

    /// An accepted result dominates a label still in the search.
    pub fn result_dominates(&self, result: &Label, label: &Label, merge: Option<&Label>) -> bool {
        let mut could_dominate = false;
        for c in &self.criteria {
            let d = c.result_dominates(result, label, merge);
            if d.greater {
                return false;
            }
            could_dominate |= d.smaller;
        }
        could_dominate
    }

    pub fn merge_with_optimal_result(&self, original: &Label, result: &Label) -> Label {
        let mut merged = *original;
        for c in &self.criteria {
            c.merge_with_optimal_result(original, result, &mut merged);
        }
        merged
    }

    pub fn is_on_optimal_journey(&self, label: &Label) -> bool {
        self.criteria.iter().any(|c| c.is_on_optimal_journey(label))
    }

    pub fn transfer_optimality(&self, from: &Label, to: &mut Label) {
        for c in &self.criteria {
            c.transfer_optimality(from, to);
        }
        if self.is_on_optimal_journey(from) {
            to.optimal_journeys = to.optimal_journeys.union(from.optimal_journeys);
        }
    }

    /// Whether `label` can still end up in the result set.
    ///
    /// Only results starting at the same time are considered. A label that
    /// merged with one of the optimal results and is not dominated by any
    /// result survives. If optimal results exist and no merge survives, the
    /// label is dropped. Without optimal results plain result dominance
    /// decides.
    pub fn may_be_in_result_set(&self, label: &Label, results: &[&Label]) -> bool {
        if self.is_on_optimal_journey(label) {
            return true;
        }

        let begin = label.current_begin(self.dir);
        let comparable: Vec<&Label> = results
            .iter()
            .copied()
            .filter(|r| r.current_begin(self.dir) == begin)
            .collect();

        let mut optimals_exist = false;
        for optimal in comparable.iter().filter(|r| self.is_on_optimal_journey(r)) {
            optimals_exist = true;
            let merged = self.merge_with_optimal_result(label, optimal);
            if !comparable
                .iter()
                .any(|r| self.result_dominates(r, &merged, Some(optimal)))
            {
                return true;
            }
        }
        if optimals_exist {
            return false;
        }

        !comparable
            .iter()
            .any(|r| self.result_dominates(r, label, None))
    }

    /// Lexicographic order on the criteria's sort keys.
    pub fn less(&self, a: &Label, b: &Label) -> bool {
        for c in &self.criteria {
            let (ka, kb) = (c.sort_key(a), c.sort_key(b));
            if ka != kb {
                return ka < kb;
            }
        }
        false
    }

    pub fn bucket(&self, label: &Label) -> usize {
        let v = &label.values;
        let bucket = match self.bucketing {
            Bucketing::TravelTime => v.travel_time_lb,
            Bucketing::Price => v.price.total_lb.min(MAX_PRICE_BUCKET),
            Bucketing::PriceWage => (v.price.time_included_lb >> 3).min(MAX_PRICE_WAGE_BUCKET),
        };
        bucket as usize
    }

    pub fn max_bucket(&self) -> usize {
        let max = match self.bucketing {
            Bucketing::TravelTime => MAX_TRAVEL_TIME,
            Bucketing::Price => MAX_PRICE_BUCKET,
            Bucketing::PriceWage => MAX_PRICE_WAGE_BUCKET,
        };
        max as usize
    }

    /// Dominance between finished journeys: departs no earlier, arrives no
    /// later, no worse on any other criterion, and strictly better somewhere.
    pub fn dominates_post_search(&self, a: &Label, b: &Label) -> bool {
        let (a_dep, a_arr) = (a.departure(self.dir), a.arrival(self.dir));
        let (b_dep, b_arr) = (b.departure(self.dir), b.arrival(self.dir));
        if a_dep < b_dep || a_arr > b_arr {
            return false;
        }
        let mut strict = a_dep > b_dep || a_arr < b_arr;
        for c in self.criteria.iter().filter(|c| c.kind() != CriterionKind::TravelTime) {
            let (ka, kb) = (c.sort_key(a), c.sort_key(b));
            if ka > kb {
                return false;
            }
            strict |= ka < kb;
        }
        strict
    }

    /// Criteria values of a terminal label as reported to callers.
    pub fn summary(&self, label: &Label) -> JourneyCriteria {
        let v = &label.values;
        let occupancy = self.has("occupancy");
        JourneyCriteria {
            travel_time: v.travel_time as Minutes,
            transfers: v.transfers,
            price: self.has("price").then_some(v.price.total),
            occupancy: occupancy.then_some(v.occupancy),
            max_occupancy: occupancy.then_some(v.max_occupancy),
            waiting_time: self.has("waiting_time").then_some(v.waiting_time as Minutes),
        }
    }
}

fn validate(kinds: &[CriterionKind]) -> Result<(), RoutingError> {
    match kinds.first() {
        None => {
            return Err(RoutingError::UnsupportedCriteria("no criteria given".into()));
        }
        Some(CriterionKind::TravelTime) => {}
        Some(first) => {
            return Err(RoutingError::UnsupportedCriteria(format!(
                "criteria must start with travel_time, not {first}"
            )));
        }
    }
    let mut families = HashSet::new();
    for kind in kinds {
        if !families.insert(kind.family()) {
            return Err(RoutingError::UnsupportedCriteria(format!(
                "{kind} repeats the {} criterion",
                kind.family()
            )));
        }
    }
    Ok(())
}
