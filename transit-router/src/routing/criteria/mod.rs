//! Optimisation criteria.
//!
//! Every criterion owns a slice of [`CriteriaValues`](super::label::CriteriaValues)
//! and knows how to initialise it at a start label, update it along an edge
//! and compare two labels on it. A [`Profile`](super::profile::Profile)
//! chains criteria in a fixed order.

mod occupancy;
mod price;
mod transfers;
mod travel_time;
mod waiting_time;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::network::EdgeCost;

use super::label::{Label, LabelContext};

pub use occupancy::{Occupancy, OccupancyMode};
pub use price::{
    MAX_PRICE, MAX_PRICE_BUCKET, MAX_PRICE_WAGE_BUCKET, MAX_REGIONAL_TICKET_PRICE, MINUTELY_WAGE,
    PartialPrices, Price, PriceValues,
};
pub use transfers::{MAX_TRANSFERS, Transfers};
pub use travel_time::{MAX_TRAVEL_TIME, TravelTime};
pub use waiting_time::{MAX_NEGLECTED_WAITING_TIME, MAX_WAITING_TIME, WaitingTime};

/// Sentinel stored in a lower-bound field when the bound is unknown.
pub const INVALID_BOUND: u32 = u32::MAX;

/// Outcome of comparing label `a` against label `b` on one criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Domination {
    /// `a` is strictly worse.
    pub greater: bool,
    /// `a` is strictly better.
    pub smaller: bool,
}

impl Domination {
    pub fn compare<T: PartialOrd>(a: T, b: T) -> Self {
        Self {
            greater: a > b,
            smaller: a < b,
        }
    }
}

/// Criteria a custom profile can be assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    TravelTime,
    Transfers,
    Price,
    PriceRegio,
    PriceWage,
    PriceWageRegio,
    Occupancy,
    OccupancySum,
    OccupancySit,
    WaitingTime,
}

impl CriterionKind {
    /// Kinds of the same family fill the same label fields and cannot be
    /// combined.
    pub fn family(self) -> &'static str {
        match self {
            CriterionKind::TravelTime => "travel_time",
            CriterionKind::Transfers => "transfers",
            CriterionKind::Price
            | CriterionKind::PriceRegio
            | CriterionKind::PriceWage
            | CriterionKind::PriceWageRegio => "price",
            CriterionKind::Occupancy | CriterionKind::OccupancySum | CriterionKind::OccupancySit => {
                "occupancy"
            }
            CriterionKind::WaitingTime => "waiting_time",
        }
    }

    pub fn is_price(self) -> bool {
        self.family() == "price"
    }

    pub fn build(self, dir: Direction) -> Box<dyn Criterion> {
        match self {
            CriterionKind::TravelTime => Box::new(TravelTime),
            CriterionKind::Transfers => Box::new(Transfers),
            CriterionKind::Price => Box::new(Price::new(false, false)),
            CriterionKind::PriceRegio => Box::new(Price::new(false, true)),
            CriterionKind::PriceWage => Box::new(Price::new(true, false)),
            CriterionKind::PriceWageRegio => Box::new(Price::new(true, true)),
            CriterionKind::Occupancy => Box::new(Occupancy::new(OccupancyMode::Max, false)),
            CriterionKind::OccupancySum => Box::new(Occupancy::new(OccupancyMode::Sum, false)),
            CriterionKind::OccupancySit => Box::new(Occupancy::new(OccupancyMode::Sum, true)),
            CriterionKind::WaitingTime => Box::new(WaitingTime::new(dir)),
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CriterionKind::TravelTime => "travel_time",
            CriterionKind::Transfers => "transfers",
            CriterionKind::Price => "price",
            CriterionKind::PriceRegio => "price_regio",
            CriterionKind::PriceWage => "price_wage",
            CriterionKind::PriceWageRegio => "price_wage_regio",
            CriterionKind::Occupancy => "occupancy",
            CriterionKind::OccupancySum => "occupancy_sum",
            CriterionKind::OccupancySit => "occupancy_sit",
            CriterionKind::WaitingTime => "waiting_time",
        };
        write!(f, "{s}")
    }
}

/// One optimisation criterion.
///
/// `dominates(a, b)` reports whether `a` is worse or better than `b` on this
/// criterion only. Whether `a` dominates `b` overall is decided by the
/// profile.
pub trait Criterion: fmt::Debug + Send + Sync {
    fn kind(&self) -> CriterionKind;

    /// Set the criterion's fields of a start label.
    fn init(&self, label: &mut Label, ctx: &LabelContext<'_>);

    /// Account for traversing an edge. `label` already carries the new node,
    /// time and connection.
    fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>);

    fn dominates(&self, a: &Label, b: &Label) -> Domination;

    /// Compare an accepted result against a label still in the search.
    /// `merge` is the optimal result the label was merged with, if any.
    fn result_dominates(&self, result: &Label, label: &Label, merge: Option<&Label>) -> Domination {
        let _ = merge;
        self.dominates(result, label)
    }

    /// Combine a label with an optimal result before checking whether the
    /// label can still contribute.
    fn merge_with_optimal_result(&self, original: &Label, result: &Label, merged: &mut Label) {
        let _ = (original, result, merged);
    }

    fn is_filtered(&self, label: &Label) -> bool {
        let _ = label;
        false
    }

    fn is_on_optimal_journey(&self, label: &Label) -> bool {
        let _ = label;
        false
    }

    /// Hand the optimality flags of `from` to `to`.
    fn transfer_optimality(&self, from: &Label, to: &mut Label) {
        let _ = (from, to);
    }

    /// Key used to order labels. Smaller is better.
    fn sort_key(&self, label: &Label) -> u32;
}
