//! Ticket price.
//!
//! Fares are summed per fare bracket. Long distance brackets charge a
//! one-off supplement when first used: 600 for IC, 700 for ICE, or 100 for
//! an ICE after an IC. The sum of the trip fares is capped at
//! [`MAX_PRICE`]; prices of query edges are added on top.
//!
//! The wage variant also charges [`MINUTELY_WAGE`] per minute of travel and
//! compares that time-included price instead.

use crate::domain::FareBracket;
use crate::network::EdgeCost;

use super::{Criterion, CriterionKind, Domination};
use crate::routing::label::{Label, LabelContext};

/// Ceiling of the regional fare when the regional cap is enabled.
pub const MAX_REGIONAL_TICKET_PRICE: u32 = 4200;
pub const MINUTELY_WAGE: u32 = 8;
pub const MAX_PRICE: u32 = 14000;
pub const MAX_PRICE_BUCKET: u32 = MAX_PRICE + 1000;
pub const MAX_PRICE_WAGE_BUCKET: u32 = (MAX_PRICE + 1440 * MINUTELY_WAGE) >> 3;

const IC_SUPPLEMENT: u32 = 600;
const ICE_SUPPLEMENT: u32 = 700;
const ICE_AFTER_IC_SUPPLEMENT: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialPrices {
    pub local: u32,
    pub regional: u32,
    pub ic: u32,
    pub ice: u32,
    pub other: u32,
    /// Prices of non-trip edges.
    pub additional: u32,
}

impl PartialPrices {
    fn trip_sum(&self) -> u32 {
        self.local + self.regional + self.ic + self.ice + self.other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceValues {
    pub total: u32,
    pub total_lb: u32,
    pub time_included: u32,
    pub time_included_lb: u32,
    pub partial: PartialPrices,
    /// An IC supplement was paid.
    pub ic: bool,
    /// An ICE supplement was paid.
    pub ice: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Price {
    wage: bool,
    regional_cap: bool,
}

impl Price {
    pub fn new(wage: bool, regional_cap: bool) -> Self {
        Self { wage, regional_cap }
    }

    pub fn is_wage(&self) -> bool {
        self.wage
    }

    fn remaining_bound(&self, label: &Label, ctx: &LabelContext<'_>) -> u32 {
        let lb = ctx.bounds.price_from_node(label.node);
        if self.regional_cap {
            lb.min(MAX_REGIONAL_TICKET_PRICE.saturating_sub(label.values.price.partial.regional))
        } else {
            lb
        }
    }

    fn charge(&self, price: &mut PriceValues, bracket: FareBracket, fare: u32) {
        let partial = &mut price.partial;
        match bracket {
            FareBracket::Ice => {
                if partial.ice == 0 {
                    price.ice = true;
                    price.ic = true;
                    let supplement = if partial.ic != 0 {
                        ICE_AFTER_IC_SUPPLEMENT
                    } else {
                        ICE_SUPPLEMENT
                    };
                    partial.ice += supplement + fare;
                } else {
                    partial.ice += fare;
                }
            }
            FareBracket::Ic => {
                if partial.ic == 0 {
                    price.ic = true;
                    partial.ic += if partial.ice != 0 { fare } else { IC_SUPPLEMENT + fare };
                } else {
                    partial.ic += fare;
                }
            }
            FareBracket::Regional => {
                partial.regional += fare;
                if self.regional_cap {
                    partial.regional = partial.regional.min(MAX_REGIONAL_TICKET_PRICE);
                }
            }
            FareBracket::Local => partial.local += fare,
            FareBracket::Other => partial.other += fare,
        }
    }

    /// Supplement `b` has already paid that `a` may still have to pay.
    fn pending_supplement(a: &PriceValues, b: &PriceValues) -> u32 {
        if a.ice {
            return 0;
        }
        if b.ice {
            return if a.ic {
                ICE_AFTER_IC_SUPPLEMENT
            } else {
                ICE_SUPPLEMENT
            };
        }
        if b.ic && !a.ic {
            return IC_SUPPLEMENT;
        }
        0
    }

    fn slack(&self, a: &PriceValues, b: &PriceValues) -> u32 {
        let mut slack = Self::pending_supplement(a, b);
        if self.regional_cap {
            slack += b.partial.regional.saturating_sub(a.partial.regional);
        }
        slack
    }

    fn compare(&self, a: &Label, b: &Label, with_slack: bool) -> Domination {
        let pa = &a.values.price;
        let pb = &b.values.price;
        let slack = if with_slack { self.slack(pa, pb) } else { 0 };

        if !self.wage {
            let a_price = (pa.total_lb + slack).min(MAX_PRICE + pa.partial.additional);
            return Domination::compare(a_price, pb.total_lb);
        }

        let slack = slack.min(MAX_PRICE.saturating_sub(pa.total_lb));
        let mut a_price = pa.time_included_lb + slack;
        if with_slack && b.now > a.now {
            // `a` may have to wait until `b`'s time
            a_price += (b.now - a.now) as u32 * MINUTELY_WAGE;
        }
        Domination::compare(a_price, pb.time_included_lb)
    }
}

impl Criterion for Price {
    fn kind(&self) -> CriterionKind {
        match (self.wage, self.regional_cap) {
            (false, false) => CriterionKind::Price,
            (false, true) => CriterionKind::PriceRegio,
            (true, false) => CriterionKind::PriceWage,
            (true, true) => CriterionKind::PriceWageRegio,
        }
    }

    fn init(&self, label: &mut Label, ctx: &LabelContext<'_>) {
        let remaining = self.remaining_bound(label, ctx);
        let time_lb = ctx.bounds.time_from_node(label.node);
        let price = &mut label.values.price;
        *price = PriceValues::default();
        price.total_lb = remaining;
        price.time_included_lb = remaining.saturating_add(time_lb.saturating_mul(MINUTELY_WAGE));
    }

    fn update(&self, label: &mut Label, cost: &EdgeCost, ctx: &LabelContext<'_>) {
        match cost.connection.and_then(|c| ctx.graph.connection(c)) {
            Some(con) => {
                let fare = u32::from(con.price);
                self.charge(&mut label.values.price, con.class.fare_bracket(), fare);
            }
            None => label.values.price.partial.additional += u32::from(cost.price),
        }

        let remaining = self.remaining_bound(label, ctx);
        let travel_time = label.values.travel_time;
        let travel_time_lb = label.values.travel_time_lb;
        let price = &mut label.values.price;
        let sum = price.partial.trip_sum();
        let additional = price.partial.additional;
        price.total = sum.min(MAX_PRICE) + additional;
        price.total_lb = (sum + remaining).min(MAX_PRICE) + additional;
        price.time_included = price.total + travel_time * MINUTELY_WAGE;
        price.time_included_lb = price
            .total_lb
            .saturating_add(travel_time_lb.saturating_mul(MINUTELY_WAGE));
    }

    fn dominates(&self, a: &Label, b: &Label) -> Domination {
        self.compare(a, b, true)
    }

    fn result_dominates(&self, result: &Label, label: &Label, _merge: Option<&Label>) -> Domination {
        self.compare(result, label, false)
    }

    fn sort_key(&self, label: &Label) -> u32 {
        if self.wage {
            label.values.price.time_included_lb
        } else {
            label.values.price.total_lb
        }
    }
}
