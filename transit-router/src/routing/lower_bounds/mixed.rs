use std::time::Instant;

use crate::network::NodeId;

use super::{
    ConstGraphLowerBounds, CsaLowerBounds, CsaTimetables, LowerBounds, LowerBoundsQuery,
    LowerBoundsResult, elapsed_ms,
};

/// Travel times from the connection scan, transfers from the constant
/// interchange graph.
pub struct MixedLowerBounds<'a> {
    csa: CsaLowerBounds<'a>,
    cg: ConstGraphLowerBounds<'a>,
}

impl<'a> MixedLowerBounds<'a> {
    pub fn new(query: &'a LowerBoundsQuery<'a>, timetables: &'a CsaTimetables) -> Self {
        Self {
            csa: CsaLowerBounds::new(query, timetables),
            cg: ConstGraphLowerBounds::new(query),
        }
    }
}

impl LowerBounds for MixedLowerBounds<'_> {
    fn calculate(&mut self) -> LowerBoundsResult {
        let total = Instant::now();
        let csa = self.csa.calculate();
        if !csa.target_reachable {
            return LowerBoundsResult {
                total_ms: elapsed_ms(total),
                ..csa
            };
        }
        let cg = self.cg.calculate();
        LowerBoundsResult {
            target_reachable: cg.target_reachable,
            travel_time_ms: csa.travel_time_ms,
            transfers_ms: cg.transfers_ms,
            total_ms: elapsed_ms(total),
            ..LowerBoundsResult::default()
        }
    }

    fn time_from_node(&self, node: NodeId) -> u32 {
        self.csa.time_from_node(node)
    }

    fn transfers_from_node(&self, node: NodeId) -> u32 {
        self.cg.transfers_from_node(node)
    }
}
