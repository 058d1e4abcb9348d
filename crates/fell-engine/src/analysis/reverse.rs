//! Reverse pruning from support candidates.
//!
//! Diagonal trunk that leans on a candidate along a path that never
//! reverses its vertical direction is considered held up and is spared.
//! Direct trunk is never spared: it was reached without corner hops, so a
//! solid voxel under any of it would already have stopped the forward
//! search.

use fell_core::{VoxelPos, NEIGHBOURS_26};
use log::trace;

use super::visit::{Sense, VisitKind};
use super::{Engine, Phase, StepContext};

impl Engine {
    pub(super) fn seed_reverse(&mut self) {
        for i in 0..self.candidates.len() {
            let anchor = self.candidates[i].above();
            if self.is_diagonal_trunk(anchor) {
                self.enqueue_reverse(anchor, Sense::Anchor);
            }
        }
    }

    pub(super) fn reverse_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        while self.has_time(ctx) {
            let Some((pos, sense)) = self.reverse.pop_front() else {
                return self.reverse_done();
            };
            self.units += 1;
            for offset in NEIGHBOURS_26 {
                let Some(next) = sense.hop(offset.dy) else {
                    continue;
                };
                let child = pos.offset(offset);
                if self.is_diagonal_trunk(child) {
                    self.enqueue_reverse(child, next);
                }
            }
        }
        Phase::ReverseSearch
    }

    fn is_diagonal_trunk(&self, pos: VoxelPos) -> bool {
        self.visited
            .get(&pos)
            .is_some_and(|v| v.kind == VisitKind::TrunkDiagonal)
    }

    fn enqueue_reverse(&mut self, pos: VoxelPos, sense: Sense) {
        let seen = self.senses.entry(pos).or_insert(0);
        if *seen & sense.dominated_by() != 0 {
            return;
        }
        *seen |= sense.bit();
        self.reverse.push_back((pos, sense));
    }

    fn reverse_done(&mut self) -> Phase {
        for pos in self.senses.keys() {
            if let Some(v) = self.visited.get_mut(pos) {
                v.kind = VisitKind::Ignored;
            }
        }
        trace!(
            "job at {}: {} diagonal trunk saved by {} candidates",
            self.origin,
            self.senses.len(),
            self.candidates.len()
        );
        Phase::Limit
    }
}
