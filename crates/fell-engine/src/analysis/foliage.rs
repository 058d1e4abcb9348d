//! Foliage discovery.
//!
//! A bucket queue keyed by expected distance from the doomed trunk. Face
//! and edge hops cost one, corner hops two. Foliage touching the trunk is
//! always claimed; foliage further out is claimed only when the distance
//! the world recorded for it matches the distance along this search, so
//! leaves kept alive by a neighbouring tree are left alone.

use std::collections::VecDeque;

use fell_core::{Adjacency, Offset, VoxelPos, NEIGHBOURS_26};

use super::visit::{Visit, VisitKind};
use super::{Engine, Phase, StepContext};

/// A foliage-search entry waiting to be probed.
#[derive(Clone, Copy, Debug)]
pub(super) struct FoliageStep {
    pos: VoxelPos,
    expected: u8,
    adjacent: bool,
}

fn step_cost(offset: Offset) -> u8 {
    match offset.adjacency() {
        Adjacency::Corner => 2,
        Adjacency::Face | Adjacency::Edge => 1,
    }
}

impl Engine {
    pub(super) fn seed_foliage(&mut self, ctx: &StepContext<'_>) {
        let max = ctx.config.foliage.max_search_distance;
        if self.buckets.len() <= max as usize {
            self.buckets.resize_with(max as usize + 1, VecDeque::new);
        }
        for i in 0..self.trunk.len() {
            let trunk = self.trunk[i];
            for offset in NEIGHBOURS_26 {
                let expected = step_cost(offset);
                self.push_foliage(ctx, trunk.offset(offset), expected, true);
            }
        }
    }

    fn push_foliage(
        &mut self,
        ctx: &StepContext<'_>,
        pos: VoxelPos,
        expected: u8,
        adjacent: bool,
    ) {
        if expected > ctx.config.foliage.max_search_distance
            || self.doomed.contains(&pos)
            || self.foliage_seen.contains_key(&pos)
            || !ctx.config.search_range.contains(pos.relative_to(self.origin))
        {
            return;
        }
        self.buckets[expected as usize].push_back(FoliageStep {
            pos,
            expected,
            adjacent,
        });
    }

    fn pop_foliage(&mut self) -> Option<FoliageStep> {
        self.buckets.iter_mut().find_map(|b| b.pop_front())
    }

    pub(super) fn foliage_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        let config = ctx.config;
        while self.has_time(ctx) {
            if self.foliage.len() >= config.foliage.max_voxels {
                return self.begin_destruction(ctx);
            }
            let Some(next) = self.pop_foliage() else {
                return self.begin_destruction(ctx);
            };
            if self.foliage_seen.contains_key(&next.pos) {
                continue;
            }
            self.units += 1;

            let decay = ctx.world.foliage(next.pos);
            let included = decay.is_some_and(|d| {
                next.adjacent || d.distance == d.max_distance.min(next.expected)
            });
            let kind = if included {
                VisitKind::Foliage
            } else {
                VisitKind::Ignored
            };
            self.foliage_seen
                .insert(next.pos, Visit::new(next.pos, next.expected, kind));
            let Some(decay) = decay.filter(|_| included) else {
                continue;
            };

            self.foliage.push(next.pos);
            self.mass.add(
                next.pos.relative_to(self.origin),
                config.fall.foliage_weight,
            );
            if next.expected >= decay.max_distance {
                continue;
            }
            for offset in NEIGHBOURS_26 {
                let expected = next.expected.saturating_add(step_cost(offset));
                self.push_foliage(ctx, next.pos.offset(offset), expected, false);
            }
        }
        Phase::FoliageSearch
    }
}
