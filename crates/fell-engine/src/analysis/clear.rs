//! Breaking voxels in place and handing out their drops.

use fell_core::{DropBatch, ItemId, ItemStack};
use indexmap::IndexMap;
use log::debug;
use smallvec::SmallVec;

use super::{Engine, JobOutcome, Phase, StepContext};

impl Engine {
    pub(super) fn clear_trunk_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        while self.has_time(ctx) {
            let Some(&pos) = self.trunk.get(self.cursor) else {
                return self.after_trunk();
            };
            if !ctx.world.is_trunk(pos) {
                self.cursor += 1;
                self.units += 1;
                continue;
            }
            if let (Some(actor), Some(implement)) = (self.actor, self.implement) {
                if !ctx.world.implement_usable(actor, &implement) {
                    debug!(
                        "job at {}: implement exhausted after {} trunk",
                        self.origin, self.trunk_destroyed
                    );
                    self.outcome = Some(JobOutcome::ImplementExhausted {
                        trunk: self.trunk_destroyed,
                    });
                    return Phase::EmitDrops;
                }
            }
            if !ctx.take_budget() {
                break;
            }
            self.cursor += 1;
            self.units += 1;
            let items = ctx.world.break_voxel(pos, self.actor);
            if let (Some(actor), Some(implement)) = (self.actor, self.implement) {
                ctx.world.wear_implement(actor, &implement);
            }
            self.drops.push((pos, items));
            self.trunk_destroyed += 1;
            ctx.feedback(pos);
        }
        Phase::ClearTrunk
    }

    pub(super) fn clear_foliage_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        // Trunk drops go out before the first leaf breaks. Consolidated
        // runs therefore emit one trunk batch here and one foliage batch at
        // the end.
        if !self.flushed {
            self.flushed = true;
            self.flush_drops(ctx);
        }
        while self.has_time(ctx) {
            let Some(index) = self.foliage.len().checked_sub(self.cursor + 1) else {
                return Phase::EmitDrops;
            };
            let pos = self.foliage[index];
            if ctx.world.foliage(pos).is_none() {
                self.cursor += 1;
                self.units += 1;
                continue;
            }
            if !ctx.take_budget() {
                break;
            }
            self.cursor += 1;
            self.units += 1;
            let items = ctx.world.break_voxel(pos, self.actor);
            self.drops.push((pos, items));
            self.foliage_destroyed += 1;
            ctx.feedback(pos);
        }
        Phase::ClearFoliage
    }

    pub(super) fn emit_drops(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        self.units += 1;
        // Interrupted mid-fall: whatever was lifted but not respawned drops.
        for (pos, state) in self.lifted.drain(..) {
            let items = ctx.world.drops_for(pos, state);
            self.drops.push((pos, items));
        }
        self.flush_drops(ctx);
        let outcome = match self.outcome {
            Some(outcome) => outcome,
            None if self.timed_out => JobOutcome::TimedOut {
                trunk: self.trunk_destroyed,
                foliage: self.foliage_destroyed,
            },
            None => JobOutcome::Felled {
                trunk: self.trunk_destroyed,
                foliage: self.foliage_destroyed,
                truncated: self.truncated,
            },
        };
        self.finish(outcome)
    }

    fn flush_drops(&mut self, ctx: &mut StepContext<'_>) {
        if self.drops.is_empty() {
            return;
        }
        let receiver = if ctx.config.drops.deliver_to_actor {
            self.actor
        } else {
            None
        };
        if ctx.config.drops.consolidate {
            let mut merged: IndexMap<ItemId, u32> = IndexMap::new();
            for (_, items) in self.drops.drain(..) {
                for stack in items {
                    let count = merged.entry(stack.item).or_insert(0);
                    *count = count.saturating_add(stack.count);
                }
            }
            let items: SmallVec<[ItemStack; 4]> = merged
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(item, count)| ItemStack::new(item, count))
                .collect();
            if !items.is_empty() {
                ctx.sink.emit(DropBatch {
                    pos: self.origin,
                    items,
                    receiver,
                });
            }
        } else {
            for (pos, items) in self.drops.drain(..) {
                if items.is_empty() {
                    continue;
                }
                ctx.sink.emit(DropBatch {
                    pos,
                    items: items.into_iter().collect(),
                    receiver,
                });
            }
        }
    }
}
