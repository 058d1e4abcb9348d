//! Origin check and forward flood.
//!
//! The flood serves the direct queue before the diagonal one, FIFO within
//! each, so a voxel reachable along face and edge hops alone is always
//! classified direct. Voxels are probed when popped, not when queued.

use fell_core::{Adjacency, VoxelPos, NEIGHBOURS_26};
use log::debug;

use super::visit::{PathClass, Pending, Visit, VisitKind};
use super::{Engine, JobOutcome, Phase, StepContext};

impl Engine {
    pub(super) fn start(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        self.units += 1;
        let origin = self.origin;
        if !ctx.world.is_trunk(origin) || ctx.world.is_protected(origin) {
            return self.finish(JobOutcome::NoTrunk);
        }
        debug!("job at {origin}: analysing (actor {:?})", self.actor);
        self.queued.insert(origin, PathClass::Direct);
        self.direct.push_back(Pending {
            pos: origin,
            depth: 0,
        });
        Phase::ForwardSearch
    }

    pub(super) fn forward_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        while self.has_time(ctx) {
            let (entry, class) = match self.direct.pop_front() {
                Some(p) => (p, PathClass::Direct),
                None => match self.diagonal.pop_front() {
                    Some(p) => (p, PathClass::Diagonal),
                    None => return self.forward_done(),
                },
            };
            if self.visited.contains_key(&entry.pos) {
                continue;
            }
            self.units += 1;
            if let Some(outcome) = self.probe(ctx, entry, class) {
                return self.finish(outcome);
            }
        }
        Phase::ForwardSearch
    }

    fn forward_done(&mut self) -> Phase {
        if self.candidates.is_empty() {
            Phase::Limit
        } else {
            self.seed_reverse();
            Phase::ReverseSearch
        }
    }

    /// Classify one voxel. Returns an outcome if the search can stop.
    fn probe(
        &mut self,
        ctx: &mut StepContext<'_>,
        entry: Pending,
        class: PathClass,
    ) -> Option<JobOutcome> {
        let pos = entry.pos;
        if ctx.world.is_trunk(pos) && !ctx.world.is_protected(pos) {
            self.visited
                .insert(pos, Visit::new(pos, entry.depth, class.trunk_kind()));
            let below = pos.below();
            let supported = self
                .visited
                .get(&below)
                .is_some_and(|v| !v.kind.is_trunk() && v.solid_top);
            if supported && self.support_below(below, class) {
                return Some(JobOutcome::Standing);
            }
            self.expand(ctx, entry, class);
            return None;
        }

        let solid_top = ctx.world.is_top_supporting(pos);
        let mut visit = Visit::new(pos, entry.depth, VisitKind::Ignored);
        visit.solid_top = solid_top;
        self.visited.insert(pos, visit);
        if !solid_top {
            return None;
        }
        match self.visited.get(&pos.above()).map(|v| v.kind) {
            Some(VisitKind::TrunkDirect) => Some(JobOutcome::Standing),
            Some(VisitKind::TrunkDiagonal) => {
                self.mark_candidate(pos);
                None
            }
            _ => None,
        }
    }

    /// A solid-topped voxel sits under a trunk voxel of `class`. Returns
    /// true if that proves the structure is standing.
    fn support_below(&mut self, support: VoxelPos, class: PathClass) -> bool {
        match class {
            PathClass::Direct => true,
            PathClass::Diagonal => {
                self.mark_candidate(support);
                false
            }
        }
    }

    fn mark_candidate(&mut self, pos: VoxelPos) {
        if let Some(v) = self.visited.get_mut(&pos) {
            if v.kind != VisitKind::SupportCandidate {
                v.kind = VisitKind::SupportCandidate;
                self.candidates.push(pos);
            }
        }
    }

    fn expand(&mut self, ctx: &StepContext<'_>, entry: Pending, class: PathClass) {
        let depth = entry.depth + 1;
        if depth > ctx.config.max_search_depth {
            return;
        }
        for offset in NEIGHBOURS_26 {
            let child = entry.pos.offset(offset);
            if self.visited.contains_key(&child)
                || !ctx.config.search_range.contains(child.relative_to(self.origin))
            {
                continue;
            }
            let child_class = if offset.adjacency() == Adjacency::Corner {
                PathClass::Diagonal
            } else {
                class
            };
            if self.queued.get(&child).is_some_and(|q| *q <= child_class) {
                continue;
            }
            self.queued.insert(child, child_class);
            let pending = Pending { pos: child, depth };
            match child_class {
                PathClass::Direct => self.direct.push_back(pending),
                PathClass::Diagonal => self.diagonal.push_back(pending),
            }
        }
    }
}
