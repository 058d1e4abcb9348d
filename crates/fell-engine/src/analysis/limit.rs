//! Destruction list and log limit.

use log::debug;

use super::{Engine, Phase, StepContext};

impl Engine {
    pub(super) fn limit(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        self.units += 1;
        let config = ctx.config;

        self.trunk.extend(
            self.visited
                .values()
                .filter(|v| v.kind.is_trunk())
                .map(|v| v.pos),
        );
        let visited = &self.visited;
        self.trunk
            .sort_by_key(|p| visited.get(p).map_or(u8::MAX, |v| v.depth));

        let cap = config
            .log_limit
            .limit_for(self.actor.is_some(), self.implement.as_ref());
        if self.trunk.len() > cap {
            self.truncated = self.trunk.len() - cap;
            self.trunk.truncate(cap);
        }

        self.doomed.extend(self.trunk.iter().copied());
        for pos in &self.trunk {
            self.mass
                .add(pos.relative_to(self.origin), config.fall.trunk_weight);
        }
        debug!(
            "job at {}: {} trunk doomed, {} spared by limit {cap}",
            self.origin,
            self.trunk.len(),
            self.truncated
        );

        if config.foliage.enabled {
            self.seed_foliage(ctx);
            Phase::FoliageSearch
        } else {
            self.begin_destruction(ctx)
        }
    }
}
