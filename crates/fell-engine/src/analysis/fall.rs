//! Centre of mass, fall direction, and intact falling.

use std::f32::consts::TAU;

use fell_core::{Axis, FallingBody};
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Engine, Phase, StepContext};
use crate::config::FallMode;

/// Weighted horizontal offsets of the doomed voxels from the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MassSums {
    /// Sum of `weight * dx`.
    pub x: i64,
    /// Sum of `weight * dz`.
    pub z: i64,
    /// Sum of weights.
    pub total: i64,
}

impl MassSums {
    /// Add a voxel at displacement `(dx, dy, dz)` from the origin.
    pub fn add(&mut self, (dx, _, dz): (i32, i32, i32), weight: u32) {
        let w = i64::from(weight);
        self.x += i64::from(dx) * w;
        self.z += i64::from(dz) * w;
        self.total += w;
    }

    /// Whether the mass is exactly above the origin (or empty).
    pub fn is_centred(&self) -> bool {
        self.total == 0 || (self.x == 0 && self.z == 0)
    }
}

/// Unit horizontal direction a structure falls in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drift {
    /// X component.
    pub x: f32,
    /// Z component.
    pub z: f32,
}

impl Default for Drift {
    fn default() -> Self {
        Self { x: 1.0, z: 0.0 }
    }
}

impl Drift {
    /// Direction of the weighted mean offset, or a seeded random direction
    /// if the mass is centred.
    pub fn from_mass(mass: &MassSums, seed: u64) -> Self {
        if !mass.is_centred() {
            let x = mass.x as f32 / mass.total as f32;
            let z = mass.z as f32 / mass.total as f32;
            let len = (x * x + z * z).sqrt();
            if len > 0.0 {
                return Self {
                    x: x / len,
                    z: z / len,
                };
            }
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let angle = rng.random::<f32>() * TAU;
        Self {
            x: angle.cos(),
            z: angle.sin(),
        }
    }

    /// Horizontal axis the structure mostly moves along.
    pub fn dominant_axis(&self) -> Axis {
        if self.x.abs() >= self.z.abs() {
            Axis::X
        } else {
            Axis::Z
        }
    }

    /// Axis falling pieces tumble around.
    pub fn rotation_axis(&self) -> Axis {
        match self.dominant_axis() {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }
}

impl Engine {
    /// Fix the fall direction and commit to destruction.
    pub(super) fn begin_destruction(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        let seed = ctx.config.seed ^ self.origin.key() ^ self.serial;
        let drift = Drift::from_mass(&self.mass, seed);
        self.drift = Some(drift);
        self.committed = true;
        self.cursor = 0;
        ctx.expect_destructions(self.trunk.len() + self.foliage.len());
        debug!(
            "job at {}: removing {} trunk and {} foliage, drift ({:.2}, {:.2})",
            self.origin,
            self.trunk.len(),
            self.foliage.len(),
            drift.x,
            drift.z
        );
        match ctx.config.fall.mode {
            FallMode::Clear => Phase::ClearTrunk,
            FallMode::Intact => {
                self.trunk.sort_by_key(|p| p.y);
                Phase::LiftTrunk
            }
        }
    }

    /// Next phase once the trunk is gone.
    pub(super) fn after_trunk(&mut self) -> Phase {
        if self.foliage.is_empty() {
            Phase::EmitDrops
        } else {
            self.cursor = 0;
            Phase::ClearFoliage
        }
    }

    pub(super) fn lift_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        while self.has_time(ctx) {
            let Some(&pos) = self.trunk.get(self.cursor) else {
                return Phase::SpawnFalling;
            };
            if !ctx.world.is_trunk(pos) {
                self.cursor += 1;
                self.units += 1;
                continue;
            }
            if !ctx.take_budget() {
                break;
            }
            self.cursor += 1;
            self.units += 1;
            if let Some(state) = ctx.world.lift_voxel(pos) {
                self.lifted.push((pos, state));
                self.trunk_destroyed += 1;
            }
        }
        Phase::LiftTrunk
    }

    pub(super) fn spawn_step(&mut self, ctx: &mut StepContext<'_>) -> Phase {
        let config = ctx.config;
        let fall = &config.fall;
        let drift = self.drift.unwrap_or_default();
        while self.has_time(ctx) {
            let Some(&(pos, state)) = self.lifted.last() else {
                return self.after_trunk();
            };
            if ctx.world.falling_body_count() >= fall.max_falling_bodies {
                // Wait for bodies to land.
                break;
            }
            self.lifted.pop();
            self.units += 1;
            let height = (pos.y - self.origin.y).max(0) as f32;
            let speed = height * fall.velocity_scale;
            let body = FallingBody {
                pos,
                state,
                velocity: [drift.x * speed, 0.0, drift.z * speed],
                rotation_axis: drift.rotation_axis(),
            };
            if let Err(rejected) = ctx.world.spawn_falling(body) {
                trace!("job at {}: {rejected}, dropping {pos}", self.origin);
                let items = ctx.world.drops_for(pos, state);
                self.drops.push((pos, items));
            }
        }
        Phase::SpawnFalling
    }
}
