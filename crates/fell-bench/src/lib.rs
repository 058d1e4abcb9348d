//! Benchmark profiles for the Fell structural-collapse engine.
//!
//! Provides pre-built worlds and configurations for benchmarks:
//!
//! - [`forest_profile`]: a grid of crowned trees on a ground plane
//! - [`tall_column_profile`]: one floating trunk, search-bound
//! - [`unthrottled_config`]: limits high enough that only the work itself
//!   is measured

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use fell_core::VoxelPos;
use fell_engine::FellConfig;
use fell_test_utils::fixtures::{column, crowned_tree, ground_plane};
use fell_test_utils::MockWorld;

/// Spacing between tree bases in [`forest_profile`].
pub const FOREST_SPACING: i32 = 8;

/// A `side` x `side` grid of crowned trees, each `height` tall with a
/// crown of `radius`, on a ground plane at y = 0.
///
/// Returns the world and the voxel directly above each tree's base, in
/// row-major order. Breaking a base and submitting its origin fells that
/// tree.
pub fn forest_profile(side: i32, height: i32, radius: i32) -> (MockWorld, Vec<VoxelPos>) {
    let mut world = MockWorld::new();
    let extent = side * FOREST_SPACING;
    ground_plane(
        &mut world,
        VoxelPos::new(extent / 2, 0, extent / 2),
        extent / 2 + radius + 1,
    );
    let mut origins = Vec::with_capacity((side * side) as usize);
    for i in 0..side {
        for j in 0..side {
            let base = VoxelPos::new(i * FOREST_SPACING, 1, j * FOREST_SPACING);
            crowned_tree(&mut world, base, height, radius);
            origins.push(base.above());
        }
    }
    (world, origins)
}

/// Break every tree base in a forest so each origin is unsupported.
pub fn cut_bases(world: &mut MockWorld, origins: &[VoxelPos]) {
    for origin in origins {
        world.remove(origin.below());
    }
}

/// A floating trunk of `height` starting at y = 10.
///
/// Returns the world and the bottom voxel.
pub fn tall_column_profile(height: i32) -> (MockWorld, VoxelPos) {
    let mut world = MockWorld::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, height);
    (world, origin)
}

/// Defaults with the tick time, break rate, and log limit raised out of
/// the way.
pub fn unthrottled_config() -> FellConfig {
    let mut config = FellConfig {
        tick_time_fraction: 1.0,
        search_units_per_step: u32::MAX,
        breaks_per_second: 1.0e9,
        effects_per_second: 1.0e9,
        max_pending_jobs: 4096,
        ..FellConfig::default()
    };
    config.log_limit.non_actor_limit = u32::MAX;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_has_one_origin_per_tree() {
        let (world, origins) = forest_profile(3, 6, 2);
        assert_eq!(origins.len(), 9);
        assert_eq!(world.trunk_count(), 9 * 6);
    }

    #[test]
    fn cut_bases_removes_one_trunk_per_tree() {
        let (mut world, origins) = forest_profile(2, 5, 1);
        cut_bases(&mut world, &origins);
        assert_eq!(world.trunk_count(), 4 * 4);
    }

    #[test]
    fn unthrottled_config_is_valid() {
        assert!(unthrottled_config().validate().is_ok());
    }
}
