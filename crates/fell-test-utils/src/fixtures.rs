//! Reusable tree shapes.
//!
//! - [`column`]: a vertical trunk.
//! - [`ground_plane`]: a square of ground voxels.
//! - [`diagonal_link`]: two columns joined by a single corner-touching voxel.
//! - [`crowned_tree`]: a trunk with a solid crown whose decay distances
//!   match what a search from the trunk would compute.

use fell_core::VoxelPos;

use crate::MockWorld;

/// Decay range of fixture foliage.
pub const LEAF_MAX_DISTANCE: u8 = 7;

/// Trunk voxels at `base` and the `height - 1` voxels above it.
pub fn column(world: &mut MockWorld, base: VoxelPos, height: i32) {
    for dy in 0..height {
        world.set_trunk(VoxelPos::new(base.x, base.y + dy, base.z));
    }
}

/// Ground voxels covering `|dx|, |dz| <= radius` around `centre`.
pub fn ground_plane(world: &mut MockWorld, centre: VoxelPos, radius: i32) {
    for dx in -radius..=radius {
        for dz in -radius..=radius {
            world.set_ground(VoxelPos::new(centre.x + dx, centre.y, centre.z + dz));
        }
    }
}

/// Foliage with the fixture decay range.
pub fn leaf(world: &mut MockWorld, pos: VoxelPos, distance: u8) {
    world.set_foliage(pos, distance, LEAF_MAX_DISTANCE);
}

/// Column B at `(0, 1..=4, 0)`, link L at `(1, 5, 1)`, column A at
/// `(2, 6..=9, 2)`. With `grounded`, B stands on ground at `(0, 0, 0)`.
///
/// Returns a voxel of column A to start from.
pub fn diagonal_link(world: &mut MockWorld, grounded: bool) -> VoxelPos {
    if grounded {
        world.set_ground(VoxelPos::new(0, 0, 0));
    }
    column(world, VoxelPos::new(0, 1, 0), 4);
    world.set_trunk(VoxelPos::new(1, 5, 1));
    column(world, VoxelPos::new(2, 6, 2), 4);
    VoxelPos::new(2, 6, 2)
}

/// Shortest search distance across a displacement when face and edge hops
/// cost one and corner hops two.
pub fn search_distance(dx: i32, dy: i32, dz: i32) -> u8 {
    let (a, b, c) = (dx.unsigned_abs(), dy.unsigned_abs(), dz.unsigned_abs());
    let longest = a.max(b).max(c);
    let paired = (a + b + c).div_ceil(2);
    longest.max(paired).min(u32::from(u8::MAX)) as u8
}

/// A trunk of `height` standing at `base`, crowned by foliage filling
/// `|dx|, |dz| <= radius` over the top `radius + 1` trunk voxels and one
/// layer above.
///
/// Returns the bottom trunk voxel.
pub fn crowned_tree(world: &mut MockWorld, base: VoxelPos, height: i32, radius: i32) -> VoxelPos {
    column(world, base, height);
    let top = base.y + height - 1;
    let crown_bottom = (top - radius).max(base.y + 1);
    for y in crown_bottom..=top + 1 {
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if dx == 0 && dz == 0 && y <= top {
                    continue;
                }
                let gap = (y - top).max(0);
                let distance = search_distance(dx, gap, dz).min(LEAF_MAX_DISTANCE);
                leaf(
                    world,
                    VoxelPos::new(base.x + dx, y, base.z + dz),
                    distance,
                );
            }
        }
    }
    base
}
