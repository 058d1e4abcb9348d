//! Voxel addresses and the 26-connected neighbourhood.
//!
//! [`VoxelPos`] is an explicit integer triple. Hosts that want a single
//! hashable word can use [`VoxelPos::key`], which packs the address into
//! 64 bits (26 bits x, 26 bits z, 12 bits y, two's complement).

use std::fmt;

const XZ_BITS: u32 = 26;
const Y_BITS: u32 = 12;
const XZ_MASK: u64 = (1 << XZ_BITS) - 1;
const Y_MASK: u64 = (1 << Y_BITS) - 1;

/// Integer address of a voxel in a space. `y` is vertical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelPos {
    /// East/west coordinate.
    pub x: i32,
    /// Vertical coordinate (up is positive).
    pub y: i32,
    /// North/south coordinate.
    pub z: i32,
}

impl VoxelPos {
    /// Largest horizontal magnitude that survives [`key`](Self::key).
    pub const MAX_XZ: i32 = (1 << (XZ_BITS - 1)) - 1;
    /// Largest vertical magnitude that survives [`key`](Self::key).
    pub const MAX_Y: i32 = (1 << (Y_BITS - 1)) - 1;

    /// Create an address.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The address displaced by `o`.
    pub fn offset(self, o: Offset) -> Self {
        Self {
            x: self.x + i32::from(o.dx),
            y: self.y + i32::from(o.dy),
            z: self.z + i32::from(o.dz),
        }
    }

    /// The voxel directly below.
    pub fn below(self) -> Self {
        Self {
            y: self.y - 1,
            ..self
        }
    }

    /// The voxel directly above.
    pub fn above(self) -> Self {
        Self {
            y: self.y + 1,
            ..self
        }
    }

    /// Component-wise difference `self - origin`.
    pub fn relative_to(self, origin: VoxelPos) -> (i32, i32, i32) {
        (self.x - origin.x, self.y - origin.y, self.z - origin.z)
    }

    /// Pack into a 64-bit key.
    ///
    /// Injective for `|x|, |z| <= MAX_XZ` and `|y| <= MAX_Y`; addresses
    /// outside that range alias.
    pub fn key(self) -> u64 {
        ((self.x as u64 & XZ_MASK) << (XZ_BITS + Y_BITS))
            | ((self.z as u64 & XZ_MASK) << Y_BITS)
            | (self.y as u64 & Y_MASK)
    }

    /// Inverse of [`key`](Self::key).
    pub fn from_key(key: u64) -> Self {
        let x = sign_extend(key >> (XZ_BITS + Y_BITS), XZ_BITS);
        let z = sign_extend((key >> Y_BITS) & XZ_MASK, XZ_BITS);
        let y = sign_extend(key & Y_MASK, Y_BITS);
        Self { x, y, z }
    }
}

fn sign_extend(v: u64, bits: u32) -> i32 {
    let shift = 64 - bits;
    ((v << shift) as i64 >> shift) as i32
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A horizontal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// East/west.
    X,
    /// North/south.
    Z,
}

/// How two neighbouring voxels touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Adjacency {
    /// Shared face: one axis differs.
    Face,
    /// Shared edge: two axes differ.
    Edge,
    /// Shared corner only: all three axes differ.
    Corner,
}

/// Unit displacement to one of the 26 neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Offset {
    /// X step in `-1..=1`.
    pub dx: i8,
    /// Y step in `-1..=1`.
    pub dy: i8,
    /// Z step in `-1..=1`.
    pub dz: i8,
}

impl Offset {
    const fn new(dx: i8, dy: i8, dz: i8) -> Self {
        Self { dx, dy, dz }
    }

    /// How a voxel touches its neighbour at this offset.
    pub fn adjacency(self) -> Adjacency {
        let moved = (self.dx != 0) as u8 + (self.dy != 0) as u8 + (self.dz != 0) as u8;
        match moved {
            0 | 1 => Adjacency::Face,
            2 => Adjacency::Edge,
            _ => Adjacency::Corner,
        }
    }
}

/// All 26 neighbour offsets: 6 faces, then 12 edges, then 8 corners.
pub const NEIGHBOURS_26: [Offset; 26] = [
    // faces
    Offset::new(0, -1, 0),
    Offset::new(0, 1, 0),
    Offset::new(1, 0, 0),
    Offset::new(-1, 0, 0),
    Offset::new(0, 0, 1),
    Offset::new(0, 0, -1),
    // edges
    Offset::new(1, 0, 1),
    Offset::new(1, 0, -1),
    Offset::new(-1, 0, 1),
    Offset::new(-1, 0, -1),
    Offset::new(1, -1, 0),
    Offset::new(-1, -1, 0),
    Offset::new(0, -1, 1),
    Offset::new(0, -1, -1),
    Offset::new(1, 1, 0),
    Offset::new(-1, 1, 0),
    Offset::new(0, 1, 1),
    Offset::new(0, 1, -1),
    // corners
    Offset::new(1, -1, 1),
    Offset::new(1, -1, -1),
    Offset::new(-1, -1, 1),
    Offset::new(-1, -1, -1),
    Offset::new(1, 1, 1),
    Offset::new(1, 1, -1),
    Offset::new(-1, 1, 1),
    Offset::new(-1, 1, -1),
];
