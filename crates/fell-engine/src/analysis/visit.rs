//! Per-voxel search records.

use fell_core::VoxelPos;

/// Classification the searches assign to a probed voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisitKind {
    /// Trunk reached along face and edge hops only.
    TrunkDirect,
    /// Trunk reached through at least one corner hop.
    TrunkDiagonal,
    /// Solid-topped voxel beneath a diagonal trunk, pending reverse
    /// verification.
    SupportCandidate,
    /// Foliage claimed by the job.
    Foliage,
    /// Probed and not part of the structure.
    Ignored,
}

impl VisitKind {
    /// Whether the voxel is part of the trunk cluster.
    pub fn is_trunk(self) -> bool {
        matches!(self, Self::TrunkDirect | Self::TrunkDiagonal)
    }
}

/// One probed voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    /// Where.
    pub pos: VoxelPos,
    /// Hops from the origin (forward search) or expected foliage distance
    /// (foliage search).
    pub depth: u8,
    /// Classification.
    pub kind: VisitKind,
    /// Cached top-support answer for non-trunk voxels.
    pub solid_top: bool,
}

impl Visit {
    pub(crate) fn new(pos: VoxelPos, depth: u8, kind: VisitKind) -> Self {
        Self {
            pos,
            depth,
            kind,
            solid_top: false,
        }
    }
}

/// Path classification carried by forward-search entries. `Direct` sorts
/// before `Diagonal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PathClass {
    Direct,
    Diagonal,
}

impl PathClass {
    pub(crate) fn trunk_kind(self) -> VisitKind {
        match self {
            Self::Direct => VisitKind::TrunkDirect,
            Self::Diagonal => VisitKind::TrunkDiagonal,
        }
    }
}

/// A forward-search entry waiting to be probed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pending {
    pub(crate) pos: VoxelPos,
    pub(crate) depth: u8,
}

/// Vertical sense carried by reverse-search entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Sense {
    Anchor,
    Plain,
    Up,
    Down,
}

impl Sense {
    pub(crate) fn bit(self) -> u8 {
        match self {
            Self::Anchor => 0b0001,
            Self::Plain => 0b0010,
            Self::Up => 0b0100,
            Self::Down => 0b1000,
        }
    }

    /// Bits whose presence makes revisiting with `self` pointless.
    pub(crate) fn dominated_by(self) -> u8 {
        let a = Self::Anchor.bit();
        let p = Self::Plain.bit();
        match self {
            Self::Anchor => a,
            Self::Plain => a | p,
            Self::Up => a | p | Self::Up.bit(),
            Self::Down => a | p | Self::Down.bit(),
        }
    }

    /// Sense of the voxel reached by a hop with vertical step `dy`, or
    /// `None` if the hop is not allowed.
    pub(crate) fn hop(self, dy: i8) -> Option<Self> {
        match self {
            Self::Anchor => Some(Self::Plain),
            Self::Up if dy < 0 => None,
            Self::Down if dy > 0 => None,
            _ if dy > 0 => Some(Self::Up),
            _ if dy < 0 => Some(Self::Down),
            s => Some(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_hops_are_unrestricted_and_plain() {
        for dy in [-1, 0, 1] {
            assert_eq!(Sense::Anchor.hop(dy), Some(Sense::Plain));
        }
    }

    #[test]
    fn up_and_down_never_reverse() {
        assert_eq!(Sense::Up.hop(-1), None);
        assert_eq!(Sense::Up.hop(0), Some(Sense::Up));
        assert_eq!(Sense::Down.hop(1), None);
        assert_eq!(Sense::Down.hop(-1), Some(Sense::Down));
        assert_eq!(Sense::Plain.hop(1), Some(Sense::Up));
        assert_eq!(Sense::Plain.hop(-1), Some(Sense::Down));
        assert_eq!(Sense::Plain.hop(0), Some(Sense::Plain));
    }

    #[test]
    fn plain_dominates_directional_senses() {
        let seen = Sense::Plain.bit();
        assert_ne!(Sense::Up.dominated_by() & seen, 0);
        assert_ne!(Sense::Down.dominated_by() & seen, 0);
        assert_eq!(Sense::Anchor.dominated_by() & seen, 0);
        assert_eq!(Sense::Down.dominated_by() & Sense::Up.bit(), 0);
    }

    #[test]
    fn direct_sorts_first() {
        assert!(PathClass::Direct < PathClass::Diagonal);
        assert_eq!(PathClass::Diagonal.trunk_kind(), VisitKind::TrunkDiagonal);
    }
}
