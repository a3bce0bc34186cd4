//! Identifier and position types shared by every engine module.

use serde::{Deserialize, Serialize};

/// Member ids are `group * MEMBER_ID_STRIDE + seq`.
pub const MEMBER_ID_STRIDE: u32 = 1000;

/// Sequence number reserved for a group's seeded spy.
pub const SPY_SEQ: u32 = 1;

/// Half-width of the square map, in map units.
pub const MAP_EXTENT: f32 = 100.0;

/// Identifier of a resistance group (unique for the registry lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Member id of the slot a seeded spy occupies in this group.
    pub fn spy_member(self) -> MemberId {
        MemberId::new(self, SPY_SEQ)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a resistance member.
///
/// The owning group is encoded in the id: `id / 1000 == group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u32);

impl MemberId {
    /// Builds the id of member `seq` (1..=999) of `group`.
    pub fn new(group: GroupId, seq: u32) -> Self {
        debug_assert!((1..MEMBER_ID_STRIDE).contains(&seq));
        Self(group.0 * MEMBER_ID_STRIDE + seq)
    }

    /// The group this member belongs to.
    pub fn group(self) -> GroupId {
        GroupId(self.0 / MEMBER_ID_STRIDE)
    }

    /// Sequence number within the group.
    pub fn seq(self) -> u32 {
        self.0 % MEMBER_ID_STRIDE
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a counter-intelligence agency member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgencyId(pub u32);

impl std::fmt::Display for AgencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point on the 2D map, used only for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Moves by `(dx, dy)` and clamps to the map bounds.
    pub fn step_clamped(self, dx: f32, dy: f32) -> Self {
        Self {
            x: (self.x + dx).clamp(-MAP_EXTENT, MAP_EXTENT),
            y: (self.y + dy).clamp(-MAP_EXTENT, MAP_EXTENT),
        }
    }
}
