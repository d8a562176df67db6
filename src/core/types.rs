//! Core type definitions used throughout the codebase

use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a door as known by the physical door host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoorId(pub u64);

impl std::fmt::Display for DoorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "door#{}", self.0)
    }
}

/// Unique identifier for actors (players, NPCs) that can open doors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer block coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Block containing the given point
    pub fn containing(point: DVec3) -> Self {
        Self {
            x: point.x.floor() as i64,
            y: point.y.floor() as i64,
            z: point.z.floor() as i64,
        }
    }

    pub fn as_dvec3(&self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// Component-wise minimum
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

/// An actor as reported by the world host
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub world: String,
    pub position: DVec3,
}

impl Actor {
    pub fn new(id: ActorId, world: impl Into<String>, position: DVec3) -> Self {
        Self {
            id,
            world: world.into(),
            position,
        }
    }
}

/// Three-valued predicate outcome
///
/// `Abstain` means "no opinion this cycle" and is never the same as `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tri {
    True,
    False,
    #[default]
    Abstain,
}

impl Tri {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Tri::True
        } else {
            Tri::False
        }
    }

    pub fn from_option(value: Option<bool>) -> Self {
        value.map(Tri::from_bool).unwrap_or(Tri::Abstain)
    }

    pub fn to_option(self) -> Option<bool> {
        match self {
            Tri::True => Some(true),
            Tri::False => Some(false),
            Tri::Abstain => None,
        }
    }

    pub fn is_abstain(self) -> bool {
        self == Tri::Abstain
    }

    /// Literal used when substituting into a custom expression
    pub fn literal(self) -> &'static str {
        match self {
            Tri::True => "true",
            Tri::False => "false",
            Tri::Abstain => "null",
        }
    }
}

impl From<bool> for Tri {
    fn from(value: bool) -> Self {
        Tri::from_bool(value)
    }
}

/// Evaluation scope of a predicate category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Evaluated once per door and cycle, independent of actors
    Global,
    /// Evaluated once per candidate actor near the door
    Actor,
}
