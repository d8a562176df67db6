//! Interfaces to the systems that own physical doors, worlds and actors.
//!
//! The core never performs I/O. Everything it knows about the outside world
//! arrives through these traits, which the embedding application
//! implements. [`memory::MemoryHost`] implements all of them in memory.

pub mod memory;

use glam::DVec3;

use crate::core::types::{Actor, ActorId, DoorId};

/// A door an actor has access to, with the access level
/// (0 owner, 1 editor, 2 user)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedDoor {
    pub door: DoorId,
    pub permission: u8,
}

/// Physical movement a door host reports as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Open,
    Close,
    /// Moved without changing open state, e.g. a sliding door
    Static,
}

/// The system that owns and moves physical doors
pub trait DoorHost {
    fn exists(&self, door: DoorId) -> bool;

    fn is_physically_open(&self, door: DoorId) -> bool;

    /// True while the door is mid-toggle
    fn is_busy(&self, door: DoorId) -> bool;

    /// Start flipping the door. Fire-and-forget: completion is reported
    /// back separately.
    fn toggle(&mut self, door: DoorId);

    /// True if the world data around the door is loaded
    fn chunks_loaded(&self, door: DoorId) -> bool;

    fn all_doors(&self) -> Vec<DoorId>;

    fn doors_owned_by(&self, actor: ActorId) -> Vec<OwnedDoor>;
}

/// Worlds, actors and their belongings
pub trait WorldHost {
    fn is_world_loaded(&self, world: &str) -> bool;

    fn actors_in_world(&self, world: &str) -> Vec<Actor>;

    fn actor(&self, id: ActorId) -> Option<Actor>;

    fn has_permission(&self, actor: ActorId, node: &str) -> bool;

    fn has_item_in_hand(&self, actor: ActorId, item: &str, amount: u32) -> bool;

    fn has_item_in_inventory(&self, actor: ActorId, item: &str, amount: u32) -> bool;

    /// Remove items from the actor's hand. Returns false if it held too few.
    fn take_from_hand(&mut self, actor: ActorId, item: &str, amount: u32) -> bool;

    /// Remove items from anywhere in the inventory. Returns false if the
    /// inventory held too few.
    fn take_from_inventory(&mut self, actor: ActorId, item: &str, amount: u32) -> bool;
}

/// Named region containment, e.g. a land-claim plugin
pub trait RegionQuery {
    /// `None` if the region is unknown in that world
    fn contains(&self, world: &str, region: &str, position: DVec3) -> Option<bool>;
}

/// Host-side placeholder substitution for per-actor text
pub trait PlaceholderSource {
    fn substitute(&self, actor: &Actor, text: &str) -> String;
}

/// World clock and weather
pub trait ClimateSource {
    /// Total world ticks, `None` if the world is unknown
    fn full_time(&self, world: &str) -> Option<u64>;

    /// True if precipitation currently falls at the position
    fn is_downfall(&self, world: &str, position: DVec3) -> Option<bool>;
}

/// A host serving both doors and worlds
///
/// The scheduler drives a single host value. Hosts that support optional
/// integrations hand them out from `integrations`.
pub trait Host: DoorHost + WorldHost {
    fn integrations(&self) -> Integrations<'_> {
        Integrations::none()
    }
}

/// Optional integrations. Predicates depending on a missing one abstain.
#[derive(Clone, Copy, Default)]
pub struct Integrations<'a> {
    pub regions: Option<&'a dyn RegionQuery>,
    pub placeholders: Option<&'a dyn PlaceholderSource>,
    pub climate: Option<&'a dyn ClimateSource>,
    /// Whether mob kill events are being fed in
    pub mob_feed: bool,
}

impl<'a> Integrations<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_regions(mut self, regions: &'a dyn RegionQuery) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn with_placeholders(mut self, placeholders: &'a dyn PlaceholderSource) -> Self {
        self.placeholders = Some(placeholders);
        self
    }

    pub fn with_climate(mut self, climate: &'a dyn ClimateSource) -> Self {
        self.climate = Some(climate);
        self
    }

    pub fn with_mob_feed(mut self, enabled: bool) -> Self {
        self.mob_feed = enabled;
        self
    }
}

impl std::fmt::Debug for Integrations<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrations")
            .field("regions", &self.regions.is_some())
            .field("placeholders", &self.placeholders.is_some())
            .field("climate", &self.climate.is_some())
            .field("mob_feed", &self.mob_feed)
            .finish()
    }
}
