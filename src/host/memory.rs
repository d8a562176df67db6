//! In-memory host implementing every host trait.
//!
//! Used by the integration tests and the demo binary. Toggles are not
//! applied immediately: `toggle` marks the door busy and
//! [`MemoryHost::finish_toggles`] completes them, mimicking a door that
//! takes a while to swing.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ahash::{AHashMap, AHashSet};
use glam::DVec3;
use regex::{Captures, Regex};

use super::{
    ClimateSource, DoorHost, Host, Integrations, OwnedDoor, PlaceholderSource, RegionQuery,
    ToggleKind, WorldHost,
};
use crate::core::calendar::Calendar;
use crate::core::types::{Actor, ActorId, BlockPos, DoorId};

/// A physical door
#[derive(Debug, Clone)]
pub struct MemoryDoor {
    pub world: String,
    pub position: DVec3,
    pub open: bool,
    pub busy: bool,
    pub chunks_loaded: bool,
    /// Actors with access and their level (0 owner, 1 editor, 2 user)
    pub access: Vec<(ActorId, u8)>,
    /// Number of completed toggles
    pub toggles: u32,
}

/// An actor with its belongings
#[derive(Debug, Clone)]
pub struct MemoryActor {
    pub actor: Actor,
    pub hand: Option<(String, u32)>,
    /// Item name to count, excluding the hand
    pub inventory: AHashMap<String, u32>,
    pub permissions: AHashSet<String>,
    pub placeholders: AHashMap<String, String>,
}

impl MemoryActor {
    fn hand_count(&self, item: &str) -> u32 {
        match &self.hand {
            Some((held, count)) if held.eq_ignore_ascii_case(item) => *count,
            _ => 0,
        }
    }

    fn inventory_count(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(item))
            .map(|(_, count)| *count)
            .sum::<u32>()
            + self.hand_count(item)
    }
}

#[derive(Debug, Clone)]
struct MemoryWorld {
    calendar: Calendar,
    downfall: bool,
}

#[derive(Debug, Clone, Copy)]
struct Cuboid {
    min: BlockPos,
    max: BlockPos,
}

/// Which integrations a [`MemoryHost`] hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryIntegrations {
    pub regions: bool,
    pub placeholders: bool,
    pub climate: bool,
    pub mob_feed: bool,
}

impl Default for MemoryIntegrations {
    fn default() -> Self {
        Self {
            regions: true,
            placeholders: true,
            climate: true,
            mob_feed: true,
        }
    }
}

/// Worlds, doors and actors held in plain collections
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    pub enabled: MemoryIntegrations,
    worlds: AHashMap<String, MemoryWorld>,
    doors: BTreeMap<DoorId, MemoryDoor>,
    /// Insertion order is the order `actors_in_world` reports
    actors: Vec<MemoryActor>,
    regions: AHashMap<(String, String), Cuboid>,
    pending: Vec<DoorId>,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%([A-Za-z0-9_]+)%").expect("valid placeholder regex"))
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    // === WORLDS ===

    pub fn add_world(&mut self, name: impl Into<String>) {
        self.worlds.insert(
            name.into(),
            MemoryWorld {
                calendar: Calendar::default(),
                downfall: false,
            },
        );
    }

    pub fn remove_world(&mut self, name: &str) {
        self.worlds.remove(name);
    }

    /// Advance the clock of every world
    pub fn advance_time(&mut self, ticks: u64) {
        for world in self.worlds.values_mut() {
            world.calendar.advance(ticks);
        }
    }

    pub fn set_time(&mut self, world: &str, full_time: u64) {
        if let Some(w) = self.worlds.get_mut(world) {
            w.calendar = Calendar::new(full_time);
        }
    }

    pub fn set_downfall(&mut self, world: &str, downfall: bool) {
        if let Some(w) = self.worlds.get_mut(world) {
            w.downfall = downfall;
        }
    }

    pub fn add_region(&mut self, world: &str, name: &str, a: BlockPos, b: BlockPos) {
        self.regions.insert(
            (world.to_string(), name.to_ascii_lowercase()),
            Cuboid {
                min: a.min(&b),
                max: a.max(&b),
            },
        );
    }

    // === DOORS ===

    pub fn add_door(&mut self, id: DoorId, world: impl Into<String>, position: DVec3) -> &mut MemoryDoor {
        self.doors.entry(id).or_insert(MemoryDoor {
            world: world.into(),
            position,
            open: false,
            busy: false,
            chunks_loaded: true,
            access: Vec::new(),
            toggles: 0,
        })
    }

    pub fn remove_door(&mut self, id: DoorId) -> Option<MemoryDoor> {
        self.pending.retain(|pending| *pending != id);
        self.doors.remove(&id)
    }

    pub fn door(&self, id: DoorId) -> Option<&MemoryDoor> {
        self.doors.get(&id)
    }

    pub fn door_mut(&mut self, id: DoorId) -> Option<&mut MemoryDoor> {
        self.doors.get_mut(&id)
    }

    /// Toggles started but not yet finished
    pub fn pending_toggles(&self) -> &[DoorId] {
        &self.pending
    }

    /// Complete every started toggle, returning what each door did
    pub fn finish_toggles(&mut self) -> Vec<(DoorId, ToggleKind)> {
        let mut finished = Vec::with_capacity(self.pending.len());
        for id in self.pending.drain(..) {
            if let Some(door) = self.doors.get_mut(&id) {
                door.open = !door.open;
                door.busy = false;
                door.toggles += 1;
                let kind = if door.open { ToggleKind::Open } else { ToggleKind::Close };
                finished.push((id, kind));
            }
        }
        finished
    }

    // === ACTORS ===

    pub fn add_actor(&mut self, actor: Actor) -> &mut MemoryActor {
        self.actors.retain(|a| a.actor.id != actor.id);
        self.actors.push(MemoryActor {
            actor,
            hand: None,
            inventory: AHashMap::new(),
            permissions: AHashSet::new(),
            placeholders: AHashMap::new(),
        });
        let last = self.actors.len() - 1;
        &mut self.actors[last]
    }

    pub fn remove_actor(&mut self, id: ActorId) {
        self.actors.retain(|a| a.actor.id != id);
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut MemoryActor> {
        self.actors.iter_mut().find(|a| a.actor.id == id)
    }

    fn find_actor(&self, id: ActorId) -> Option<&MemoryActor> {
        self.actors.iter().find(|a| a.actor.id == id)
    }

    pub fn move_actor(&mut self, id: ActorId, position: DVec3) {
        if let Some(a) = self.actor_mut(id) {
            a.actor.position = position;
        }
    }

    pub fn grant_permission(&mut self, id: ActorId, node: &str) {
        if let Some(a) = self.actor_mut(id) {
            a.permissions.insert(node.to_string());
        }
    }

    pub fn set_hand(&mut self, id: ActorId, item: &str, amount: u32) {
        if let Some(a) = self.actor_mut(id) {
            a.hand = (amount > 0).then(|| (item.to_string(), amount));
        }
    }

    pub fn give_item(&mut self, id: ActorId, item: &str, amount: u32) {
        if let Some(a) = self.actor_mut(id) {
            *a.inventory.entry(item.to_string()).or_insert(0) += amount;
        }
    }

    pub fn set_placeholder(&mut self, id: ActorId, key: &str, value: &str) {
        if let Some(a) = self.actor_mut(id) {
            a.placeholders.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn grant_access(&mut self, door: DoorId, actor: ActorId, level: u8) {
        if let Some(d) = self.doors.get_mut(&door) {
            d.access.retain(|(a, _)| *a != actor);
            d.access.push((actor, level));
        }
    }
}

impl Host for MemoryHost {
    fn integrations(&self) -> Integrations<'_> {
        let mut integrations = Integrations::none().with_mob_feed(self.enabled.mob_feed);
        if self.enabled.regions {
            integrations = integrations.with_regions(self);
        }
        if self.enabled.placeholders {
            integrations = integrations.with_placeholders(self);
        }
        if self.enabled.climate {
            integrations = integrations.with_climate(self);
        }
        integrations
    }
}

impl DoorHost for MemoryHost {
    fn exists(&self, door: DoorId) -> bool {
        self.doors.contains_key(&door)
    }

    fn is_physically_open(&self, door: DoorId) -> bool {
        self.doors.get(&door).is_some_and(|d| d.open)
    }

    fn is_busy(&self, door: DoorId) -> bool {
        self.doors.get(&door).is_some_and(|d| d.busy)
    }

    fn toggle(&mut self, door: DoorId) {
        let Some(d) = self.doors.get_mut(&door) else {
            tracing::warn!("Toggle requested for unknown {}", door);
            return;
        };
        if d.busy {
            return;
        }
        d.busy = true;
        self.pending.push(door);
    }

    fn chunks_loaded(&self, door: DoorId) -> bool {
        self.doors.get(&door).is_some_and(|d| d.chunks_loaded)
    }

    fn all_doors(&self) -> Vec<DoorId> {
        self.doors.keys().copied().collect()
    }

    fn doors_owned_by(&self, actor: ActorId) -> Vec<OwnedDoor> {
        self.doors
            .iter()
            .filter_map(|(id, d)| {
                d.access
                    .iter()
                    .find(|(a, _)| *a == actor)
                    .map(|(_, level)| OwnedDoor {
                        door: *id,
                        permission: *level,
                    })
            })
            .collect()
    }
}

impl WorldHost for MemoryHost {
    fn is_world_loaded(&self, world: &str) -> bool {
        self.worlds.contains_key(world)
    }

    fn actors_in_world(&self, world: &str) -> Vec<Actor> {
        self.actors
            .iter()
            .filter(|a| a.actor.world == world)
            .map(|a| a.actor.clone())
            .collect()
    }

    fn actor(&self, id: ActorId) -> Option<Actor> {
        self.find_actor(id).map(|a| a.actor.clone())
    }

    fn has_permission(&self, actor: ActorId, node: &str) -> bool {
        self.find_actor(actor)
            .is_some_and(|a| a.permissions.contains(node) || a.permissions.contains("*"))
    }

    fn has_item_in_hand(&self, actor: ActorId, item: &str, amount: u32) -> bool {
        self.find_actor(actor).is_some_and(|a| a.hand_count(item) >= amount)
    }

    fn has_item_in_inventory(&self, actor: ActorId, item: &str, amount: u32) -> bool {
        self.find_actor(actor)
            .is_some_and(|a| a.inventory_count(item) >= amount)
    }

    fn take_from_hand(&mut self, actor: ActorId, item: &str, amount: u32) -> bool {
        let Some(a) = self.actor_mut(actor) else {
            return false;
        };
        if a.hand_count(item) < amount {
            return false;
        }
        if let Some((_, count)) = a.hand.as_mut() {
            *count -= amount;
            if *count == 0 {
                a.hand = None;
            }
        }
        true
    }

    fn take_from_inventory(&mut self, actor: ActorId, item: &str, amount: u32) -> bool {
        let Some(a) = self.actor_mut(actor) else {
            return false;
        };
        if a.inventory_count(item) < amount {
            return false;
        }

        let mut remaining = amount;
        for (name, count) in a.inventory.iter_mut() {
            if remaining == 0 {
                break;
            }
            if name.eq_ignore_ascii_case(item) {
                let taken = remaining.min(*count);
                *count -= taken;
                remaining -= taken;
            }
        }
        a.inventory.retain(|_, count| *count > 0);

        if remaining > 0 {
            if let Some((_, count)) = a.hand.as_mut() {
                *count -= remaining;
                if *count == 0 {
                    a.hand = None;
                }
            }
        }
        true
    }
}

impl RegionQuery for MemoryHost {
    fn contains(&self, world: &str, region: &str, position: DVec3) -> Option<bool> {
        let cuboid = self
            .regions
            .get(&(world.to_string(), region.to_ascii_lowercase()))?;
        let pos = BlockPos::containing(position);
        Some(
            (cuboid.min.x..=cuboid.max.x).contains(&pos.x)
                && (cuboid.min.y..=cuboid.max.y).contains(&pos.y)
                && (cuboid.min.z..=cuboid.max.z).contains(&pos.z),
        )
    }
}

impl PlaceholderSource for MemoryHost {
    /// Replaces `%key%` with the actor's value for `key`. Unknown keys are
    /// left in place.
    fn substitute(&self, actor: &Actor, text: &str) -> String {
        let Some(a) = self.find_actor(actor.id) else {
            return text.to_string();
        };
        placeholder_regex()
            .replace_all(text, |caps: &Captures| {
                a.placeholders
                    .get(&caps[1].to_ascii_lowercase())
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl ClimateSource for MemoryHost {
    fn full_time(&self, world: &str) -> Option<u64> {
        self.worlds.get(world).map(|w| w.calendar.full_time())
    }

    fn is_downfall(&self, world: &str, _position: DVec3) -> Option<bool> {
        self.worlds.get(world).map(|w| w.downfall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_actor() -> (MemoryHost, ActorId) {
        let mut host = MemoryHost::new();
        host.add_world("world");
        let id = ActorId::new();
        host.add_actor(Actor::new(id, "world", DVec3::ZERO));
        (host, id)
    }

    #[test]
    fn test_toggle_completes_later() {
        let mut host = MemoryHost::new();
        host.add_world("world");
        host.add_door(DoorId(1), "world", DVec3::ZERO);

        host.toggle(DoorId(1));
        assert!(host.is_busy(DoorId(1)));
        assert!(!host.is_physically_open(DoorId(1)));

        // A busy door ignores further toggles
        host.toggle(DoorId(1));
        assert_eq!(host.pending_toggles().len(), 1);

        assert_eq!(host.finish_toggles(), vec![(DoorId(1), ToggleKind::Open)]);
        assert!(host.is_physically_open(DoorId(1)));
        assert!(!host.is_busy(DoorId(1)));
    }

    #[test]
    fn test_actors_listed_per_world_in_order() {
        let (mut host, first) = host_with_actor();
        let second = ActorId::new();
        host.add_actor(Actor::new(second, "world", DVec3::ONE));
        host.add_actor(Actor::new(ActorId::new(), "nether", DVec3::ZERO));

        let ids: Vec<ActorId> = host.actors_in_world("world").iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first, second]);

        host.remove_actor(first);
        assert!(host.actor(first).is_none());
        assert_eq!(host.actors_in_world("world").len(), 1);
    }

    #[test]
    fn test_take_from_hand() {
        let (mut host, id) = host_with_actor();
        host.set_hand(id, "Key", 2);
        assert!(host.has_item_in_hand(id, "key", 2));
        assert!(host.take_from_hand(id, "key", 1));
        assert!(!host.has_item_in_hand(id, "key", 2));
        assert!(host.take_from_hand(id, "key", 1));
        assert!(!host.take_from_hand(id, "key", 1));
    }

    #[test]
    fn test_inventory_counts_hand() {
        let (mut host, id) = host_with_actor();
        host.give_item(id, "gold", 3);
        host.set_hand(id, "gold", 2);
        assert!(host.has_item_in_inventory(id, "gold", 5));
        assert!(host.take_from_inventory(id, "gold", 4));
        assert!(host.has_item_in_inventory(id, "gold", 1));
        assert!(!host.has_item_in_inventory(id, "gold", 2));
    }

    #[test]
    fn test_placeholder_substitution() {
        let (mut host, id) = host_with_actor();
        host.set_placeholder(id, "is_vip", "true");
        let actor = host.actor(id).unwrap();
        assert_eq!(host.substitute(&actor, "%IS_VIP% and %level%"), "true and %level%");
    }

    #[test]
    fn test_region_query() {
        let mut host = MemoryHost::new();
        host.add_region("world", "Spawn", BlockPos::new(10, 0, 10), BlockPos::new(-10, 100, -10));
        assert_eq!(host.contains("world", "spawn", DVec3::new(0.5, 64.0, 0.5)), Some(true));
        assert_eq!(host.contains("world", "spawn", DVec3::new(11.0, 64.0, 0.0)), Some(false));
        assert_eq!(host.contains("world", "market", DVec3::ZERO), None);
    }

    #[test]
    fn test_integrations_can_be_disabled() {
        let mut host = MemoryHost::new();
        assert!(host.integrations().climate.is_some());
        host.enabled.climate = false;
        host.enabled.mob_feed = false;
        let integrations = host.integrations();
        assert!(integrations.climate.is_none());
        assert!(integrations.regions.is_some());
        assert!(!integrations.mob_feed);
    }

    #[test]
    fn test_access_levels() {
        let (mut host, id) = host_with_actor();
        host.add_door(DoorId(4), "world", DVec3::ZERO);
        host.grant_access(DoorId(4), id, 1);
        assert_eq!(
            host.doors_owned_by(id),
            vec![OwnedDoor {
                door: DoorId(4),
                permission: 1
            }]
        );
        assert!(host.doors_owned_by(ActorId::new()).is_empty());
    }
}
