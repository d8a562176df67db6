//! Amortized door evaluation loop.
//!
//! The scheduler keeps every registered door in a rotating queue. Each
//! cycle it takes `ceil(door_count / refresh_rate)` doors from the front,
//! re-queues them at the back, and decides for each whether it should be
//! open. Toggles are collected into an open and a close batch and issued
//! once the whole batch has been evaluated.
//!
//! Per-door flow:
//! 1. existence check (missing doors are unregistered)
//! 2. availability: world loaded, door idle, chunks loaded, door enabled
//! 3. doors waiting to open or held open stay open
//! 4. predicates decide, per nearby actor if any predicate needs one
//! 5. doors whose desired state differs from their logical state are
//!    batched for toggling

use std::collections::VecDeque;
use std::time::Instant;

use ahash::AHashSet;
use glam::DVec3;

use crate::core::cache::TtlCache;
use crate::core::types::{Actor, ActorId, DoorId};
use crate::door::{DoorPhase, DoorRegistry, DoorState};
use crate::host::Host;
use crate::predicate::Services;

pub use crate::host::ToggleKind;

/// Why a door was drawn but not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    WorldUnloaded,
    Busy,
    ChunksUnloaded,
    Disabled,
}

/// What happened during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    /// Doors whose predicates were consulted
    pub evaluated: Vec<DoorId>,
    pub opened: Vec<DoorId>,
    pub closed: Vec<DoorId>,
    /// Doors that no longer exist on the host and were unregistered
    pub removed: Vec<DoorId>,
    pub skipped: Vec<(DoorId, SkipReason)>,
}

impl CycleReport {
    /// Number of doors taken from the queue
    pub fn drawn(&self) -> usize {
        self.evaluated.len() + self.removed.len() + self.skipped.len()
    }
}

/// Rotating evaluation queue with its lookup caches
#[derive(Debug, Default)]
pub struct DoorScheduler {
    queue: VecDeque<DoorId>,
    queued: AHashSet<DoorId>,
    chunk_cache: TtlCache<DoorId, bool>,
    /// Actor ids per world. Positions are always read live.
    actor_cache: TtlCache<String, Vec<ActorId>>,
    cycle: u64,
}

impl DoorScheduler {
    pub fn new(registry: &DoorRegistry) -> Self {
        let mut scheduler = Self::default();
        scheduler.reload(registry);
        scheduler
    }

    /// Rebuild the queue from the registry and drop all cached lookups
    pub fn reload(&mut self, registry: &DoorRegistry) {
        self.queue.clear();
        self.queued.clear();
        self.chunk_cache.clear();
        self.actor_cache.clear();
        self.sync(registry);
        tracing::debug!("Scheduler reloaded with {} doors", self.queue.len());
    }

    /// Enqueue doors registered since the last sync and forget
    /// unregistered ones
    pub fn sync(&mut self, registry: &DoorRegistry) {
        let before = self.queue.len();
        let chunk_cache = &mut self.chunk_cache;
        self.queue.retain(|id| registry.contains(*id));
        self.queued.retain(|id| {
            let keep = registry.contains(*id);
            if !keep {
                chunk_cache.invalidate(id);
            }
            keep
        });
        for id in registry.ids() {
            if self.queued.insert(id) {
                self.queue.push_back(id);
            }
        }
        if self.queue.len() != before {
            tracing::trace!("Scheduler queue now holds {} doors", self.queue.len());
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Doors evaluated per cycle for `door_count` doors
    pub fn batch_size(door_count: usize, refresh_rate: u32) -> usize {
        door_count.div_ceil(refresh_rate.max(1) as usize)
    }

    /// Run one cycle
    pub fn tick<H: Host>(&mut self, registry: &mut DoorRegistry, host: &mut H, now: Instant) -> CycleReport {
        self.cycle += 1;
        self.sync(registry);

        let mut report = CycleReport {
            cycle: self.cycle,
            ..Default::default()
        };
        if self.queue.is_empty() {
            return report;
        }

        let batch = Self::batch_size(self.queue.len(), registry.config().refresh_rate);
        let mut to_open: Vec<(DoorId, Option<Actor>)> = Vec::new();
        let mut to_close: Vec<DoorId> = Vec::new();

        {
            let (doors, predicates, engine, config) = registry.parts_mut();
            let host_ref: &H = host;
            let services = Services {
                doors: host_ref,
                world: host_ref,
                integrations: host_ref.integrations(),
                registry: predicates,
                engine,
                config,
            };

            for _ in 0..batch {
                let Some(id) = self.queue.pop_front() else {
                    break;
                };

                if !services.doors.exists(id) {
                    self.queued.remove(&id);
                    self.chunk_cache.invalidate(&id);
                    if doors.remove(&id).is_some() {
                        tracing::info!("{} no longer exists, unregistered", id);
                    }
                    report.removed.push(id);
                    continue;
                }

                let Some(door) = doors.get_mut(&id) else {
                    self.queued.remove(&id);
                    continue;
                };
                self.queue.push_back(id);

                if let Some(reason) = self.check_available(door, &services, now) {
                    tracing::trace!("Skipping {}: {:?}", id, reason);
                    report.skipped.push((id, reason));
                    continue;
                }
                report.evaluated.push(id);

                let current = door.logical_open(services.doors.is_physically_open(id));
                let (want, opener) = self.desired_state(door, current, now, &services);
                if want != current {
                    if want {
                        to_open.push((id, opener));
                    } else {
                        to_close.push(id);
                    }
                }
            }
        }

        for (id, _) in &to_open {
            tracing::debug!("Opening {}", id);
            host.toggle(*id);
            report.opened.push(*id);
        }
        for id in &to_close {
            tracing::debug!("Closing {}", id);
            host.toggle(*id);
            report.closed.push(*id);
        }

        for id in &report.evaluated {
            if let Some(door) = registry.get_mut(*id) {
                door.predicates.on_cycle_end();
            }
        }

        for (id, opener) in &to_open {
            if let Some(door) = registry.get_mut(*id) {
                door.mark_opening(opener.as_ref(), &mut *host);
            }
        }

        tracing::debug!(
            "Cycle {}: {} evaluated, {} opened, {} closed, {} skipped, {} removed",
            report.cycle,
            report.evaluated.len(),
            report.opened.len(),
            report.closed.len(),
            report.skipped.len(),
            report.removed.len()
        );
        report
    }

    /// Host confirmation that a door finished moving
    ///
    /// A logical open starts the stay-open hold. With inverted doors the
    /// physical close is the logical open.
    pub fn on_toggle_finished(
        &mut self,
        registry: &mut DoorRegistry,
        id: DoorId,
        kind: ToggleKind,
        now: Instant,
    ) {
        let Some(door) = registry.get_mut(id) else {
            return;
        };
        let physically_open = match kind {
            ToggleKind::Static => return,
            ToggleKind::Open => true,
            ToggleKind::Close => false,
        };
        if door.logical_open(physically_open) {
            door.confirm_opened(now);
            tracing::debug!("{} opened, holding for {}s", id, door.stay_open_secs);
        }
    }

    fn check_available(&mut self, door: &DoorState, services: &Services<'_>, now: Instant) -> Option<SkipReason> {
        if !services.world.is_world_loaded(&door.world) {
            return Some(SkipReason::WorldUnloaded);
        }
        let ttl = services.config.chunk_cache_ttl();
        let loaded = self
            .chunk_cache
            .get_or_insert_with(&door.id, now, ttl, || services.doors.chunks_loaded(door.id));
        if !loaded {
            return Some(SkipReason::ChunksUnloaded);
        }
        if services.doors.is_busy(door.id) {
            return Some(SkipReason::Busy);
        }
        if !door.enabled {
            return Some(SkipReason::Disabled);
        }
        None
    }

    /// Desired logical state and the actor it was opened for
    ///
    /// Actors near the door are asked in host order and the first one the
    /// door opens for wins. The door is evaluated without an actor only
    /// when nobody is near it.
    fn desired_state(
        &mut self,
        door: &mut DoorState,
        current: bool,
        now: Instant,
        services: &Services<'_>,
    ) -> (bool, Option<Actor>) {
        if door.phase(now) != DoorPhase::Settled {
            return (true, None);
        }
        if !door.predicates.requires_actor_evaluation() {
            return (door.evaluate(None, current, now, services), None);
        }

        let radius = services.config.actor_check_radius;
        let ttl = services.config.actor_cache_ttl();
        let world = door.world.clone();
        let position = door.position;
        let ids = self.actor_cache.get_or_insert_with(&world, now, ttl, || {
            services
                .world
                .actors_in_world(&world)
                .into_iter()
                .map(|a| a.id)
                .collect()
        });

        let mut checked = false;
        let nearby = ids
            .into_iter()
            .filter_map(|id| services.world.actor(id))
            .filter(|a| a.world == world && near(position, a.position, radius));
        for actor in nearby {
            checked = true;
            if door.evaluate(Some(&actor), current, now, services) {
                return (true, Some(actor));
            }
        }
        if checked {
            return (false, None);
        }
        (door.evaluate(None, current, now, services), None)
    }
}

/// Cheap cuboid prefilter around the door
fn near(center: DVec3, point: DVec3, radius: f64) -> bool {
    let d = (point - center).abs();
    d.x <= radius && d.y <= radius && d.z <= radius
}
