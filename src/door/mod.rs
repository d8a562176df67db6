//! Door state: configuration, predicate set and the open/hold state
//! machine of a single conditional door.
//!
//! A door moves through three phases:
//!
//! - `Settled`: predicates decide each cycle.
//! - `OpenPending`: the scheduler toggled the door open and waits for the
//!   host to confirm.
//! - `HeldOpen`: the host confirmed; the door stays open until
//!   `open_until` passes.
//!
//! In both non-settled phases the desired state is open regardless of
//! what the predicates say.

pub mod legacy;
pub mod registry;

use std::time::{Duration, Instant};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::error::{GateError, Result};
use crate::core::types::{Actor, DoorId};
use crate::host::WorldHost;
use crate::predicate::{DoorView, EvalContext, Predicate, PredicateRegistry, PredicateSet, Services, Slot};

pub use legacy::LegacyTimedDoor;
pub use registry::DoorRegistry;

/// How the votes of a door's predicates are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    #[default]
    And,
    Or,
    Custom,
}

impl EvaluationMode {
    pub fn name(self) -> &'static str {
        match self {
            EvaluationMode::And => "and",
            EvaluationMode::Or => "or",
            EvaluationMode::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorPhase {
    Settled,
    OpenPending,
    HeldOpen,
}

/// A conditional door
#[derive(Debug, Clone)]
pub struct DoorState {
    pub id: DoorId,
    pub world: String,
    pub position: DVec3,
    pub enabled: bool,
    pub mode: EvaluationMode,
    /// Translated expression, only meaningful in `Custom` mode
    pub custom_expression: String,
    /// The physical door is closed when this door is logically open
    pub invert_open: bool,
    pub stay_open_secs: u32,
    pub open_until: Option<Instant>,
    pub waiting_for_open: bool,
    pub predicates: PredicateSet,
}

impl DoorState {
    pub fn new(id: DoorId, world: impl Into<String>, position: DVec3) -> Self {
        Self {
            id,
            world: world.into(),
            position,
            enabled: true,
            mode: EvaluationMode::And,
            custom_expression: String::new(),
            invert_open: false,
            stay_open_secs: 0,
            open_until: None,
            waiting_for_open: false,
            predicates: PredicateSet::new(),
        }
    }

    pub fn phase(&self, now: Instant) -> DoorPhase {
        if self.waiting_for_open {
            DoorPhase::OpenPending
        } else if self.open_until.is_some_and(|until| until > now) {
            DoorPhase::HeldOpen
        } else {
            DoorPhase::Settled
        }
    }

    /// Logical open state for a physical one
    pub fn logical_open(&self, physically_open: bool) -> bool {
        physically_open != self.invert_open
    }

    /// Switch the combinator. Leaving custom mode drops the expression.
    pub fn set_mode(&mut self, mode: EvaluationMode) {
        if mode != EvaluationMode::Custom {
            self.custom_expression.clear();
        }
        self.mode = mode;
    }

    /// Desired logical state for `actor` (or for nobody)
    pub fn evaluate(
        &mut self,
        actor: Option<&Actor>,
        current_state: bool,
        now: Instant,
        services: &Services<'_>,
    ) -> bool {
        if self.phase(now) != DoorPhase::Settled {
            return true;
        }

        let ctx = EvalContext {
            door: DoorView {
                id: self.id,
                world: &self.world,
                position: self.position,
            },
            actor,
            current_state,
            now,
            services,
        };
        match self.mode {
            EvaluationMode::And => self.predicates.and(&ctx),
            EvaluationMode::Or => self.predicates.or(&ctx),
            EvaluationMode::Custom => self.predicates.custom(&self.custom_expression, &ctx),
        }
    }

    /// The scheduler toggled the door open
    ///
    /// Actor predicates get to consume what the actor paid with.
    pub fn mark_opening(&mut self, opened_by: Option<&Actor>, world: &mut dyn WorldHost) {
        self.waiting_for_open = true;
        if let Some(actor) = opened_by {
            self.predicates.on_opened(actor, world);
        }
    }

    /// The host reports the door finished opening
    pub fn confirm_opened(&mut self, now: Instant) {
        self.waiting_for_open = false;
        self.open_until = Some(now + Duration::from_secs(u64::from(self.stay_open_secs)));
    }

    /// Human readable summary, one line per fact
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} in {} at {:.0}/{:.0}/{:.0}", self.id, self.world, self.position.x, self.position.y, self.position.z),
            format!(
                "enabled: {}, inverted: {}, stays open: {}s",
                self.enabled, self.invert_open, self.stay_open_secs
            ),
        ];
        match self.mode {
            EvaluationMode::Custom => lines.push(format!("evaluator: custom {}", self.custom_expression)),
            mode => lines.push(format!("evaluator: {}", mode.name())),
        }
        if self.predicates.is_empty() {
            lines.push("no conditions".to_string());
        }
        for slot in self.predicates.slots() {
            lines.push(format!(
                "{} [{}, {:?}]: {}",
                slot.category,
                slot.predicate.kind(),
                slot.scope,
                slot.predicate.describe()
            ));
        }
        lines
    }

    pub fn to_record(&self) -> DoorRecord {
        let record = |slot: &Slot| PredicateRecord {
            category: slot.category.clone(),
            predicate: slot.predicate.clone(),
        };
        DoorRecord {
            id: self.id,
            world: self.world.clone(),
            position: self.position,
            enabled: self.enabled,
            mode: self.mode,
            custom_expression: self.custom_expression.clone(),
            invert_open: self.invert_open,
            stay_open_secs: self.stay_open_secs,
            global: self.predicates.global().map(record).collect(),
            actor: self.predicates.actor().map(record).collect(),
        }
    }

    /// Rebuild a door, taking category, scope and cost from the registry
    pub fn from_record(record: DoorRecord, registry: &PredicateRegistry) -> Result<Self> {
        let mut door = DoorState::new(record.id, record.world, record.position);
        door.enabled = record.enabled;
        door.mode = record.mode;
        door.custom_expression = record.custom_expression;
        door.invert_open = record.invert_open;
        door.stay_open_secs = record.stay_open_secs;

        for entry in record.global.into_iter().chain(record.actor) {
            let descriptor = registry
                .descriptor_for(&entry.predicate)
                .ok_or_else(|| GateError::UnknownKind(entry.predicate.kind().to_string()))?;
            if !descriptor.category.eq_ignore_ascii_case(&entry.category) {
                tracing::warn!(
                    "{}: stored category {} does not match kind {}, using {}",
                    door.id,
                    entry.category,
                    descriptor.kind,
                    descriptor.category
                );
            }
            door.predicates.insert(descriptor, entry.predicate);
        }
        Ok(door)
    }
}

/// Persisted form of one predicate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateRecord {
    pub category: String,
    pub predicate: Predicate,
}

/// Persisted form of a door
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorRecord {
    pub id: DoorId,
    pub world: String,
    pub position: DVec3,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: EvaluationMode,
    #[serde(default)]
    pub custom_expression: String,
    #[serde(default)]
    pub invert_open: bool,
    #[serde(default)]
    pub stay_open_secs: u32,
    #[serde(default)]
    pub global: Vec<PredicateRecord>,
    #[serde(default)]
    pub actor: Vec<PredicateRecord>,
}

fn default_enabled() -> bool {
    true
}
