//! Door predicates: small stateful units that vote on whether a door
//! should be open.
//!
//! Each predicate belongs to a category (`time`, `location`, `item`, ...)
//! and a scope. Global predicates are evaluated once per door and cycle,
//! actor predicates once per candidate actor. A predicate answers with a
//! [`Tri`]: `Abstain` when it has no opinion, for instance because an
//! integration is missing or no actor is in context.

pub mod item;
pub mod location;
pub mod mob;
pub mod permission;
pub mod placeholder;
pub mod registry;
pub mod set;
pub mod time;
pub mod weather;

use std::time::Instant;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::GateConfig;
use crate::core::types::{Actor, BlockPos, DoorId, Tri};
use crate::expression::ExpressionEngine;
use crate::host::{DoorHost, Integrations, WorldHost};

pub use item::{Interaction, ItemBlock, ItemClick, ItemHolding, ItemOwning};
pub use location::{Proximity, ProximityForm, RegionMember, SimpleRegion};
pub use mob::MobKill;
pub use permission::{AccessLevel, DoorPermission, PermissionNode};
pub use placeholder::Placeholder;
pub use registry::{PredicateDescriptor, PredicateRegistry, RegistryError};
pub use set::{PredicateSet, Slot};
pub use time::TimeWindow;
pub use weather::{WeatherGate, WeatherKind};

/// Errors raised while building a predicate from command arguments
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Everything outside the door that predicates may consult
pub struct Services<'a> {
    pub doors: &'a dyn DoorHost,
    pub world: &'a dyn WorldHost,
    pub integrations: Integrations<'a>,
    pub registry: &'a PredicateRegistry,
    pub engine: &'a ExpressionEngine,
    pub config: &'a GateConfig,
}

/// The door being evaluated
#[derive(Debug, Clone, Copy)]
pub struct DoorView<'a> {
    pub id: DoorId,
    pub world: &'a str,
    pub position: DVec3,
}

/// Input of a single predicate evaluation
pub struct EvalContext<'a> {
    pub door: DoorView<'a>,
    /// Actor the door is evaluated for, if any
    pub actor: Option<&'a Actor>,
    /// Logical open state of the door before this evaluation
    pub current_state: bool,
    pub now: Instant,
    pub services: &'a Services<'a>,
}

/// A configured predicate instance
///
/// The serde tag doubles as the stable kind identifier used by the
/// registry and by persisted door records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Predicate {
    Time(TimeWindow),
    Weather(WeatherGate),
    MobKill(MobKill),
    Proximity(Proximity),
    SimpleRegion(SimpleRegion),
    Region(RegionMember),
    PermissionNode(PermissionNode),
    DoorPermission(DoorPermission),
    ItemHolding(ItemHolding),
    ItemOwning(ItemOwning),
    ItemClick(ItemClick),
    ItemBlock(ItemBlock),
    Placeholder(Placeholder),
}

impl Predicate {
    pub fn kind(&self) -> &'static str {
        match self {
            Predicate::Time(_) => "time",
            Predicate::Weather(_) => "weather",
            Predicate::MobKill(_) => "mobKill",
            Predicate::Proximity(_) => "proximity",
            Predicate::SimpleRegion(_) => "simpleRegion",
            Predicate::Region(_) => "region",
            Predicate::PermissionNode(_) => "permissionNode",
            Predicate::DoorPermission(_) => "doorPermission",
            Predicate::ItemHolding(_) => "itemHolding",
            Predicate::ItemOwning(_) => "itemOwning",
            Predicate::ItemClick(_) => "itemClick",
            Predicate::ItemBlock(_) => "itemBlock",
            Predicate::Placeholder(_) => "placeholder",
        }
    }

    pub fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        match self {
            Predicate::Time(p) => p.is_open(ctx),
            Predicate::Weather(p) => p.is_open(ctx),
            Predicate::MobKill(p) => p.is_open(ctx),
            Predicate::Proximity(p) => p.is_open(ctx),
            Predicate::SimpleRegion(p) => p.is_open(ctx),
            Predicate::Region(p) => p.is_open(ctx),
            Predicate::PermissionNode(p) => p.is_open(ctx),
            Predicate::DoorPermission(p) => p.is_open(ctx),
            Predicate::ItemHolding(p) => p.is_open(ctx),
            Predicate::ItemOwning(p) => p.is_open(ctx),
            Predicate::ItemClick(p) => p.is_open(ctx),
            Predicate::ItemBlock(p) => p.is_open(ctx),
            Predicate::Placeholder(p) => p.is_open(ctx),
        }
    }

    /// Called once for every door that was evaluated in a cycle
    pub fn on_cycle_end(&mut self) {
        match self {
            Predicate::MobKill(p) => p.reset(),
            Predicate::ItemClick(p) => p.reset(),
            Predicate::ItemBlock(p) => p.reset(),
            _ => {}
        }
    }

    /// Called once when the scheduler decides to open the door for `actor`
    pub fn on_opened(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        match self {
            Predicate::ItemHolding(p) => p.consume(actor, world),
            Predicate::ItemOwning(p) => p.consume(actor, world),
            Predicate::ItemClick(p) => p.consume(actor, world),
            Predicate::ItemBlock(p) => p.consume(actor, world),
            _ => {}
        }
    }

    /// Feed a mob kill. Returns true if this predicate listens for it.
    pub fn on_mob_kill(&mut self, mob_type: &str) -> bool {
        match self {
            Predicate::MobKill(p) => p.record_kill(mob_type),
            _ => false,
        }
    }

    /// Feed an item interaction. Returns true if this predicate accepted it.
    pub fn on_interaction(&mut self, interaction: &Interaction, door_world: &str) -> bool {
        match self {
            Predicate::ItemClick(p) => p.record_click(interaction),
            Predicate::ItemBlock(p) => p.record_click(interaction, door_world),
            _ => false,
        }
    }

    /// Forget all per-cycle and cached state, keeping the configuration
    pub fn reset_runtime(&mut self) {
        match self {
            Predicate::Time(p) => p.reset(),
            Predicate::Weather(p) => p.reset(),
            Predicate::DoorPermission(p) => p.reset(),
            other => other.on_cycle_end(),
        }
    }

    /// Copy of the configuration with fresh runtime state
    pub fn fresh_copy(&self) -> Predicate {
        let mut copy = self.clone();
        copy.reset_runtime();
        copy
    }

    /// One-line human readable summary
    pub fn describe(&self) -> String {
        match self {
            Predicate::Time(p) => p.describe(),
            Predicate::Weather(p) => p.describe(),
            Predicate::MobKill(p) => p.describe(),
            Predicate::Proximity(p) => p.describe(),
            Predicate::SimpleRegion(p) => p.describe(),
            Predicate::Region(p) => p.describe(),
            Predicate::PermissionNode(p) => p.describe(),
            Predicate::DoorPermission(p) => p.describe(),
            Predicate::ItemHolding(p) => p.describe(),
            Predicate::ItemOwning(p) => p.describe(),
            Predicate::ItemClick(p) => p.describe(),
            Predicate::ItemBlock(p) => p.describe(),
            Predicate::Placeholder(p) => p.describe(),
        }
    }
}

/// Report a desired state only when it changed, unless `force` is set
pub(crate) fn report_transition(last: &mut Option<bool>, want: bool, force: bool) -> Tri {
    if force || *last != Some(want) {
        *last = Some(want);
        Tri::from_bool(want)
    } else {
        Tri::Abstain
    }
}

/// Argument parsing shared by the predicate factories
pub(crate) mod args {
    use super::*;

    pub fn required<'a>(
        args: &[&'a str],
        index: usize,
        name: &'static str,
    ) -> Result<&'a str, PredicateError> {
        args.get(index)
            .copied()
            .filter(|s| !s.is_empty())
            .ok_or(PredicateError::MissingArgument(name))
    }

    /// Optional `true`/`false` flag, false when absent
    pub fn flag(args: &[&str], index: usize, name: &'static str) -> Result<bool, PredicateError> {
        match args.get(index) {
            None => Ok(false),
            Some(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(s) => Err(PredicateError::InvalidArgument {
                name,
                value: s.to_string(),
            }),
        }
    }

    pub fn number(s: &str, name: &'static str) -> Result<f64, PredicateError> {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| PredicateError::InvalidArgument {
                name,
                value: s.to_string(),
            })
    }

    pub fn in_range(value: f64, min: f64, max: f64, name: &'static str) -> Result<f64, PredicateError> {
        if value < min || value > max {
            return Err(PredicateError::OutOfRange { name, value, min, max });
        }
        Ok(value)
    }

    /// `x,y,z` triple
    pub fn vector(s: &str, name: &'static str) -> Result<DVec3, PredicateError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(PredicateError::InvalidArgument {
                name,
                value: s.to_string(),
            });
        }
        Ok(DVec3::new(
            number(parts[0], name)?,
            number(parts[1], name)?,
            number(parts[2], name)?,
        ))
    }

    pub fn block(s: &str, name: &'static str) -> Result<BlockPos, PredicateError> {
        Ok(BlockPos::containing(vector(s, name)?))
    }

    /// Item stack amount, 1..=64
    pub fn amount(s: &str) -> Result<u32, PredicateError> {
        let value = number(s, "amount")?;
        if value.fract() != 0.0 {
            return Err(PredicateError::InvalidArgument {
                name: "amount",
                value: s.to_string(),
            });
        }
        Ok(in_range(value, 1.0, 64.0, "amount")? as u32)
    }
}

/// Completion helpers shared by the predicate descriptors
pub(crate) mod complete {
    /// Options starting with the partially typed `current` argument
    pub fn options(current: &str, options: &[&str]) -> Vec<String> {
        let lower = current.to_ascii_lowercase();
        options
            .iter()
            .filter(|o| o.to_ascii_lowercase().starts_with(&lower))
            .map(|o| o.to_string())
            .collect()
    }

    /// A placeholder describing the expected argument
    pub fn hint(text: &str) -> Vec<String> {
        vec![format!("<{}>", text)]
    }

    pub fn flag(current: &str, name: &str) -> Vec<String> {
        if current.is_empty() {
            vec![format!("[{}]", name), "true".to_string(), "false".to_string()]
        } else {
            options(current, &["true", "false"])
        }
    }

    /// Index and content of the argument being typed
    pub fn current<'a>(args: &[&'a str]) -> (usize, &'a str) {
        match args.len() {
            0 => (0, ""),
            n => (n - 1, args[n - 1]),
        }
    }
}
