//! Registry of conditional doors.
//!
//! This module provides the `DoorRegistry`, the context object that owns
//! every `DoorState` together with the predicate registry, the expression
//! engine and the configuration. The command layer mutates doors through
//! it and the scheduler borrows its parts for each cycle.

use std::collections::BTreeMap;

use glam::DVec3;

use super::{DoorRecord, DoorState, EvaluationMode};
use crate::core::config::GateConfig;
use crate::core::error::{GateError, Result};
use crate::core::types::DoorId;
use crate::expression::{validate, ExpressionEngine, Validation};
use crate::predicate::{Interaction, Predicate, PredicateRegistry};

/// Owner of all conditional doors
#[derive(Debug)]
pub struct DoorRegistry {
    doors: BTreeMap<DoorId, DoorState>,
    predicates: PredicateRegistry,
    engine: ExpressionEngine,
    config: GateConfig,
}

impl DoorRegistry {
    /// Registry with the built-in predicate kinds
    pub fn new(config: GateConfig) -> Self {
        Self::with_predicates(config, PredicateRegistry::with_defaults())
    }

    pub fn with_predicates(config: GateConfig, predicates: PredicateRegistry) -> Self {
        Self {
            doors: BTreeMap::new(),
            predicates,
            engine: ExpressionEngine::new(config.expression_cache_size),
            config,
        }
    }

    // === DOORS ===

    pub fn register(&mut self, door: DoorState) -> Result<()> {
        if self.doors.contains_key(&door.id) {
            return Err(GateError::DoorAlreadyRegistered(door.id));
        }
        tracing::info!("Registered {} in {}", door.id, door.world);
        self.doors.insert(door.id, door);
        Ok(())
    }

    /// The door with `id`, registering a blank one first if needed
    pub fn get_or_register(&mut self, id: DoorId, world: &str, position: DVec3) -> &mut DoorState {
        self.doors.entry(id).or_insert_with(|| {
            tracing::info!("Registered {} in {}", id, world);
            DoorState::new(id, world, position)
        })
    }

    pub fn unregister(&mut self, id: DoorId) -> Option<DoorState> {
        let removed = self.doors.remove(&id);
        if removed.is_some() {
            tracing::info!("Unregistered {}", id);
        }
        removed
    }

    pub fn get(&self, id: DoorId) -> Option<&DoorState> {
        self.doors.get(&id)
    }

    pub fn get_mut(&mut self, id: DoorId) -> Option<&mut DoorState> {
        self.doors.get_mut(&id)
    }

    fn door_mut(&mut self, id: DoorId) -> Result<&mut DoorState> {
        self.doors.get_mut(&id).ok_or(GateError::DoorNotFound(id))
    }

    /// Registered door ids in ascending order
    pub fn ids(&self) -> Vec<DoorId> {
        self.doors.keys().copied().collect()
    }

    pub fn doors(&self) -> impl Iterator<Item = &DoorState> {
        self.doors.values()
    }

    pub fn contains(&self, id: DoorId) -> bool {
        self.doors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }

    // === PREDICATES ===

    /// Attach a predicate to its category, returning the displaced one
    pub fn set_predicate(&mut self, id: DoorId, predicate: Predicate) -> Result<Option<Predicate>> {
        let Some(descriptor) = self.predicates.descriptor_for(&predicate).copied() else {
            tracing::warn!("{} refers to unregistered predicate kind {}", id, predicate.kind());
            return Err(GateError::UnknownKind(predicate.kind().to_string()));
        };
        let door = self.door_mut(id)?;
        Ok(door.predicates.insert(&descriptor, predicate))
    }

    /// Build a predicate of `kind` from command arguments and attach it
    pub fn set_predicate_from_args(
        &mut self,
        id: DoorId,
        kind: &str,
        args: &[&str],
    ) -> Result<Option<Predicate>> {
        if !self.doors.contains_key(&id) {
            return Err(GateError::DoorNotFound(id));
        }
        let predicate = self.predicates.build(kind, args)?;
        self.set_predicate(id, predicate)
    }

    pub fn remove_predicate(&mut self, id: DoorId, category: &str) -> Result<Option<Predicate>> {
        if self.predicates.category(category).is_none() {
            return Err(GateError::UnknownCategory(category.to_string()));
        }
        let door = self.door_mut(id)?;
        Ok(door.predicates.remove(category))
    }

    // === SETTINGS ===

    pub fn set_evaluation_mode(&mut self, id: DoorId, mode: EvaluationMode) -> Result<()> {
        self.door_mut(id)?.set_mode(mode);
        Ok(())
    }

    /// Validate `text` and, if it is fine, store its strict form and
    /// switch the door to custom evaluation
    ///
    /// Validation failures are returned as data and leave the door as it
    /// was.
    pub fn set_custom_expression(&mut self, id: DoorId, text: &str) -> Result<Validation> {
        let categories = self.predicates.categories();
        let door = self.door_mut(id)?;
        let validation = validate(text, &categories);
        if let Validation::Fine(normalized) = &validation {
            door.custom_expression = normalized.clone();
            door.mode = EvaluationMode::Custom;
        } else {
            tracing::debug!("Rejected expression for {}: {}", id, validation);
        }
        Ok(validation)
    }

    pub fn set_enabled(&mut self, id: DoorId, enabled: bool) -> Result<()> {
        self.door_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn set_invert_open(&mut self, id: DoorId, invert: bool) -> Result<()> {
        self.door_mut(id)?.invert_open = invert;
        Ok(())
    }

    pub fn set_stay_open(&mut self, id: DoorId, seconds: u32) -> Result<()> {
        self.door_mut(id)?.stay_open_secs = seconds;
        Ok(())
    }

    // === COPYING ===

    /// Copy predicates and settings of `source` onto `target`
    ///
    /// Runtime state such as open holds and recorded clicks is not copied.
    pub fn clone_door(&mut self, source: DoorId, target: DoorId) -> Result<()> {
        let from = self.doors.get(&source).ok_or(GateError::DoorNotFound(source))?;
        let predicates = from.predicates.copy();
        let mode = from.mode;
        let expression = from.custom_expression.clone();
        let stay_open_secs = from.stay_open_secs;
        let invert_open = from.invert_open;

        let to = self.door_mut(target)?;
        to.predicates = predicates;
        to.mode = mode;
        to.custom_expression = expression;
        to.stay_open_secs = stay_open_secs;
        to.invert_open = invert_open;
        tracing::debug!("Cloned conditions of {} to {}", source, target);
        Ok(())
    }

    /// Copy the predicate of one category from `source` to `target`
    pub fn copy_predicate(&mut self, source: DoorId, target: DoorId, category: &str) -> Result<()> {
        if self.predicates.category(category).is_none() {
            return Err(GateError::UnknownCategory(category.to_string()));
        }
        let from = self.doors.get(&source).ok_or(GateError::DoorNotFound(source))?;
        let slot = from
            .predicates
            .slot(category)
            .ok_or_else(|| GateError::PredicateNotSet {
                door: source,
                category: category.to_string(),
            })?;
        let mut slot = slot.clone();
        slot.predicate = slot.predicate.fresh_copy();

        let to = self.door_mut(target)?;
        to.predicates.remove(&slot.category);
        to.predicates.insert_slot(slot);
        Ok(())
    }

    // === EVENTS ===

    /// Feed a mob kill to every door. Returns the number of predicates
    /// that took it.
    pub fn record_mob_kill(&mut self, mob_type: &str) -> usize {
        self.doors
            .values_mut()
            .map(|door| door.predicates.on_mob_kill(mob_type))
            .sum()
    }

    /// Feed an item interaction to every door in the interaction's world
    pub fn record_interaction(&mut self, interaction: &Interaction) -> usize {
        self.doors
            .values_mut()
            .filter(|door| door.world == interaction.world)
            .map(|door| door.predicates.on_interaction(interaction, &door.world))
            .sum()
    }

    // === PERSISTENCE ===

    pub fn to_records(&self) -> Vec<DoorRecord> {
        self.doors.values().map(DoorState::to_record).collect()
    }

    /// Replace all doors with the given records
    pub fn from_records(&mut self, records: Vec<DoorRecord>) -> Result<()> {
        let mut doors = BTreeMap::new();
        for record in records {
            let door = DoorState::from_record(record, &self.predicates)?;
            doors.insert(door.id, door);
        }
        tracing::info!("Loaded {} doors", doors.len());
        self.doors = doors;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn from_json(&mut self, json: &str) -> Result<()> {
        let records: Vec<DoorRecord> = serde_json::from_str(json)?;
        self.from_records(records)
    }

    // === ACCESSORS ===

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Doors and the shared services, borrowed separately
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &mut BTreeMap<DoorId, DoorState>,
        &PredicateRegistry,
        &ExpressionEngine,
        &GateConfig,
    ) {
        (&mut self.doors, &self.predicates, &self.engine, &self.config)
    }
}
