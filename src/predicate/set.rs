//! Per-door predicate collection and the AND / OR / custom combinators.

use regex::Captures;
use serde::{Deserialize, Serialize};

use super::{EvalContext, Interaction, Predicate, PredicateDescriptor};
use crate::core::types::{Actor, Scope, Tri};
use crate::expression::translate::{identifier_regex, CURRENT_STATE};
use crate::host::WorldHost;

/// One active predicate and the registry facts needed to schedule it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub category: String,
    pub scope: Scope,
    pub cost: u32,
    pub predicate: Predicate,
}

impl Slot {
    /// Ask the predicate, abstaining for actor predicates without an actor
    fn vote(&mut self, ctx: &EvalContext<'_>) -> Tri {
        if self.scope == Scope::Actor && ctx.actor.is_none() {
            return Tri::Abstain;
        }
        self.predicate.is_open(ctx)
    }
}

/// AND over tri-state votes
///
/// Abstentions are skipped and the first `False` decides. With no `True`
/// at all the door keeps `current_state`.
pub fn conjunction<I>(votes: I, current_state: bool) -> bool
where
    I: IntoIterator<Item = Tri>,
{
    let mut any_true = false;
    for vote in votes {
        match vote {
            Tri::False => return false,
            Tri::True => any_true = true,
            Tri::Abstain => {}
        }
    }
    any_true || current_state
}

/// OR over tri-state votes
///
/// The first `True` decides. With at least one `False` and no `True` the
/// result is false. If everything abstains the door keeps `current_state`.
pub fn disjunction<I>(votes: I, current_state: bool) -> bool
where
    I: IntoIterator<Item = Tri>,
{
    let mut any_false = false;
    for vote in votes {
        match vote {
            Tri::True => return true,
            Tri::False => any_false = true,
            Tri::Abstain => {}
        }
    }
    if any_false {
        false
    } else {
        current_state
    }
}

/// The predicates attached to one door, at most one per category
///
/// Slots are kept ordered by ascending cost, then category name, which is
/// also the order in which the combinators ask them.
#[derive(Debug, Clone, Default)]
pub struct PredicateSet {
    slots: Vec<Slot>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a predicate into its category, returning the one it displaced
    pub fn insert(&mut self, descriptor: &PredicateDescriptor, predicate: Predicate) -> Option<Predicate> {
        let displaced = self.remove(descriptor.category);
        self.insert_slot(Slot {
            category: descriptor.category.to_string(),
            scope: descriptor.scope,
            cost: descriptor.cost,
            predicate,
        });
        displaced
    }

    pub(crate) fn insert_slot(&mut self, slot: Slot) {
        let index = self
            .slots
            .partition_point(|s| (s.cost, s.category.as_str()) <= (slot.cost, slot.category.as_str()));
        self.slots.insert(index, slot);
    }

    pub fn remove(&mut self, category: &str) -> Option<Predicate> {
        let index = self.position(category)?;
        Some(self.slots.remove(index).predicate)
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.category.eq_ignore_ascii_case(category))
    }

    pub fn get(&self, category: &str) -> Option<&Predicate> {
        self.position(category).map(|i| &self.slots[i].predicate)
    }

    pub fn get_mut(&mut self, category: &str) -> Option<&mut Predicate> {
        self.position(category).map(move |i| &mut self.slots[i].predicate)
    }

    pub fn slot(&self, category: &str) -> Option<&Slot> {
        self.position(category).map(|i| &self.slots[i])
    }

    pub fn contains(&self, category: &str) -> bool {
        self.position(category).is_some()
    }

    /// All slots in evaluation order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn global(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.scope == Scope::Global)
    }

    pub fn actor(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.scope == Scope::Actor)
    }

    /// True if any predicate needs to be asked per actor
    pub fn requires_actor_evaluation(&self) -> bool {
        self.slots.iter().any(|s| s.scope == Scope::Actor)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Independent copy with fresh runtime state in every predicate
    pub fn copy(&self) -> PredicateSet {
        PredicateSet {
            slots: self
                .slots
                .iter()
                .map(|slot| Slot {
                    predicate: slot.predicate.fresh_copy(),
                    ..slot.clone()
                })
                .collect(),
        }
    }

    pub fn and(&mut self, ctx: &EvalContext<'_>) -> bool {
        conjunction(self.slots.iter_mut().map(|slot| slot.vote(ctx)), ctx.current_state)
    }

    pub fn or(&mut self, ctx: &EvalContext<'_>) -> bool {
        disjunction(self.slots.iter_mut().map(|slot| slot.vote(ctx)), ctx.current_state)
    }

    /// Evaluate a translated custom expression
    ///
    /// Every category name is replaced by its vote literal, unset but
    /// registered categories by `null`, and `currentState` by the door's
    /// logical state. The engine's result falls back to the current state.
    pub fn custom(&mut self, expression: &str, ctx: &EvalContext<'_>) -> bool {
        let substituted = self.substitute(expression, ctx);
        ctx.services.engine.eval(&substituted, ctx.current_state)
    }

    /// The expression with every known name replaced by a literal
    pub fn substitute(&mut self, expression: &str, ctx: &EvalContext<'_>) -> String {
        let votes: Vec<(String, Tri)> = self
            .slots
            .iter_mut()
            .map(|slot| (slot.category.clone(), slot.vote(ctx)))
            .collect();
        let current = Tri::from_bool(ctx.current_state).literal();
        let registry = ctx.services.registry;

        identifier_regex()
            .replace_all(expression, |caps: &Captures| {
                let name = &caps[0];
                if name.eq_ignore_ascii_case(CURRENT_STATE) {
                    return current.to_string();
                }
                if let Some((_, vote)) = votes.iter().find(|(c, _)| c.eq_ignore_ascii_case(name)) {
                    return vote.literal().to_string();
                }
                if registry.category(name).is_some() {
                    return Tri::Abstain.literal().to_string();
                }
                name.to_string()
            })
            .into_owned()
    }

    pub fn on_cycle_end(&mut self) {
        for slot in &mut self.slots {
            slot.predicate.on_cycle_end();
        }
    }

    pub fn on_opened(&mut self, actor: &Actor, world: &mut dyn WorldHost) {
        for slot in &mut self.slots {
            slot.predicate.on_opened(actor, world);
        }
    }

    /// Returns the number of predicates that accepted the kill
    pub fn on_mob_kill(&mut self, mob_type: &str) -> usize {
        self.slots
            .iter_mut()
            .map(|slot| slot.predicate.on_mob_kill(mob_type))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Returns the number of predicates that accepted the interaction
    pub fn on_interaction(&mut self, interaction: &Interaction, door_world: &str) -> usize {
        self.slots
            .iter_mut()
            .map(|slot| slot.predicate.on_interaction(interaction, door_world))
            .filter(|accepted| *accepted)
            .count()
    }
}
