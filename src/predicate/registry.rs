//! Registry of predicate kinds.
//!
//! This module provides the `PredicateRegistry`, the table that maps a
//! stable kind identifier (`time`, `itemClick`, ...) to its category,
//! scope, relative cost, argument factory and completion helper. It is
//! built once when the host starts and only read afterwards.

use ahash::AHashMap;
use thiserror::Error;

use super::{item, location, mob, permission, placeholder, time, weather};
use super::{Predicate, PredicateError};
use crate::core::error::{GateError, Result};
use crate::core::types::Scope;

/// Builds a predicate from command arguments
pub type Factory = fn(&[&str]) -> std::result::Result<Predicate, PredicateError>;

/// Suggests values for the last, partially typed argument
pub type Completion = fn(&[&str]) -> Vec<String>;

/// Relative evaluation costs. Cheaper predicates are asked first.
pub mod cost {
    /// Pure arithmetic on data already in memory
    pub const LOW: u32 = 10;
    /// A host lookup such as an inventory scan
    pub const MEDIUM: u32 = 50;
    /// Text substitution plus expression evaluation
    pub const HIGH: u32 = 100;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Predicate kind already registered: {0}")]
    DuplicateKind(String),

    #[error("Category {category} is {existing:?}-scoped, cannot register a {requested:?}-scoped kind")]
    ScopeConflict {
        category: String,
        existing: Scope,
        requested: Scope,
    },
}

/// Static description of one predicate kind
#[derive(Clone, Copy)]
pub struct PredicateDescriptor {
    pub kind: &'static str,
    pub category: &'static str,
    pub scope: Scope,
    pub cost: u32,
    pub factory: Factory,
    pub completion: Completion,
}

impl std::fmt::Debug for PredicateDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateDescriptor")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("scope", &self.scope)
            .field("cost", &self.cost)
            .finish()
    }
}

impl PredicateDescriptor {
    pub fn build(&self, args: &[&str]) -> std::result::Result<Predicate, PredicateError> {
        (self.factory)(args)
    }

    pub fn complete(&self, args: &[&str]) -> Vec<String> {
        (self.completion)(args)
    }
}

/// Registry of predicate kinds
#[derive(Debug, Clone, Default)]
pub struct PredicateRegistry {
    descriptors: Vec<PredicateDescriptor>,
    /// Lowercased kind to index into `descriptors`
    by_kind: AHashMap<String, usize>,
    /// Lowercased category to its canonical name and scope
    by_category: AHashMap<String, (&'static str, Scope)>,
}

impl PredicateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in predicate kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for descriptor in default_descriptors() {
            // Built-in table is consistent, a failure here is a bug in it
            if let Err(e) = registry.register(descriptor) {
                tracing::warn!("Skipping built-in predicate {}: {}", descriptor.kind, e);
            }
        }
        registry
    }

    pub fn register(&mut self, descriptor: PredicateDescriptor) -> std::result::Result<(), RegistryError> {
        let kind_key = descriptor.kind.to_ascii_lowercase();
        if self.by_kind.contains_key(&kind_key) {
            return Err(RegistryError::DuplicateKind(descriptor.kind.to_string()));
        }

        let category_key = descriptor.category.to_ascii_lowercase();
        if let Some((category, existing)) = self.by_category.get(&category_key) {
            if *existing != descriptor.scope {
                return Err(RegistryError::ScopeConflict {
                    category: category.to_string(),
                    existing: *existing,
                    requested: descriptor.scope,
                });
            }
        }

        self.by_category
            .entry(category_key)
            .or_insert((descriptor.category, descriptor.scope));
        self.by_kind.insert(kind_key, self.descriptors.len());
        self.descriptors.push(descriptor);

        tracing::debug!(
            "Registered predicate kind {} in category {}",
            descriptor.kind,
            descriptor.category
        );
        Ok(())
    }

    /// Look up a kind, ignoring case
    pub fn descriptor(&self, kind: &str) -> Option<&PredicateDescriptor> {
        self.by_kind
            .get(&kind.to_ascii_lowercase())
            .map(|&index| &self.descriptors[index])
    }

    pub fn descriptor_for(&self, predicate: &Predicate) -> Option<&PredicateDescriptor> {
        self.descriptor(predicate.kind())
    }

    /// Canonical name and scope of a category, ignoring case
    pub fn category(&self, name: &str) -> Option<(&'static str, Scope)> {
        self.by_category.get(&name.to_ascii_lowercase()).copied()
    }

    /// All category names, sorted
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> =
            self.by_category.values().map(|(name, _)| *name).collect();
        categories.sort_unstable();
        categories
    }

    /// Kinds belonging to a category, in registration order
    pub fn kinds_in(&self, category: &str) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter(|d| d.category.eq_ignore_ascii_case(category))
            .map(|d| d.kind)
            .collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PredicateDescriptor> {
        self.descriptors.iter()
    }

    /// Build a predicate of `kind` from command arguments
    pub fn build(&self, kind: &str, args: &[&str]) -> Result<Predicate> {
        let descriptor = self
            .descriptor(kind)
            .ok_or_else(|| GateError::UnknownKind(kind.to_string()))?;
        Ok(descriptor.build(args)?)
    }

    /// Completion suggestions for `kind`, empty for unknown kinds
    pub fn complete(&self, kind: &str, args: &[&str]) -> Vec<String> {
        self.descriptor(kind)
            .map(|descriptor| descriptor.complete(args))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn default_descriptors() -> Vec<PredicateDescriptor> {
    vec![
        PredicateDescriptor {
            kind: "time",
            category: "time",
            scope: Scope::Global,
            cost: cost::LOW,
            factory: time::from_args,
            completion: time::completions,
        },
        PredicateDescriptor {
            kind: "weather",
            category: "weather",
            scope: Scope::Global,
            cost: cost::LOW,
            factory: weather::from_args,
            completion: weather::completions,
        },
        PredicateDescriptor {
            kind: "mobKill",
            category: "mobKill",
            scope: Scope::Global,
            cost: cost::LOW,
            factory: mob::from_args,
            completion: mob::completions,
        },
        PredicateDescriptor {
            kind: "proximity",
            category: "location",
            scope: Scope::Actor,
            cost: cost::LOW,
            factory: location::proximity_from_args,
            completion: location::proximity_completions,
        },
        PredicateDescriptor {
            kind: "simpleRegion",
            category: "location",
            scope: Scope::Actor,
            cost: cost::LOW,
            factory: location::simple_region_from_args,
            completion: location::simple_region_completions,
        },
        PredicateDescriptor {
            kind: "region",
            category: "location",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: location::region_from_args,
            completion: location::region_completions,
        },
        PredicateDescriptor {
            kind: "permissionNode",
            category: "permission",
            scope: Scope::Actor,
            cost: cost::LOW,
            factory: permission::node_from_args,
            completion: permission::node_completions,
        },
        PredicateDescriptor {
            kind: "doorPermission",
            category: "permission",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: permission::door_from_args,
            completion: permission::door_completions,
        },
        PredicateDescriptor {
            kind: "itemHolding",
            category: "item",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: item::holding_from_args,
            completion: item::item_completions,
        },
        PredicateDescriptor {
            kind: "itemOwning",
            category: "item",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: item::owning_from_args,
            completion: item::item_completions,
        },
        PredicateDescriptor {
            kind: "itemClick",
            category: "item",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: item::click_from_args,
            completion: item::item_completions,
        },
        PredicateDescriptor {
            kind: "itemBlock",
            category: "item",
            scope: Scope::Actor,
            cost: cost::MEDIUM,
            factory: item::block_from_args,
            completion: item::block_completions,
        },
        PredicateDescriptor {
            kind: "placeholder",
            category: "placeholder",
            scope: Scope::Actor,
            cost: cost::HIGH,
            factory: placeholder::from_args,
            completion: placeholder::completions,
        },
    ]
}
