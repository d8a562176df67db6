//! Migration of the older timed-door format.
//!
//! A timed door combined a permission string, an open and a close tick and
//! a spherical open range in a single record. Each of those becomes a
//! regular predicate.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::DoorState;
use crate::core::error::{GateError, Result};
use crate::core::types::DoorId;
use crate::predicate::{
    PermissionNode, Predicate, PredicateRegistry, Proximity, ProximityForm, TimeWindow,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyTimedDoor {
    pub id: DoorId,
    pub world: String,
    pub position: DVec3,
    /// Empty when the door needed no permission
    pub permission: String,
    pub ticks_open: u64,
    pub ticks_close: u64,
    pub open_range: f64,
    pub invert_open: bool,
}

impl Default for LegacyTimedDoor {
    fn default() -> Self {
        Self {
            id: DoorId(0),
            world: String::new(),
            position: DVec3::ZERO,
            permission: String::new(),
            ticks_open: 14_000,
            ticks_close: 0,
            open_range: 10.0,
            invert_open: false,
        }
    }
}

impl LegacyTimedDoor {
    /// Opening and closing at the same tick meant "never open"
    pub fn is_permanently_closed(&self) -> bool {
        self.ticks_open == self.ticks_close
    }

    pub fn migrate(&self, registry: &PredicateRegistry) -> Result<DoorState> {
        let mut door = DoorState::new(self.id, self.world.clone(), self.position);
        door.invert_open = self.invert_open;

        let mut attach = |predicate: Predicate| -> Result<()> {
            let descriptor = registry
                .descriptor_for(&predicate)
                .ok_or_else(|| GateError::UnknownKind(predicate.kind().to_string()))?;
            door.predicates.insert(descriptor, predicate);
            Ok(())
        };

        if !self.permission.is_empty() {
            attach(Predicate::PermissionNode(PermissionNode::new(self.permission.clone())))?;
        }
        if !self.is_permanently_closed() {
            attach(Predicate::Time(TimeWindow::new(self.ticks_open, self.ticks_close, false)))?;
        }
        if self.open_range > 0.0 {
            attach(Predicate::Proximity(Proximity::new(
                DVec3::splat(self.open_range),
                ProximityForm::Ellipsoid,
            )))?;
        }

        tracing::info!(
            "Migrated timed door {} with {} conditions",
            self.id,
            door.predicates.len()
        );
        Ok(door)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> LegacyTimedDoor {
        LegacyTimedDoor {
            id: DoorId(3),
            world: "world".to_string(),
            position: DVec3::new(0.0, 70.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_migrate_defaults() {
        let registry = PredicateRegistry::with_defaults();
        let door = legacy().migrate(&registry).unwrap();

        assert_eq!(door.id, DoorId(3));
        assert!(door.predicates.contains("time"));
        assert!(!door.predicates.contains("permission"));
        match door.predicates.get("location") {
            Some(Predicate::Proximity(p)) => {
                assert_eq!(p.dimensions, DVec3::splat(10.0));
                assert_eq!(p.form, ProximityForm::Ellipsoid);
            }
            other => panic!("unexpected location predicate {:?}", other),
        }
    }

    #[test]
    fn test_migrate_permanently_closed_with_permission() {
        let registry = PredicateRegistry::with_defaults();
        let old = LegacyTimedDoor {
            permission: "doors.gate".to_string(),
            ticks_open: 500,
            ticks_close: 500,
            open_range: 0.0,
            invert_open: true,
            ..legacy()
        };
        let door = old.migrate(&registry).unwrap();

        assert!(door.invert_open);
        assert!(!door.predicates.contains("time"));
        assert!(!door.predicates.contains("location"));
        assert_eq!(door.predicates.get("permission").map(|p| p.kind()), Some("permissionNode"));
    }

    #[test]
    fn test_legacy_deserialises_with_defaults() {
        let old: LegacyTimedDoor =
            serde_json::from_str(r#"{"id": 9, "world": "nether", "position": [1.0, 2.0, 3.0]}"#).unwrap();
        assert_eq!(old.ticks_open, 14_000);
        assert_eq!(old.open_range, 10.0);
        assert!(!old.is_permanently_closed());
    }
}
