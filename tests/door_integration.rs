//! Integration tests for door configuration
//!
//! Covers the registry command surface end to end:
//! - Persisted doors behave the same after a reload
//! - Legacy timed doors migrate into working predicate sets
//! - Cloning and copying predicates between doors
//! - Item and access predicates driven through the scheduler

use std::time::Instant;

use gatekeeper::core::config::GateConfig;
use gatekeeper::core::error::GateError;
use gatekeeper::core::types::{Actor, ActorId, DoorId};
use gatekeeper::door::{DoorRegistry, EvaluationMode, LegacyTimedDoor};
use gatekeeper::host::memory::MemoryHost;
use gatekeeper::host::WorldHost;
use gatekeeper::predicate::{Interaction, Predicate};
use gatekeeper::scheduler::DoorScheduler;
use glam::DVec3;

const WORLD: &str = "world";

fn config() -> GateConfig {
    GateConfig {
        refresh_rate: 1,
        ..Default::default()
    }
}

fn world_with_doors(ids: &[u64]) -> (DoorRegistry, MemoryHost) {
    let mut registry = DoorRegistry::new(config());
    let mut host = MemoryHost::new();
    host.add_world(WORLD);
    for &id in ids {
        let position = DVec3::new(id as f64 * 100.0, 64.0, 0.0);
        host.add_door(DoorId(id), WORLD, position);
        registry.get_or_register(DoorId(id), WORLD, position);
    }
    (registry, host)
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_reloaded_doors_keep_their_configuration() {
    let (mut registry, _) = world_with_doors(&[1, 2]);
    registry
        .set_predicate_from_args(DoorId(1), "itemClick", &["key", "1", "true"])
        .unwrap();
    registry
        .set_predicate_from_args(DoorId(1), "time", &["08:00", "20:00", "true"])
        .unwrap();
    registry
        .set_custom_expression(DoorId(1), "item or time")
        .unwrap();
    registry.set_invert_open(DoorId(1), true).unwrap();
    registry.set_stay_open(DoorId(1), 12).unwrap();
    registry.set_enabled(DoorId(2), false).unwrap();

    let json = registry.to_json().unwrap();
    let mut restored = DoorRegistry::new(config());
    restored.from_json(&json).unwrap();

    for id in [DoorId(1), DoorId(2)] {
        assert_eq!(
            restored.get(id).unwrap().describe(),
            registry.get(id).unwrap().describe()
        );
    }
    let door = restored.get(DoorId(1)).unwrap();
    assert_eq!(door.mode, EvaluationMode::Custom);
    assert_eq!(door.custom_expression, "item||time");
    assert!(!restored.get(DoorId(2)).unwrap().enabled);
}

#[test]
fn test_malformed_json_is_rejected() {
    let mut registry = DoorRegistry::new(config());
    assert!(matches!(
        registry.from_json("[{\"id\": 1}]"),
        Err(GateError::SerdeError(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_records_with_unknown_kinds_fail_to_load() {
    let mut registry = DoorRegistry::new(config());
    let json = r#"[{
        "id": 4,
        "world": "world",
        "position": [0.0, 64.0, 0.0],
        "global": [{"category": "time", "predicate": {"kind": "teleport"}}]
    }]"#;
    assert!(registry.from_json(json).is_err());
}

// ============================================================================
// Legacy migration
// ============================================================================

/// A migrated timed door opens only for permitted actors inside its range
/// during its time window
#[test]
fn test_migrated_timed_door_opens_for_permitted_actor() {
    let (mut registry, mut host) = world_with_doors(&[]);
    let legacy = LegacyTimedDoor {
        id: DoorId(21),
        world: WORLD.to_string(),
        position: DVec3::new(0.0, 64.0, 0.0),
        permission: "doors.timed".to_string(),
        ticks_open: 0,
        ticks_close: 12_000,
        open_range: 4.0,
        invert_open: false,
    };
    let door = legacy.migrate(registry.predicates()).unwrap();
    assert_eq!(door.predicates.len(), 3);
    registry.register(door).unwrap();
    host.add_door(DoorId(21), WORLD, DVec3::new(0.0, 64.0, 0.0));
    host.set_time(WORLD, 1_000);

    let outsider = ActorId::new();
    host.add_actor(Actor::new(outsider, WORLD, DVec3::new(1.0, 64.0, 1.0)));

    let mut scheduler = DoorScheduler::new(&registry);
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert!(report.opened.is_empty());

    host.grant_permission(outsider, "doors.timed");
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert_eq!(report.opened, vec![DoorId(21)]);
}

#[test]
fn test_legacy_json_migrates_with_defaults() {
    let registry = DoorRegistry::new(config());
    let legacy: LegacyTimedDoor =
        serde_json::from_str(r#"{"id": 5, "world": "world", "position": [0.0, 0.0, 0.0]}"#).unwrap();
    let door = legacy.migrate(registry.predicates()).unwrap();

    assert!(door.predicates.contains("time"));
    assert!(door.predicates.contains("location"));
    assert!(!door.predicates.contains("permission"));
}

// ============================================================================
// Cloning and copying
// ============================================================================

#[test]
fn test_cloned_door_is_independent() {
    let (mut registry, _) = world_with_doors(&[1, 2]);
    registry
        .set_predicate_from_args(DoorId(1), "proximity", &["3"])
        .unwrap();
    registry
        .set_predicate_from_args(DoorId(1), "permissionNode", &["doors.use"])
        .unwrap();
    registry.clone_door(DoorId(1), DoorId(2)).unwrap();

    registry.remove_predicate(DoorId(2), "permission").unwrap();
    assert_eq!(registry.get(DoorId(1)).unwrap().predicates.len(), 2);
    assert_eq!(registry.get(DoorId(2)).unwrap().predicates.len(), 1);

    assert!(matches!(
        registry.clone_door(DoorId(1), DoorId(9)),
        Err(GateError::DoorNotFound(DoorId(9)))
    ));
}

#[test]
fn test_copy_predicate_replaces_target_category() {
    let (mut registry, _) = world_with_doors(&[1, 2]);
    registry
        .set_predicate_from_args(DoorId(1), "simpleRegion", &["world", "0,0,0", "8,80,8"])
        .unwrap();
    registry
        .set_predicate_from_args(DoorId(2), "proximity", &["2"])
        .unwrap();

    registry.copy_predicate(DoorId(1), DoorId(2), "location").unwrap();
    let target = registry.get(DoorId(2)).unwrap();
    assert_eq!(target.predicates.len(), 1);
    assert_eq!(target.predicates.get("location").map(Predicate::kind), Some("simpleRegion"));

    assert!(matches!(
        registry.copy_predicate(DoorId(1), DoorId(2), "banana"),
        Err(GateError::UnknownCategory(_))
    ));
}

// ============================================================================
// Item and access predicates
// ============================================================================

/// A click with the key opens the door once and takes the key
#[test]
fn test_item_click_opens_and_consumes() {
    let (mut registry, mut host) = world_with_doors(&[1]);
    registry
        .set_predicate_from_args(DoorId(1), "itemClick", &["key", "1", "true"])
        .unwrap();

    let actor = ActorId::new();
    host.add_actor(Actor::new(actor, WORLD, DVec3::new(101.0, 64.0, 0.0)));
    host.set_hand(actor, "key", 2);

    let mut scheduler = DoorScheduler::new(&registry);
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert!(report.opened.is_empty());

    assert_eq!(registry.record_interaction(&Interaction::click(actor, WORLD, "key")), 1);
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert_eq!(report.opened, vec![DoorId(1)]);
    assert!(host.has_item_in_hand(actor, "key", 1));
    assert!(!host.has_item_in_hand(actor, "key", 2));
}

#[test]
fn test_door_access_level() {
    let (mut registry, mut host) = world_with_doors(&[1]);
    registry
        .set_predicate_from_args(DoorId(1), "doorPermission", &["editor"])
        .unwrap();

    let user = ActorId::new();
    let editor = ActorId::new();
    host.add_actor(Actor::new(user, WORLD, DVec3::new(100.0, 64.0, 2.0)));
    host.grant_access(DoorId(1), user, 2);

    let mut scheduler = DoorScheduler::new(&registry);
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert!(report.opened.is_empty());

    host.add_actor(Actor::new(editor, WORLD, DVec3::new(100.0, 64.0, -2.0)));
    host.grant_access(DoorId(1), editor, 1);
    // Drop the cached actor list
    scheduler.reload(&registry);
    let report = scheduler.tick(&mut registry, &mut host, Instant::now());
    assert_eq!(report.opened, vec![DoorId(1)]);
}
