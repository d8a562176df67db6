use serde::{Deserialize, Serialize};

use super::{args, complete, EvalContext, Predicate, PredicateError};
use crate::core::cache::TtlCache;
use crate::core::types::{ActorId, Tri};

/// Opens the door for actors holding a permission node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionNode {
    pub node: String,
}

impl PermissionNode {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        match ctx.actor {
            Some(actor) => Tri::from_bool(ctx.services.world.has_permission(actor.id, &self.node)),
            None => Tri::Abstain,
        }
    }

    pub(super) fn describe(&self) -> String {
        format!("requires permission {}", self.node)
    }
}

/// Access level on a door. Lower is stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Owner = 0,
    Editor = 1,
    User = 2,
}

impl AccessLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "owner" | "0" => Some(AccessLevel::Owner),
            "editor" | "1" => Some(AccessLevel::Editor),
            "user" | "2" => Some(AccessLevel::User),
            _ => None,
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessLevel::Owner => "owner",
            AccessLevel::Editor => "editor",
            AccessLevel::User => "user",
        }
    }
}

/// Opens the door for actors with at least the given access level on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorPermission {
    pub level: AccessLevel,
    #[serde(skip)]
    cache: TtlCache<ActorId, Option<u8>>,
}

impl DoorPermission {
    pub fn new(level: AccessLevel) -> Self {
        Self {
            level,
            cache: TtlCache::new(),
        }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        let ttl = ctx.services.config.access_cache_ttl();
        let rank = match self.cache.get(&actor.id, ctx.now, ttl) {
            Some(rank) => rank,
            None => {
                // Drop entries of actors that are gone
                self.cache.purge_expired(ctx.now, ttl);
                let rank = ctx
                    .services
                    .doors
                    .doors_owned_by(actor.id)
                    .into_iter()
                    .find(|owned| owned.door == ctx.door.id)
                    .map(|owned| owned.permission);
                self.cache.insert(actor.id, rank, ctx.now);
                rank
            }
        };

        Tri::from_bool(matches!(rank, Some(rank) if rank <= self.level.rank()))
    }

    pub(super) fn reset(&mut self) {
        self.cache.clear();
    }

    pub(super) fn describe(&self) -> String {
        format!("requires door access {} or better", self.level.name())
    }
}

pub(super) fn node_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let node = args::required(args, 0, "permission node")?;
    Ok(Predicate::PermissionNode(PermissionNode::new(node)))
}

pub(super) fn node_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("permission node"),
        _ => Vec::new(),
    }
}

pub(super) fn door_from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let raw = args::required(args, 0, "access level")?;
    let level = AccessLevel::parse(raw).ok_or_else(|| PredicateError::InvalidArgument {
        name: "access level",
        value: raw.to_string(),
    })?;
    Ok(Predicate::DoorPermission(DoorPermission::new(level)))
}

pub(super) fn door_completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, current) => complete::options(current, &["owner", "editor", "user"]),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use glam::DVec3;

    use super::*;
    use crate::core::config::GateConfig;
    use crate::core::types::{Actor, DoorId};
    use crate::expression::ExpressionEngine;
    use crate::host::memory::MemoryHost;
    use crate::host::Host;
    use crate::predicate::registry::PredicateRegistry;
    use crate::predicate::{DoorView, Services};

    fn access_vote(
        predicate: &mut DoorPermission,
        host: &MemoryHost,
        config: &GateConfig,
        actor: &Actor,
        now: Instant,
    ) -> Tri {
        let registry = PredicateRegistry::new();
        let engine = ExpressionEngine::default();
        let services = Services {
            doors: host,
            world: host,
            integrations: host.integrations(),
            registry: &registry,
            engine: &engine,
            config,
        };
        let ctx = EvalContext {
            door: DoorView {
                id: DoorId(1),
                world: "world",
                position: DVec3::ZERO,
            },
            actor: Some(actor),
            current_state: false,
            now,
            services: &services,
        };
        predicate.is_open(&ctx)
    }

    #[test]
    fn test_access_cache_expires_and_is_purged() {
        let config = GateConfig {
            access_cache_ttl_ms: 1_000,
            ..Default::default()
        };
        let mut host = MemoryHost::new();
        host.add_world("world");
        host.add_door(DoorId(1), "world", DVec3::ZERO);
        let visitor = Actor::new(ActorId::new(), "world", DVec3::ZERO);
        let owner = Actor::new(ActorId::new(), "world", DVec3::ZERO);
        host.grant_access(DoorId(1), owner.id, 0);

        let mut predicate = DoorPermission::new(AccessLevel::User);
        let t0 = Instant::now();
        assert_eq!(access_vote(&mut predicate, &host, &config, &visitor, t0), Tri::False);
        assert_eq!(access_vote(&mut predicate, &host, &config, &owner, t0), Tri::True);
        assert_eq!(predicate.cache.len(), 2);

        // Still trusted within the TTL
        host.grant_access(DoorId(1), visitor.id, 2);
        let t1 = t0 + Duration::from_millis(500);
        assert_eq!(access_vote(&mut predicate, &host, &config, &visitor, t1), Tri::False);

        // A miss after expiry drops every stale entry before refilling
        let t2 = t0 + Duration::from_secs(2);
        assert_eq!(access_vote(&mut predicate, &host, &config, &visitor, t2), Tri::True);
        assert_eq!(predicate.cache.len(), 1);
    }

    #[test]
    fn test_access_level_parse_and_rank() {
        assert_eq!(AccessLevel::parse("Owner"), Some(AccessLevel::Owner));
        assert_eq!(AccessLevel::parse("2"), Some(AccessLevel::User));
        assert_eq!(AccessLevel::parse("admin"), None);
        assert!(AccessLevel::Owner.rank() < AccessLevel::User.rank());
    }

    #[test]
    fn test_door_args() {
        let predicate = door_from_args(&["editor"]).unwrap();
        assert!(matches!(
            predicate,
            Predicate::DoorPermission(DoorPermission { level: AccessLevel::Editor, .. })
        ));
        assert!(door_from_args(&["nobody"]).is_err());
        assert_eq!(door_completions(&["e"]), vec!["editor"]);
    }
}
