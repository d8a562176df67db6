use serde::{Deserialize, Serialize};

use super::{args, complete, EvalContext, Predicate, PredicateError};
use crate::core::types::Tri;

/// Opens the door after a mob of the given type was killed
///
/// The kill flag survives until the end of the cycle in which the door was
/// evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobKill {
    pub mob_type: String,
    #[serde(skip)]
    killed: bool,
}

impl MobKill {
    pub fn new(mob_type: impl Into<String>) -> Self {
        Self {
            mob_type: mob_type.into(),
            killed: false,
        }
    }

    pub fn record_kill(&mut self, mob_type: &str) -> bool {
        if self.mob_type.eq_ignore_ascii_case(mob_type) {
            self.killed = true;
            return true;
        }
        false
    }

    pub fn killed(&self) -> bool {
        self.killed
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        if !ctx.services.integrations.mob_feed {
            return Tri::Abstain;
        }
        Tri::from_bool(self.killed)
    }

    pub(super) fn reset(&mut self) {
        self.killed = false;
    }

    pub(super) fn describe(&self) -> String {
        format!("open after a {} was killed", self.mob_type)
    }
}

pub(super) fn from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let mob_type = args::required(args, 0, "mob type")?;
    Ok(Predicate::MobKill(MobKill::new(mob_type)))
}

pub(super) fn completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("mob type"),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kill_matches_case_insensitively() {
        let mut mob = MobKill::new("SkeletonKing");
        assert!(!mob.record_kill("zombie"));
        assert!(!mob.killed());
        assert!(mob.record_kill("skeletonking"));
        assert!(mob.killed());

        mob.reset();
        assert!(!mob.killed());
    }
}
