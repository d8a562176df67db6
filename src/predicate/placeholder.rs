use serde::{Deserialize, Serialize};

use super::{args, complete, EvalContext, Predicate, PredicateError};
use crate::core::types::Tri;
use crate::expression::translate;

/// Opens the door when a host placeholder expression evaluates to true
///
/// The host substitutes its placeholders for the actor first. The result is
/// translated like a custom evaluator and handed to the expression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    pub expression: String,
}

impl Placeholder {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let Some(actor) = ctx.actor else {
            return Tri::Abstain;
        };
        let Some(source) = ctx.services.integrations.placeholders else {
            tracing::warn!(
                "Placeholder predicate on {} needs a placeholder integration, abstaining",
                ctx.door.id
            );
            return Tri::Abstain;
        };

        let substituted = source.substitute(actor, &self.expression);
        Tri::from_option(ctx.services.engine.try_eval(&translate(&substituted)))
    }

    pub(super) fn describe(&self) -> String {
        format!("placeholder expression {}", self.expression)
    }
}

pub(super) fn from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    args::required(args, 0, "expression")?;
    Ok(Predicate::Placeholder(Placeholder::new(args.join(" "))))
}

pub(super) fn completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("expression"),
        (_, current) => complete::options(current, &["and", "or", "not", "is", "true", "false"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args_joins_expression() {
        let predicate = from_args(&["%player_level%", "is", "true"]).unwrap();
        match predicate {
            Predicate::Placeholder(p) => assert_eq!(p.expression, "%player_level% is true"),
            other => panic!("unexpected predicate {:?}", other),
        }
        assert!(from_args(&[]).is_err());
    }
}
