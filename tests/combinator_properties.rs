//! Property-based tests for vote combinators and expression translation.
//!
//! Uses proptest to check that combinator outcomes depend only on which
//! votes are present, never on their order.

use gatekeeper::core::types::Tri;
use gatekeeper::expression::{translate, ExpressionEngine};
use gatekeeper::predicate::set::{conjunction, disjunction};
use proptest::prelude::*;

fn vote() -> impl Strategy<Value = Tri> {
    prop_oneof![Just(Tri::True), Just(Tri::False), Just(Tri::Abstain)]
}

fn votes() -> impl Strategy<Value = Vec<Tri>> {
    prop::collection::vec(vote(), 0..8)
}

// =============================================================================
// Conjunction
// =============================================================================

proptest! {
    /// Any `False` closes the door
    #[test]
    fn prop_and_false_wins(mut v in votes(), at in 0usize..8, current: bool) {
        let at = at.min(v.len());
        v.insert(at, Tri::False);
        prop_assert!(!conjunction(v, current));
    }

    /// Without `False`, a single `True` opens the door
    #[test]
    fn prop_and_true_without_false(v in votes(), current: bool) {
        let v: Vec<Tri> = v.into_iter().filter(|t| *t != Tri::False).collect();
        let expected = v.contains(&Tri::True) || current;
        prop_assert_eq!(conjunction(v, current), expected);
    }

    /// Reversing the votes never changes the outcome
    #[test]
    fn prop_and_order_independent(v in votes(), current: bool) {
        let reversed: Vec<Tri> = v.iter().rev().copied().collect();
        prop_assert_eq!(conjunction(v, current), conjunction(reversed, current));
    }
}

// =============================================================================
// Disjunction
// =============================================================================

proptest! {
    /// Any `True` opens the door
    #[test]
    fn prop_or_true_wins(mut v in votes(), at in 0usize..8, current: bool) {
        let at = at.min(v.len());
        v.insert(at, Tri::True);
        prop_assert!(disjunction(v, current));
    }

    /// Without `True`, a single `False` closes the door
    #[test]
    fn prop_or_false_without_true(v in votes(), current: bool) {
        let v: Vec<Tri> = v.into_iter().filter(|t| *t != Tri::True).collect();
        let expected = if v.contains(&Tri::False) { false } else { current };
        prop_assert_eq!(disjunction(v, current), expected);
    }

    #[test]
    fn prop_or_order_independent(v in votes(), current: bool) {
        let reversed: Vec<Tri> = v.iter().rev().copied().collect();
        prop_assert_eq!(disjunction(v, current), disjunction(reversed, current));
    }
}

// =============================================================================
// Abstention
// =============================================================================

proptest! {
    /// When everybody abstains both combinators keep the current state
    #[test]
    fn prop_all_abstain_keeps_state(n in 0usize..8, current: bool) {
        let v = vec![Tri::Abstain; n];
        prop_assert_eq!(conjunction(v.clone(), current), current);
        prop_assert_eq!(disjunction(v, current), current);
    }
}

// =============================================================================
// Expressions
// =============================================================================

fn literal() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("true"), Just("false"), Just("null")]
}

proptest! {
    /// Translating twice is the same as translating once
    #[test]
    fn prop_translate_idempotent(
        words in prop::collection::vec(
            prop_oneof![
                Just("time"), Just("and"), Just("or"), Just("is"), Just("not"),
                Just("location"), Just("("), Just(")"), Just("currentState"),
            ],
            0..10,
        )
    ) {
        let once = translate(&words.join(" "));
        prop_assert_eq!(translate(&once), once);
    }

    /// `a or b` over literals yields the deciding operand, and the engine
    /// falls back to the default on `null`
    #[test]
    fn prop_engine_or_of_literals(a in literal(), b in literal(), default: bool) {
        let engine = ExpressionEngine::new(16);
        let result = engine.eval(&translate(&format!("{} or {}", a, b)), default);
        let expected = match (a, b) {
            ("true", _) | (_, "true") => true,
            (_, "false") => false,
            _ => default,
        };
        prop_assert_eq!(result, expected);
    }
}
