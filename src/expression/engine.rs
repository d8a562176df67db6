//! Cached evaluation of fully substituted expressions.

use std::cell::RefCell;

use super::{Expr, Value};
use crate::core::cache::HeatCache;

/// Evaluates closed expressions (only literals and operators) and caches
/// the outcome by exact text
///
/// Results are cached as `Option<bool>`: `None` records that the text
/// failed to parse, failed to evaluate or produced `null`. Failures are
/// never propagated; callers always get their supplied default back.
#[derive(Debug)]
pub struct ExpressionEngine {
    cache: RefCell<HeatCache<String, Option<bool>>>,
}

impl ExpressionEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RefCell::new(HeatCache::new(capacity)),
        }
    }

    /// Evaluate `expression`, returning `default` when it does not yield a
    /// boolean
    pub fn eval(&self, expression: &str, default: bool) -> bool {
        self.try_eval(expression).unwrap_or(default)
    }

    /// Evaluate `expression`, `None` unless it yields a boolean
    pub fn try_eval(&self, expression: &str) -> Option<bool> {
        let key = expression.to_string();
        self.cache
            .borrow_mut()
            .get_or_insert_with(&key, || Self::compute(expression))
    }

    /// Evaluate without touching the cache
    pub fn eval_uncached(&self, expression: &str, default: bool) -> bool {
        Self::compute(expression).unwrap_or(default)
    }

    fn compute(expression: &str) -> Option<bool> {
        let expr = match Expr::parse(expression) {
            Ok(expr) => expr,
            Err(e) => {
                tracing::warn!("Expression '{}' could not be parsed: {}", expression, e);
                return None;
            }
        };

        match expr.eval_closed() {
            Ok(Value::Bool(result)) => Some(result),
            Ok(Value::Null) => {
                tracing::debug!("Expression '{}' evaluated to null", expression);
                None
            }
            Err(e) => {
                tracing::warn!("Expression '{}' failed: {}", expression, e);
                None
            }
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new(400)
    }
}
