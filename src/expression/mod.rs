//! Boolean expression language for custom door evaluators.
//!
//! Users write expressions such as `time and (location or permission)`.
//! [`translate`] rewrites the natural-language connectives into strict
//! operators, [`validate`] classifies malformed input, and the
//! [`ExpressionEngine`] evaluates fully substituted expressions with a
//! bounded result cache.
//!
//! The language is deliberately tiny: identifiers, `true`/`false`/`null`,
//! `!`, `==`, `!=`, `&&`, `||` and parentheses. Values follow loose
//! scripting semantics, so `null` is falsy and `&&`/`||` return one of
//! their operands rather than a coerced boolean.

pub mod engine;
pub mod parser;
pub mod translate;

pub use engine::ExpressionEngine;
pub use translate::{translate, validate, Validation};

/// Runtime value of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Null,
}

impl Value {
    pub fn truthy(self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

impl From<Option<bool>> for Value {
    fn from(value: Option<bool>) -> Self {
        value.map(Value::Bool).unwrap_or(Value::Null)
    }
}

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Neq,
    And,
    Or,
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `true`, `false` or `null`
    Literal(Value),
    /// A named value, resolved at evaluation time
    Ident(String),
    /// Logical negation
    Not(Box<Expr>),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Error type for expression evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An identifier the resolver does not know
    UnknownIdent(String),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::UnknownIdent(name) => write!(f, "Unknown identifier: {}", name),
        }
    }
}

impl std::error::Error for EvalError {}

/// Error type for expression parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl Expr {
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        parser::parse(input)
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate with identifiers looked up through `resolve`
    pub fn eval<F>(&self, resolve: &F) -> Result<Value, EvalError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Ident(name) => resolve(name).ok_or_else(|| EvalError::UnknownIdent(name.clone())),
            Expr::Not(operand) => Ok(Value::Bool(!operand.eval(resolve)?.truthy())),
            Expr::BinOp { op, left, right } => {
                let lhs = left.eval(resolve)?;
                match op {
                    // Short-circuit, returning the deciding operand
                    BinOp::And if !lhs.truthy() => Ok(lhs),
                    BinOp::Or if lhs.truthy() => Ok(lhs),
                    BinOp::And | BinOp::Or => right.eval(resolve),
                    BinOp::Eq => Ok(Value::Bool(lhs == right.eval(resolve)?)),
                    BinOp::Neq => Ok(Value::Bool(lhs != right.eval(resolve)?)),
                }
            }
        }
    }

    /// Evaluate an expression that must not contain identifiers
    pub fn eval_closed(&self) -> Result<Value, EvalError> {
        self.eval(&|_: &str| None)
    }
}
