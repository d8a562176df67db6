//! Translation of sugared syntax and validation of custom expressions.

use std::sync::OnceLock;

use regex::Regex;

use super::{Expr, Value};

/// Name under which the door's current logical state is exposed
pub const CURRENT_STATE: &str = "currentState";

/// Outcome of [`validate`]
///
/// Every failure carries the offending snippet. `Fine` carries the
/// normalised expression that should be stored on the door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    UnbalancedParentheses { open: usize, close: usize },
    UnknownVariable(String),
    InvalidOperator(String),
    InvalidSyntax(String),
    ExecutionFailed(String),
    NonBooleanResult(String),
    Fine(String),
}

impl Validation {
    pub fn is_fine(&self) -> bool {
        matches!(self, Validation::Fine(_))
    }

    /// Short machine-readable name of the outcome
    pub fn kind(&self) -> &'static str {
        match self {
            Validation::UnbalancedParentheses { .. } => "unbalanced_parentheses",
            Validation::UnknownVariable(_) => "unknown_variable",
            Validation::InvalidOperator(_) => "invalid_operator",
            Validation::InvalidSyntax(_) => "invalid_syntax",
            Validation::ExecutionFailed(_) => "execution_failed",
            Validation::NonBooleanResult(_) => "non_boolean_result",
            Validation::Fine(_) => "fine",
        }
    }
}

impl std::fmt::Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validation::UnbalancedParentheses { open, close } => {
                write!(f, "Unbalanced parentheses: {} opening, {} closing", open, close)
            }
            Validation::UnknownVariable(name) => write!(f, "Unknown variable: {}", name),
            Validation::InvalidOperator(op) => write!(f, "Invalid operator: {}", op),
            Validation::InvalidSyntax(rest) => write!(f, "Invalid syntax near: {}", rest),
            Validation::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            Validation::NonBooleanResult(value) => write!(f, "Result is not a boolean: {}", value),
            Validation::Fine(expr) => write!(f, "Valid expression: {}", expr),
        }
    }
}

struct Sugar {
    and: Regex,
    or: Regex,
    is_not: Regex,
    is: Regex,
    not: Regex,
    whitespace: Regex,
}

static SUGAR: OnceLock<Sugar> = OnceLock::new();

fn sugar() -> &'static Sugar {
    SUGAR.get_or_init(|| Sugar {
        and: Regex::new(r"(?i)\sand\s").expect("valid and regex"),
        or: Regex::new(r"(?i)\sor\s").expect("valid or regex"),
        is_not: Regex::new(r"(?i)\sis\snot\s").expect("valid is-not regex"),
        is: Regex::new(r"(?i)\sis\s").expect("valid is regex"),
        not: Regex::new(r"(?i)\snot\s").expect("valid not regex"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace regex"),
    })
}

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
static VALID_OPERATORS: OnceLock<Regex> = OnceLock::new();
static STRUCTURE: OnceLock<Regex> = OnceLock::new();

/// Identifier tokens as the parser understands them
pub(crate) fn identifier_regex() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"))
}

fn valid_operators() -> &'static Regex {
    VALID_OPERATORS.get_or_init(|| Regex::new(r"&&|\|\||!=|==|!").expect("valid operator regex"))
}

fn structure() -> &'static Regex {
    STRUCTURE.get_or_init(|| Regex::new(r"[|&!=()\s]+").expect("valid structure regex"))
}

/// Rewrite `and`, `or`, `is`, `is not` and `not` into strict operators and
/// strip all whitespace
///
/// Applying this to already translated text changes nothing.
pub fn translate(text: &str) -> String {
    let s = sugar();
    // Padding lets connectives at the very edges still match
    let padded = format!(" {} ", text);
    let out = s.and.replace_all(&padded, " && ");
    let out = s.or.replace_all(&out, " || ");
    let out = s.is_not.replace_all(&out, " != ");
    let out = s.is.replace_all(&out, " == ");
    let out = s.not.replace_all(&out, " != ");
    s.whitespace.replace_all(&out, "").into_owned()
}

fn is_known_name(name: &str, categories: &[&str]) -> bool {
    name.eq_ignore_ascii_case(CURRENT_STATE)
        || categories.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn is_literal(name: &str) -> bool {
    ["true", "false", "null"]
        .iter()
        .any(|lit| lit.eq_ignore_ascii_case(name))
}

/// Translate and check an expression against a set of category names
///
/// Checks run in a fixed order and stop at the first failure: parenthesis
/// balance, unknown variables, stray operators, leftover syntax, and a
/// dry run with every known name bound to `true`.
pub fn validate(text: &str, categories: &[&str]) -> Validation {
    let translated = translate(text);

    let open = translated.matches('(').count();
    let close = translated.matches(')').count();
    if open != close {
        return Validation::UnbalancedParentheses { open, close };
    }

    let ident = identifier_regex();
    if let Some(unknown) = ident
        .find_iter(&translated)
        .map(|m| m.as_str())
        .find(|name| !is_known_name(name, categories) && !is_literal(name))
    {
        return Validation::UnknownVariable(unknown.to_string());
    }

    let without_names = ident.replace_all(&translated, "");
    let without_operators = valid_operators().replace_all(&without_names, "");
    let stray: String = without_operators
        .chars()
        .filter(|c| matches!(c, '&' | '|' | '='))
        .collect();
    if !stray.is_empty() {
        return Validation::InvalidOperator(stray);
    }

    let leftover = structure().replace_all(&without_names, "");
    if !leftover.is_empty() {
        return Validation::InvalidSyntax(leftover.into_owned());
    }

    let expr = match Expr::parse(&translated) {
        Ok(expr) => expr,
        Err(e) => return Validation::ExecutionFailed(e.message),
    };
    let dry_run = expr.eval(&|name: &str| {
        is_known_name(name, categories).then_some(Value::Bool(true))
    });
    match dry_run {
        Ok(Value::Bool(_)) => Validation::Fine(translated),
        Ok(Value::Null) => Validation::NonBooleanResult("null".to_string()),
        Err(e) => Validation::ExecutionFailed(e.to_string()),
    }
}
