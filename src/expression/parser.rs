//! Recursive-descent parser for the expression language.
//!
//! Precedence, loosest first: `||`, `&&`, `==`/`!=`, `!`. Whitespace is
//! allowed between tokens even though translated expressions contain none.

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map, not, value, verify};
use nom::error::ErrorKind;
use nom::sequence::{preceded, terminated};
use nom::{IResult, Parser};

use super::{BinOp, Expr, ParseError, Value};

/// Deepest expression tree accepted
///
/// Parentheses, negations and binary operators each count as one level.
/// Evaluation recurses once per level, so the limit also bounds the stack.
pub const MAX_DEPTH: usize = 64;

/// An expression with the height of its tree
type Node = (Expr, usize);

type Error<'a> = nom::Err<nom::error::Error<&'a str>>;

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    match all_consuming(terminated(|i| or_expr(i, 0), multispace0)).parse(input) {
        Ok((_, (expr, _))) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError {
            message: if e.code == ErrorKind::TooLarge {
                format!("expression nested deeper than {} levels", MAX_DEPTH)
            } else if e.input.is_empty() {
                "unexpected end of expression".to_string()
            } else {
                format!("unexpected input at '{}'", e.input)
            },
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            message: "incomplete expression".to_string(),
        }),
    }
}

fn too_deep(input: &str) -> Error<'_> {
    nom::Err::Failure(nom::error::Error::new(input, ErrorKind::TooLarge))
}

/// Nesting depth one level down, failing past [`MAX_DEPTH`]
fn deeper(input: &str, depth: usize) -> Result<usize, Error<'_>> {
    if depth >= MAX_DEPTH {
        Err(too_deep(input))
    } else {
        Ok(depth + 1)
    }
}

fn node(input: &str, expr: Expr, height: usize) -> IResult<&str, Node> {
    if height > MAX_DEPTH {
        return Err(too_deep(input));
    }
    Ok((input, (expr, height)))
}

/// Left-associative chain of `operand (op operand)*`
fn chain<'a, P>(
    input: &'a str,
    depth: usize,
    mut op: P,
    operand: fn(&'a str, usize) -> IResult<&'a str, Node>,
) -> IResult<&'a str, Node>
where
    P: Parser<&'a str, Output = BinOp, Error = nom::error::Error<&'a str>>,
{
    let (mut input, mut acc) = operand(input, depth)?;
    loop {
        let (rest, kind) = match op.parse(input) {
            Ok(found) => found,
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        };
        let (rest, (rhs, rhs_height)) = operand(rest, depth)?;
        let height = acc.1.max(rhs_height) + 1;
        let (rest, joined) = node(rest, Expr::binary(kind, acc.0, rhs), height)?;
        input = rest;
        acc = joined;
    }
}

fn or_expr(input: &str, depth: usize) -> IResult<&str, Node> {
    chain(input, depth, value(BinOp::Or, token("||")), and_expr)
}

fn and_expr(input: &str, depth: usize) -> IResult<&str, Node> {
    chain(input, depth, value(BinOp::And, token("&&")), eq_expr)
}

fn eq_expr(input: &str, depth: usize) -> IResult<&str, Node> {
    chain(
        input,
        depth,
        alt((value(BinOp::Eq, token("==")), value(BinOp::Neq, token("!=")))),
        unary,
    )
}

fn unary(input: &str, depth: usize) -> IResult<&str, Node> {
    match terminated(token("!"), not(char('='))).parse(input) {
        Ok((rest, _)) => {
            let (rest, (operand, height)) = unary(rest, deeper(rest, depth)?)?;
            node(rest, Expr::Not(Box::new(operand)), height + 1)
        }
        Err(nom::Err::Error(_)) => primary(input, depth),
        Err(e) => Err(e),
    }
}

fn primary(input: &str, depth: usize) -> IResult<&str, Node> {
    match token("(").parse(input) {
        Ok((rest, _)) => {
            let (rest, (inner, height)) = or_expr(rest, deeper(rest, depth)?)?;
            let (rest, _) = token(")").parse(rest)?;
            node(rest, inner, height + 1)
        }
        Err(nom::Err::Error(_)) => map(ws(identifier), |name| (ident_or_literal(name), 1)).parse(input),
        Err(e) => Err(e),
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        |s: &str| s.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'),
    )
    .parse(input)
}

fn ident_or_literal(name: &str) -> Expr {
    if name.eq_ignore_ascii_case("true") {
        Expr::Literal(Value::Bool(true))
    } else if name.eq_ignore_ascii_case("false") {
        Expr::Literal(Value::Bool(false))
    } else if name.eq_ignore_ascii_case("null") {
        Expr::Literal(Value::Null)
    } else {
        Expr::Ident(name.to_string())
    }
}

fn token<'a>(t: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    ws(tag_no_case(t))
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    preceded(multispace0, inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    #[test]
    fn test_literal_parsing() {
        assert_eq!(parse("true"), Ok(Expr::Literal(Value::Bool(true))));
        assert_eq!(parse("FALSE"), Ok(Expr::Literal(Value::Bool(false))));
        assert_eq!(parse("null"), Ok(Expr::Literal(Value::Null)));
    }

    #[test]
    fn test_identifier_with_underscore() {
        assert_eq!(parse("mob_kill2"), Ok(ident("mob_kill2")));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a||b&&c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::Or,
                ident("a"),
                Expr::binary(BinOp::And, ident("b"), ident("c"))
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(a||b)&&c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::And,
                Expr::binary(BinOp::Or, ident("a"), ident("b")),
                ident("c")
            )
        );
    }

    #[test]
    fn test_not_and_not_equal() {
        assert_eq!(parse("!a"), Ok(Expr::Not(Box::new(ident("a")))));
        assert_eq!(
            parse("a!=b"),
            Ok(Expr::binary(BinOp::Neq, ident("a"), ident("b")))
        );
        assert_eq!(
            parse("!a==b"),
            Ok(Expr::binary(
                BinOp::Eq,
                Expr::Not(Box::new(ident("a"))),
                ident("b")
            ))
        );
    }

    #[test]
    fn test_left_associative_chain() {
        let expr = parse("a&&b&&c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::And,
                Expr::binary(BinOp::And, ident("a"), ident("b")),
                ident("c")
            )
        );
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(parse(" a && ( b ) "), parse("a&&(b)"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse("a&&").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a&b").is_err());
        assert!(parse("").is_err());
        assert!(parse("()").is_err());
    }

    #[test]
    fn test_nesting_within_limit() {
        let text = format!("{}a{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse(&text), Ok(ident("a")));
        assert!(parse(&format!("{}a", "!".repeat(MAX_DEPTH - 1))).is_ok());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        let err = parse(&parens).unwrap_err();
        assert!(err.message.contains("nested deeper"), "{}", err.message);

        assert!(parse(&format!("{}true", "!".repeat(200_000))).is_err());
        assert!(parse(&format!("{}true", "true&&".repeat(100_000))).is_err());
    }
}
