//! nom parser for the projection expression language.
//!
//! Precedence, loosest to tightest: `||`, `&&`, `==`/`!=`, `+`, `!`,
//! then primaries (literals, entity API calls, parenthesised groups).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{convert_error, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::expr::{Expr, ExprError};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Names reachable from configuration; everything else is rejected.
const ENTITY_API: &[&str] = &[
    "hasLabel",
    "hasProperty",
    "getProperty",
    "getLabels",
    "getType",
    "getId",
];

/// Compile one expression source string.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
    if let Some(name) = first_unknown_function(source) {
        return Err(ExprError::UnknownFunction(name));
    }

    match all_consuming(delimited(multispace0, or_expr, multispace0))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(ExprError::Parse(convert_error(source, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(ExprError::Parse("incomplete input".to_string())),
    }
}

/// Scan for an identifier applied as a call that is not part of the
/// entity API. Gives a named error instead of a generic parse trace.
fn first_unknown_function(source: &str) -> Option<String> {
    let bytes = source.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '\'' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if !in_string && (c.is_ascii_alphabetic() || c == '_') {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            let name = &source[start..i];
            let mut j = i;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if j < bytes.len()
                && bytes[j] == b'('
                && !ENTITY_API.contains(&name)
                && name != "true"
                && name != "false"
            {
                return Some(name.to_string());
            }
            continue;
        }
        i += 1;
    }
    None
}

fn or_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(token("||"), and_expr))(input)?;
    Ok((input, fold_binary(first, rest, Expr::Or)))
}

fn and_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = equality(input)?;
    let (input, rest) = many0(preceded(token("&&"), equality))(input)?;
    Ok((input, fold_binary(first, rest, Expr::And)))
}

fn equality(input: &str) -> Res<'_, Expr> {
    let (input, lhs) = additive(input)?;
    let (input, tail) = opt(pair(alt((token("=="), token("!="))), additive))(input)?;
    let expr = match tail {
        Some(("==", rhs)) => Expr::Eq(Box::new(lhs), Box::new(rhs)),
        Some((_, rhs)) => Expr::Ne(Box::new(lhs), Box::new(rhs)),
        None => lhs,
    };
    Ok((input, expr))
}

fn additive(input: &str) -> Res<'_, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(preceded(token("+"), unary))(input)?;
    Ok((input, fold_binary(first, rest, Expr::Add)))
}

fn unary(input: &str) -> Res<'_, Expr> {
    alt((
        map(preceded(token("!"), unary), |e| Expr::Not(Box::new(e))),
        primary,
    ))(input)
}

fn primary(input: &str) -> Res<'_, Expr> {
    preceded(
        multispace0,
        alt((
            delimited(token("("), or_expr, token(")")),
            map(string_literal, Expr::Str),
            number_literal,
            value(Expr::Bool(true), keyword("true")),
            value(Expr::Bool(false), keyword("false")),
            call,
        )),
    )(input)
}

fn call(input: &str) -> Res<'_, Expr> {
    alt((
        map(preceded(tag("hasLabel"), string_argument), Expr::HasLabel),
        map(
            preceded(tag("hasProperty"), string_argument),
            Expr::HasProperty,
        ),
        map(
            preceded(tag("getProperty"), string_argument),
            Expr::GetProperty,
        ),
        value(Expr::GetLabels, pair(tag("getLabels"), empty_parens)),
        value(Expr::GetType, pair(tag("getType"), empty_parens)),
        value(Expr::GetId, pair(tag("getId"), empty_parens)),
    ))(input)
}

fn string_argument(input: &str) -> Res<'_, String> {
    delimited(token("("), preceded(multispace0, string_literal), token(")"))(input)
}

fn empty_parens(input: &str) -> Res<'_, ()> {
    value((), pair(token("("), token(")")))(input)
}

fn string_literal(input: &str) -> Res<'_, String> {
    map(
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        |s: &str| s.to_string(),
    )(input)
}

fn number_literal(input: &str) -> Res<'_, Expr> {
    map(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        // recognized digits always parse
        |s: &str| Expr::Num(s.parse().unwrap_or(0.0)),
    )(input)
}

/// Keyword that must not run into a following identifier character.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag(word)(input)?;
        if rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(nom::Err::Error(nom::error::VerboseError {
                errors: vec![(input, nom::error::VerboseErrorKind::Context("keyword"))],
            }));
        }
        Ok((rest, matched))
    }
}

fn token<'a>(t: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    move |input: &'a str| preceded(multispace0, tag(t))(input)
}

fn fold_binary(
    first: Expr,
    rest: Vec<Expr>,
    combine: fn(Box<Expr>, Box<Expr>) -> Expr,
) -> Expr {
    rest.into_iter()
        .fold(first, |acc, rhs| combine(Box::new(acc), Box::new(rhs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            parse_expression("'hello'").unwrap(),
            Expr::Str("hello".to_string())
        );
        assert_eq!(parse_expression("42").unwrap(), Expr::Num(42.0));
        assert_eq!(parse_expression("true").unwrap(), Expr::Bool(true));
        assert_eq!(parse_expression("-1.5").unwrap(), Expr::Num(-1.5));
    }

    #[test]
    fn test_parse_calls() {
        assert_eq!(
            parse_expression("hasLabel('Person')").unwrap(),
            Expr::HasLabel("Person".to_string())
        );
        assert_eq!(parse_expression("getLabels()").unwrap(), Expr::GetLabels);
        assert_eq!(parse_expression("getType()").unwrap(), Expr::GetType);
    }

    #[test]
    fn test_precedence() {
        // == binds tighter than &&, && tighter than ||
        let expr =
            parse_expression("getType() == 'A' || hasLabel('B') && hasProperty('c')").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Eq(_, _)));
                assert!(matches!(*rhs, Expr::And(_, _)));
            }
            other => panic!("expected Or at the top, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        let expr =
            parse_expression("(getType() == 'A' || hasLabel('B')) && hasProperty('c')").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_concatenation_chain() {
        let expr = parse_expression("'a-' + getProperty('x') + '-z'").unwrap();
        assert!(matches!(expr, Expr::Add(_, _)));
    }

    #[test]
    fn test_whitespace_tolerated() {
        parse_expression("  hasLabel( 'Person' )  &&  ! hasProperty( 'hidden' ) ").unwrap();
    }

    #[test]
    fn test_unknown_function_is_named() {
        let err = parse_expression("dropTable('users')").unwrap_err();
        match err {
            ExprError::UnknownFunction(name) => assert_eq!(name, "dropTable"),
            other => panic!("expected UnknownFunction, got {other}"),
        }
    }

    #[test]
    fn test_function_inside_string_is_literal() {
        assert_eq!(
            parse_expression("'call(me)'").unwrap(),
            Expr::Str("call(me)".to_string())
        );
    }

    #[test]
    fn test_malformed_input_is_parse_error() {
        assert!(matches!(
            parse_expression("hasLabel('Person'"),
            Err(ExprError::Parse(_))
        ));
        assert!(matches!(
            parse_expression("&& true"),
            Err(ExprError::Parse(_))
        ));
        assert!(matches!(parse_expression(""), Err(ExprError::Parse(_))));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_expression("true extra").is_err());
    }
}
