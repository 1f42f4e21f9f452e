//! Expression grammar
//!
//! Precedence, loosest first: ternary, `||`, `&&`, equality, relational, additive,
//! multiplicative, prefix unary, then a primary followed by any number of `.name`, `(args)`
//! and `[index]` suffixes. Each binary level is parsed as a flat chain; folding into a
//! left-associative tree happens in the AST builder.

use super::cst::{
    ExpressionWithSpans, LiteralToken, MapKeyWithSpans, PrimaryWithSpans, Span, SuffixWithSpans,
};
use crate::vtl::ast::{BinaryOperator, UnaryOperator};
use crate::vtl::lexing::Token;
use chumsky::prelude::*;
use chumsky::BoxedParser;

/// Type alias for parser error
pub(crate) type ParserError = Simple<Token>;

type Boxed<'a, O> = BoxedParser<'a, Token, O, ParserError>;

/// Helper: match a specific token, yielding its span
pub(crate) fn token(t: Token) -> impl Parser<Token, Span, Error = ParserError> + Clone {
    just(t).map_with_span(|_, span: Span| span)
}

pub(crate) fn identifier() -> impl Parser<Token, String, Error = ParserError> + Clone {
    select! { Token::Ident(name) => name }.labelled("identifier")
}

/// `$name` or `$!name`
pub(crate) fn reference() -> impl Parser<Token, PrimaryWithSpans, Error = ParserError> + Clone {
    select! {
        Token::Ref(name) => (name, false),
        Token::QuietRef(name) => (name, true),
    }
    .map_with_span(|(name, quiet), span| PrimaryWithSpans::Reference { name, quiet, span })
    .labelled("reference")
}

/// Wrap a parser in parentheses.
pub(crate) fn parenthesized<'a, O: 'a>(
    inner: impl Parser<Token, O, Error = ParserError> + Clone + 'a,
) -> Boxed<'a, O> {
    inner
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .boxed()
}

/// `.name`, `(args)` or `[index]` following a primary.
pub(crate) fn suffix<'a>(
    expr: impl Parser<Token, ExpressionWithSpans, Error = ParserError> + Clone + 'a,
) -> Boxed<'a, SuffixWithSpans> {
    let property = just(Token::Dot)
        .ignore_then(identifier())
        .map_with_span(|name, span| SuffixWithSpans::Property { name, span });

    let call = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map_with_span(|arguments, span| SuffixWithSpans::Call { arguments, span });

    let index = expr
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map_with_span(|index, span| SuffixWithSpans::Index {
            index: Box::new(index),
            span,
        });

    choice((property, call, index)).boxed()
}

/// Body of `${...}`: a bare name followed by suffixes, as in `${user.name}`.
pub(crate) fn formal_body<'a>(
    expr: impl Parser<Token, ExpressionWithSpans, Error = ParserError> + Clone + 'a,
) -> Boxed<'a, ExpressionWithSpans> {
    identifier()
        .map_with_span(|name, span| PrimaryWithSpans::Reference {
            name,
            quiet: false,
            span,
        })
        .then(suffix(expr).repeated())
        .map_with_span(|(primary, suffixes), span| {
            if suffixes.is_empty() {
                ExpressionWithSpans::Primary(primary)
            } else {
                ExpressionWithSpans::Postfix {
                    primary,
                    suffixes,
                    span,
                }
            }
        })
        .boxed()
}

fn primary<'a>(
    expr: impl Parser<Token, ExpressionWithSpans, Error = ParserError> + Clone + 'a,
) -> Boxed<'a, PrimaryWithSpans> {
    let literal = select! {
        Token::Str(raw) => LiteralToken::Str(raw),
        Token::Number(raw) => LiteralToken::Number(raw),
        Token::True => LiteralToken::Bool(true),
        Token::False => LiteralToken::Bool(false),
        Token::Null => LiteralToken::Null,
    }
    .map_with_span(|token, span| PrimaryWithSpans::Literal { token, span });

    let formal = select! {
        Token::FormalStart => false,
        Token::QuietFormalStart => true,
    }
    .then(formal_body(expr.clone()))
    .then_ignore(just(Token::RBrace))
    .map_with_span(|(quiet, inner), span| PrimaryWithSpans::Formal {
        inner: Box::new(inner),
        quiet,
        span,
    });

    let group = expr
        .clone()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map_with_span(|inner, span| PrimaryWithSpans::Group {
            inner: Box::new(inner),
            span,
        });

    let range = expr
        .clone()
        .then_ignore(just(Token::DotDot))
        .then(expr.clone())
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map_with_span(|(start, end), span| PrimaryWithSpans::Range {
            start: Box::new(start),
            end: Box::new(end),
            span,
        });

    let list = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map_with_span(|items, span| PrimaryWithSpans::List { items, span });

    let key = select! {
        Token::Str(raw) => MapKeyWithSpans::Str(raw),
        Token::Ident(name) => MapKeyWithSpans::Ident(name),
    }
    .labelled("map key");

    let map = key
        .then_ignore(just(Token::Colon))
        .then(expr)
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map_with_span(|entries, span| PrimaryWithSpans::Map { entries, span });

    choice((literal, reference(), formal, group, range, list, map))
        .labelled("expression")
        .boxed()
}

/// Parse one precedence level as `operand (operator operand)*`.
fn chain<'a>(
    operand: Boxed<'a, ExpressionWithSpans>,
    operator: impl Parser<Token, BinaryOperator, Error = ParserError> + Clone + 'a,
) -> Boxed<'a, ExpressionWithSpans> {
    operand
        .clone()
        .then(operator.then(operand).repeated())
        .map_with_span(|(first, rest), span| {
            if rest.is_empty() {
                first
            } else {
                ExpressionWithSpans::Chain {
                    first: Box::new(first),
                    rest,
                    span,
                }
            }
        })
        .boxed()
}

/// The full expression parser.
pub(crate) fn expression<'a>() -> impl Parser<Token, ExpressionWithSpans, Error = ParserError> + Clone + 'a
{
    recursive(|expr| {
        let postfix = primary(expr.clone())
            .then(suffix(expr.clone()).repeated())
            .map_with_span(|(primary, suffixes), span| {
                if suffixes.is_empty() {
                    ExpressionWithSpans::Primary(primary)
                } else {
                    ExpressionWithSpans::Postfix {
                        primary,
                        suffixes,
                        span,
                    }
                }
            });

        let unary = select! {
            Token::Bang => UnaryOperator::Not,
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
        }
        .repeated()
        .then(postfix)
        .map_with_span(|(operators, operand), span| {
            if operators.is_empty() {
                operand
            } else {
                ExpressionWithSpans::Unary {
                    operators,
                    operand: Box::new(operand),
                    span,
                }
            }
        })
        .boxed();

        let multiplicative = chain(
            unary,
            select! {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
            },
        );
        let additive = chain(
            multiplicative,
            select! {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
            },
        );
        let relational = chain(
            additive,
            select! {
                Token::Lt => BinaryOperator::Less,
                Token::LtEq => BinaryOperator::LessEqual,
                Token::Gt => BinaryOperator::Greater,
                Token::GtEq => BinaryOperator::GreaterEqual,
            },
        );
        let equality = chain(
            relational,
            select! {
                Token::EqEq => BinaryOperator::Equal,
                Token::NotEq => BinaryOperator::NotEqual,
            },
        );
        let and = chain(equality, just(Token::AndAnd).to(BinaryOperator::And));
        let or = chain(and, just(Token::OrOr).to(BinaryOperator::Or));

        or.clone()
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr)
                    .or_not(),
            )
            .map_with_span(|(condition, branches), span| match branches {
                None => condition,
                Some((then, otherwise)) => ExpressionWithSpans::Ternary {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                    span,
                },
            })
    })
}
