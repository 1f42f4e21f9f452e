//! Parser
//!
//!     Turns the token stream into the concrete syntax tree in [cst]. The grammar is written
//!     with chumsky combinators, which gives us a recursive-descent parser whose structure
//!     reads like the grammar itself:
//!
//!         template   := segment*
//!         segment    := text | reference | formal | if | set | foreach | macro
//!                     | macro-call | evaluate | parse | include | break | stop
//!         if         := #if ( expr ) template (#elseif ( expr ) template)* (#else template)? #end
//!         foreach    := #foreach ( $var in expr ) template (#else template)? #end
//!         macro      := #macro ( name $param* ) template #end
//!
//!     Expressions are described in [expressions].
//!
//! Errors
//!
//!     There is no recovery: any grammar violation fails the parse and every error chumsky
//!     reports is converted into a [ParseError] carrying the innermost rule label, the set of
//!     expected tokens and the position (0-based line:column, as everywhere in this crate).
//!
//! Expression Templates
//!
//!     Templates that consist of one compact operator expression starting with a reference,
//!     such as `$a+$b` or `$total/$count`, are additionally parsed as an expression. The
//!     evaluator renders the expression's value when it is defined and falls back to the
//!     regular template otherwise. See [parse_expression_template].

pub mod cst;
pub(crate) mod directives;
pub(crate) mod expressions;

use crate::vtl::ast::{Position, SourceLocation};
use crate::vtl::lexing::{tokenize_expression, Spanned, Token};
use chumsky::error::{Simple, SimpleReason};
use chumsky::prelude::*;
use chumsky::Stream;
use cst::{ExpressionWithSpans, SegmentWithSpans};
use std::fmt;
use std::ops::Range;

/// A grammar violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Innermost labelled grammar rule the error was raised in
    pub rule: Option<String>,
    /// Token spellings that would have been accepted
    pub expected: Vec<String>,
    pub found: Option<String>,
    pub position: Position,
    pub span: Range<usize>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(rule) = &self.rule {
            write!(f, " in {}", rule)?;
        }
        write!(f, " at {}", self.position)?;
        if !self.expected.is_empty() {
            write!(f, " (expected {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn from_simple(location: &SourceLocation, error: Simple<Token>) -> Self {
        let span = error.span();
        let found = error.found().map(Token::to_string);
        let mut expected: Vec<String> = error
            .expected()
            .map(|token| match token {
                Some(token) => token.to_string(),
                None => "end of input".to_string(),
            })
            .collect();
        expected.sort();
        expected.dedup();

        let message = match error.reason() {
            SimpleReason::Unclosed { delimiter, .. } => {
                format!("unclosed delimiter {}", delimiter)
            }
            SimpleReason::Custom(message) => message.clone(),
            SimpleReason::Unexpected => match &found {
                Some(found) => format!("unexpected {}", found),
                None => "unexpected end of input".to_string(),
            },
        };

        ParseError {
            message,
            rule: error.label().map(str::to_string),
            expected,
            found,
            position: location.byte_to_position(span.start),
            span,
        }
    }
}

/// Parse a token stream into template segments.
///
/// Sources nesting deeper than `max_nesting` levels are rejected up front (see
/// [check_nesting]) so the recursive grammar never runs out of stack.
pub fn parse_segments(
    source: &str,
    tokens: Vec<Spanned>,
    max_nesting: usize,
) -> Result<Vec<SegmentWithSpans>, Vec<ParseError>> {
    check_nesting(source, &tokens, max_nesting).map_err(|error| vec![error])?;
    let eoi = source.len()..source.len();
    directives::template()
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map_err(|errors| {
            let location = SourceLocation::new(source);
            errors
                .into_iter()
                .map(|error| ParseError::from_simple(&location, error))
                .collect()
        })
}

/// Reject token streams nested more than `limit` levels deep.
///
/// Every block directive up to its `#end`, every bracket (`(`, `[`, `{`, `${`) up to its
/// closer, and every `?` inside the innermost open bracket counts as one level.
pub fn check_nesting(source: &str, tokens: &[Spanned], limit: usize) -> Result<(), ParseError> {
    // ternaries seen at each open level; the first entry is the top level and never closes
    let mut levels: Vec<usize> = vec![0];
    let mut ternaries = 0;

    for (token, span) in tokens {
        match token {
            Token::If
            | Token::Foreach
            | Token::Macro
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::FormalStart
            | Token::QuietFormalStart => levels.push(0),
            Token::Question => {
                if let Some(count) = levels.last_mut() {
                    *count += 1;
                }
                ternaries += 1;
            }
            Token::End | Token::RParen | Token::RBracket | Token::RBrace => {
                if levels.len() > 1 {
                    ternaries -= levels.pop().unwrap_or(0);
                }
                continue;
            }
            _ => continue,
        }

        if levels.len() - 1 + ternaries > limit {
            let location = SourceLocation::new(source);
            return Err(ParseError {
                message: format!("nesting deeper than {} levels", limit),
                rule: Some("nesting".to_string()),
                expected: Vec::new(),
                found: Some(token.to_string()),
                position: location.byte_to_position(span.start),
                span: span.clone(),
            });
        }
    }
    Ok(())
}

/// Parse `source` as a whole-template expression, if it is one.
///
/// Only compact sources (no whitespace) that start with `$` and parse completely as an
/// operator expression qualify; everything else returns `None`.
pub fn parse_expression_template(
    source: &str,
    max_nesting: usize,
) -> Option<ExpressionWithSpans> {
    if !source.starts_with('$') || source.chars().any(char::is_whitespace) {
        return None;
    }
    let tokens = tokenize_expression(source).ok()?;
    check_nesting(source, &tokens, max_nesting).ok()?;
    let eoi = source.len()..source.len();
    let expression = expressions::expression()
        .then_ignore(end())
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .ok()?;
    expression.is_operation().then_some(expression)
}
