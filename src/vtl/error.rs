//! Crate-wide error type

use crate::vtl::lexing::LexError;
use crate::vtl::parsing::ParseError;
use crate::vtl::runtime::{LoaderError, ScopeError};
use thiserror::Error;

/// Why a render (or a compile) failed.
///
/// Lexical and syntax errors are reported before anything is evaluated. Undefined references
/// and hitting the loop or recursion caps are not errors at all.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lexical error: {0}")]
    Lex(#[from] LexError),
    #[error("{}", describe_syntax(.0))]
    Syntax(Vec<ParseError>),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// The parse errors, when this is a syntax error.
    pub fn parse_errors(&self) -> &[ParseError] {
        match self {
            Error::Syntax(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Error::Syntax(errors)
    }
}

fn describe_syntax(errors: &[ParseError]) -> String {
    match errors {
        [] => "syntax error".to_string(),
        [only] => format!("syntax error: {}", only),
        [first, rest @ ..] => format!("syntax error: {} (and {} more)", first, rest.len()),
    }
}
