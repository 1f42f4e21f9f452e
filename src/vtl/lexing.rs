//! Lexer
//!
//!     This module turns VTL source text into a flat stream of `(Token, Range<usize>)` pairs.
//!     The byte ranges are carried untouched through parsing so the AST builder can attach
//!     source locations to every node and so undefined references can echo their exact
//!     source text at render time.
//!
//! Two Modes
//!
//!     VTL mixes free text with code. Inside text almost every character is literal, while
//!     inside a directive's parentheses, a formal reference `${...}` or a method call the
//!     usual expression tokens apply and blanks are insignificant. Rather than one lexer with
//!     context-sensitive rules, we keep two logos token sets (see [modes]) and a small driver
//!     (see [driver]) that morphs between them:
//!
//!         1. Template mode produces text runs, newlines, comments, directive keywords and
//!            references. Comments are dropped here and never reach the parser.
//!         2. After a directive keyword that takes arguments, optional blanks followed by
//!            `(` switch to code mode until the matching `)`.
//!         3. After a reference, an adjacent `.name`, `.name(...)` or `[...]` tail is lexed
//!            as part of the reference; anything else resumes template mode.
//!
//!     Because text runs only exist in template mode, free text can never merge with an
//!     adjacent code token, and the exact inter-token spacing survives for the space
//!     gobbling pass.
//!
//! Expression Templates
//!
//!     [tokenize_expression] lexes a whole source in code mode. The parser uses it to detect
//!     templates that are a single operator expression such as `$a+$b`.

pub mod driver;
pub mod modes;
pub mod tokens;

pub use driver::{tokenize, tokenize_expression};
pub use tokens::Token;

use thiserror::Error;

/// A token paired with the byte range it covers in the source.
pub type Spanned = (Token, std::ops::Range<usize>);

/// Errors that stop tokenization. The stream is truncated at `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },
    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },
    #[error("unterminated unparsed block starting at byte {offset}")]
    UnterminatedUnparsed { offset: usize },
    #[error("unexpected character {character:?} at byte {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
}

impl LexError {
    /// Byte offset where lexing stopped.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString { offset }
            | LexError::UnterminatedComment { offset }
            | LexError::UnterminatedUnparsed { offset }
            | LexError::UnexpectedCharacter { offset, .. } => *offset,
        }
    }
}
