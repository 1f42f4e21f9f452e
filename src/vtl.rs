//! Velocity Template Language engine
//!
//!     A template goes through five stages:
//!
//!         1. [lexing]: source text to `(Token, Range)` pairs, switching between template
//!            text and code as directives, references and parentheses open and close.
//!         2. [parsing]: tokens to a grammar-shaped CST ([parsing::cst]).
//!         3. [gobbling]: whitespace around directive-only lines is removed from the CST's
//!            text according to the configured [gobbling::SpaceGobbling] mode.
//!         4. [ast]: the CST becomes the immutable AST the evaluator walks.
//!         5. [runtime]: the evaluator renders the AST against a [runtime::Context].
//!
//!     [engine] strings the stages together; [config] holds the render options.
//!
//!     Lexical and syntax errors stop a render before anything is evaluated. At render time
//!     undefined references are not errors: `$missing` echoes itself and `$!missing` renders
//!     nothing.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod gobbling;
pub mod lexing;
pub mod parsing;
pub mod runtime;
pub mod testing;
