//! Abstract syntax tree
//!
//!     The AST is the only structure the evaluator sees. It is produced from the parser's CST
//!     by [builder::build] after space gobbling has edited the CST's text, and is immutable
//!     from then on.
//!
//!     Nodes are split into template nodes ([Node]: text, interpolations and directives) and
//!     [Expression]s. Every node carries a [Range] with both its byte span and its
//!     line:column positions.

pub mod builder;
pub mod nodes;
pub mod range;

pub use builder::build;
pub use nodes::{
    BinaryOperator, Branch, Expression, Literal, MacroDefinition, Node, Template, UnaryOperator,
};
pub use range::{Position, Range, SourceLocation};
