//! AST node definitions
//!
//! The AST is built once per template and never changes afterwards. Macro bodies are held
//! behind an `Rc` so the per-render macro table can keep them alive after the defining
//! template (possibly one loaded through `#parse`) has finished rendering.

use super::range::Range;
use std::fmt;
use std::rc::Rc;

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
    /// Set when the whole source is also a single operator expression (see
    /// [crate::vtl::parsing::parse_expression_template])
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text {
        text: String,
        location: Range,
    },
    /// `$ref...`, `$!ref...`, `${...}` in template text
    Interpolation {
        expression: Expression,
        quiet: bool,
        /// Source text echoed when the value is undefined and the reference is not quiet
        literal: String,
        location: Range,
    },
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Node>>,
        location: Range,
    },
    Set {
        name: String,
        path: Vec<String>,
        value: Expression,
        location: Range,
    },
    ForEach {
        variable: String,
        iterable: Expression,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
        location: Range,
    },
    Break {
        location: Range,
    },
    Stop {
        location: Range,
    },
    Macro(Rc<MacroDefinition>),
    MacroCall {
        name: String,
        arguments: Vec<Expression>,
        literal: String,
        location: Range,
    },
    Evaluate {
        argument: Expression,
        location: Range,
    },
    Parse {
        argument: Expression,
        location: Range,
    },
    Include {
        arguments: Vec<Expression>,
        location: Range,
    },
}

/// One `#if`/`#elseif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expression,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Node>,
    pub location: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        value: Literal,
        location: Range,
    },
    /// Double-quoted string containing references or directives
    InterpolatedString {
        nodes: Vec<Node>,
        location: Range,
    },
    VariableReference {
        name: String,
        quiet: bool,
        location: Range,
    },
    MemberAccess {
        object: Box<Expression>,
        property: String,
        location: Range,
    },
    FunctionCall {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        location: Range,
    },
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
        location: Range,
    },
    ObjectLiteral {
        entries: Vec<(String, Expression)>,
        location: Range,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
        location: Range,
    },
    RangeLiteral {
        start: Box<Expression>,
        end: Box<Expression>,
        location: Range,
    },
    BinaryOp {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        location: Range,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Expression>,
        location: Range,
    },
    Ternary {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
        location: Range,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
}

impl Expression {
    pub fn location(&self) -> &Range {
        match self {
            Expression::Literal { location, .. }
            | Expression::InterpolatedString { location, .. }
            | Expression::VariableReference { location, .. }
            | Expression::MemberAccess { location, .. }
            | Expression::FunctionCall { location, .. }
            | Expression::ArrayAccess { location, .. }
            | Expression::ObjectLiteral { location, .. }
            | Expression::ArrayLiteral { location, .. }
            | Expression::RangeLiteral { location, .. }
            | Expression::BinaryOp { location, .. }
            | Expression::UnaryOp { location, .. }
            | Expression::Ternary { location, .. } => location,
        }
    }
}

impl Node {
    pub fn location(&self) -> &Range {
        match self {
            Node::Text { location, .. }
            | Node::Interpolation { location, .. }
            | Node::If { location, .. }
            | Node::Set { location, .. }
            | Node::ForEach { location, .. }
            | Node::Break { location }
            | Node::Stop { location }
            | Node::MacroCall { location, .. }
            | Node::Evaluate { location, .. }
            | Node::Parse { location, .. }
            | Node::Include { location, .. } => location,
            Node::Macro(definition) => &definition.location,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        };
        f.write_str(symbol)
    }
}
