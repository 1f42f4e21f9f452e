//! Concrete syntax tree produced by the parser
//!
//! These structures mirror the grammar: operator precedence levels are kept as flat chains,
//! literals keep their source spelling and every node holds the byte range it covers. They
//! only live between parsing and AST building; the space gobbling pass edits the text
//! segments in place before [crate::vtl::ast::builder] turns them into the final AST.

use crate::vtl::ast::{BinaryOperator, UnaryOperator};
use std::ops::Range;

pub type Span = Range<usize>;

/// One element of a template body.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentWithSpans {
    /// Merged run of text, newline and escaped-directive tokens
    Text { text: String, span: Span },
    /// `#[[ ... ]]#` body, rendered verbatim and never gobbled
    Unparsed { text: String, span: Span },
    /// `$name...` or `$!name...` in template text
    Reference {
        expression: ExpressionWithSpans,
        quiet: bool,
        span: Span,
    },
    /// `${ expr }` or `$!{ expr }` in template text
    Formal {
        expression: ExpressionWithSpans,
        quiet: bool,
        span: Span,
    },
    If(IfWithSpans),
    Set(SetWithSpans),
    Foreach(ForeachWithSpans),
    Break { span: Span },
    Stop { span: Span },
    Macro(MacroWithSpans),
    MacroCall(MacroCallWithSpans),
    Evaluate {
        argument: ExpressionWithSpans,
        span: Span,
    },
    Parse {
        argument: ExpressionWithSpans,
        span: Span,
    },
    Include {
        arguments: Vec<ExpressionWithSpans>,
        span: Span,
    },
}

/// A conditional branch: `#if(..)`, `#elseif(..)` or `#else`, with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchWithSpans {
    /// Span of the directive header, keyword through closing paren
    pub header: Span,
    pub condition: Option<ExpressionWithSpans>,
    pub body: Vec<SegmentWithSpans>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfWithSpans {
    /// The `#if` branch followed by every `#elseif` branch
    pub branches: Vec<BranchWithSpans>,
    pub otherwise: Option<BranchWithSpans>,
    pub end: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetWithSpans {
    pub name: String,
    /// Property path after the variable, as in `#set($map.key = 1)`
    pub path: Vec<String>,
    pub value: ExpressionWithSpans,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachWithSpans {
    pub header: Span,
    pub variable: String,
    pub iterable: ExpressionWithSpans,
    pub body: Vec<SegmentWithSpans>,
    pub otherwise: Option<BranchWithSpans>,
    pub end: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroWithSpans {
    pub header: Span,
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<SegmentWithSpans>,
    pub end: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroCallWithSpans {
    pub name: String,
    /// `None` for a bare `#name` without parentheses
    pub arguments: Option<Vec<ExpressionWithSpans>>,
    pub span: Span,
}

/// Expressions, grammar-shaped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionWithSpans {
    Ternary {
        condition: Box<ExpressionWithSpans>,
        then: Box<ExpressionWithSpans>,
        otherwise: Box<ExpressionWithSpans>,
        span: Span,
    },
    /// One precedence level: `first (op operand)*`, not yet folded
    Chain {
        first: Box<ExpressionWithSpans>,
        rest: Vec<(BinaryOperator, ExpressionWithSpans)>,
        span: Span,
    },
    /// Prefix operators, outermost first
    Unary {
        operators: Vec<UnaryOperator>,
        operand: Box<ExpressionWithSpans>,
        span: Span,
    },
    Postfix {
        primary: PrimaryWithSpans,
        suffixes: Vec<SuffixWithSpans>,
        span: Span,
    },
    Primary(PrimaryWithSpans),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryWithSpans {
    Literal { token: LiteralToken, span: Span },
    Reference { name: String, quiet: bool, span: Span },
    Formal {
        inner: Box<ExpressionWithSpans>,
        quiet: bool,
        span: Span,
    },
    Group {
        inner: Box<ExpressionWithSpans>,
        span: Span,
    },
    List {
        items: Vec<ExpressionWithSpans>,
        span: Span,
    },
    Range {
        start: Box<ExpressionWithSpans>,
        end: Box<ExpressionWithSpans>,
        span: Span,
    },
    Map {
        entries: Vec<(MapKeyWithSpans, ExpressionWithSpans)>,
        span: Span,
    },
}

/// Literal token text as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralToken {
    /// Including the surrounding quotes
    Str(String),
    Number(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKeyWithSpans {
    Str(String),
    Ident(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuffixWithSpans {
    Property { name: String, span: Span },
    Call {
        arguments: Vec<ExpressionWithSpans>,
        span: Span,
    },
    Index {
        index: Box<ExpressionWithSpans>,
        span: Span,
    },
}

impl ExpressionWithSpans {
    pub fn span(&self) -> Span {
        match self {
            ExpressionWithSpans::Ternary { span, .. }
            | ExpressionWithSpans::Chain { span, .. }
            | ExpressionWithSpans::Unary { span, .. }
            | ExpressionWithSpans::Postfix { span, .. } => span.clone(),
            ExpressionWithSpans::Primary(primary) => primary.span(),
        }
    }

    /// True for expressions whose top level is an operator rather than a plain operand.
    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            ExpressionWithSpans::Ternary { .. }
                | ExpressionWithSpans::Chain { .. }
                | ExpressionWithSpans::Unary { .. }
        )
    }
}

impl PrimaryWithSpans {
    pub fn span(&self) -> Span {
        match self {
            PrimaryWithSpans::Literal { span, .. }
            | PrimaryWithSpans::Reference { span, .. }
            | PrimaryWithSpans::Formal { span, .. }
            | PrimaryWithSpans::Group { span, .. }
            | PrimaryWithSpans::List { span, .. }
            | PrimaryWithSpans::Range { span, .. }
            | PrimaryWithSpans::Map { span, .. } => span.clone(),
        }
    }
}
