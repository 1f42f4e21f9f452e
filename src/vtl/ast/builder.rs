//! CST to AST conversion
//!
//! A pure mapping from the parser's grammar-shaped structures to [Template]:
//!
//! - operator chains fold into left-associative binary trees (`1-2-3` is `(1-2)-3`), while the
//!   nesting of precedence levels is kept (`1+2*3` is `1+(2*3)`);
//! - suffix chains become nested member access, call and index nodes;
//! - literal tokens are normalised into values;
//! - every node gets a [Range].
//!
//! String literals keep their backslashes. Only the enclosing quote can be escaped, either
//! doubled (`"say ""hi"""`) or behind a backslash (`"say \"hi\""`). A double-quoted literal
//! containing `$` or `#` is parsed as a nested template and becomes an
//! [Expression::InterpolatedString]; if that nested parse fails it stays a plain string.
//! Each level of string nesting halves the nesting budget of the template inside it.

use super::nodes::{Branch, Expression, Literal, MacroDefinition, Node, Template};
use super::range::{Range, SourceLocation};
use crate::vtl::lexing::tokenize;
use crate::vtl::parsing::cst::{
    BranchWithSpans, ExpressionWithSpans, LiteralToken, MapKeyWithSpans, PrimaryWithSpans,
    SegmentWithSpans, Span, SuffixWithSpans,
};
use crate::vtl::parsing::parse_segments;
use std::rc::Rc;

/// Build the AST for `source` from its parsed (and gobbled) segments.
pub fn build(
    source: &str,
    segments: Vec<SegmentWithSpans>,
    expression: Option<ExpressionWithSpans>,
    max_nesting: usize,
) -> Template {
    let location = SourceLocation::new(source);
    let builder = AstBuilder {
        source,
        location: &location,
        offset: 0,
        max_nesting,
    };
    Template {
        nodes: builder.nodes(segments),
        expression: expression.map(|expression| builder.expression(expression)),
    }
}

struct AstBuilder<'s> {
    source: &'s str,
    location: &'s SourceLocation,
    /// Added to every span; non-zero while building a string literal's nested template
    offset: usize,
    /// Nesting budget for templates inside string literals
    max_nesting: usize,
}

impl<'s> AstBuilder<'s> {
    fn shift(&self, span: &Span) -> Span {
        span.start + self.offset..span.end + self.offset
    }

    fn range(&self, span: &Span) -> Range {
        self.location.range(&self.shift(span))
    }

    fn source_text(&self, span: &Span) -> String {
        self.source
            .get(self.shift(span))
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn nodes(&self, segments: Vec<SegmentWithSpans>) -> Vec<Node> {
        segments
            .into_iter()
            .filter_map(|segment| self.node(segment))
            .collect()
    }

    fn node(&self, segment: SegmentWithSpans) -> Option<Node> {
        let node = match segment {
            SegmentWithSpans::Text { text, span } | SegmentWithSpans::Unparsed { text, span } => {
                if text.is_empty() {
                    return None;
                }
                Node::Text {
                    text,
                    location: self.range(&span),
                }
            }
            SegmentWithSpans::Reference {
                expression,
                quiet,
                span,
            }
            | SegmentWithSpans::Formal {
                expression,
                quiet,
                span,
            } => Node::Interpolation {
                expression: self.expression(expression),
                quiet,
                literal: self.source_text(&span),
                location: self.range(&span),
            },
            SegmentWithSpans::If(directive) => Node::If {
                branches: directive
                    .branches
                    .into_iter()
                    .filter_map(|branch| self.branch(branch))
                    .collect(),
                otherwise: directive.otherwise.map(|branch| self.nodes(branch.body)),
                location: self.range(&directive.span),
            },
            SegmentWithSpans::Set(set) => Node::Set {
                name: set.name,
                path: set.path,
                value: self.expression(set.value),
                location: self.range(&set.span),
            },
            SegmentWithSpans::Foreach(directive) => Node::ForEach {
                variable: directive.variable,
                iterable: self.expression(directive.iterable),
                body: self.nodes(directive.body),
                otherwise: directive.otherwise.map(|branch| self.nodes(branch.body)),
                location: self.range(&directive.span),
            },
            SegmentWithSpans::Break { span } => Node::Break {
                location: self.range(&span),
            },
            SegmentWithSpans::Stop { span } => Node::Stop {
                location: self.range(&span),
            },
            SegmentWithSpans::Macro(definition) => Node::Macro(Rc::new(MacroDefinition {
                name: definition.name,
                parameters: definition.parameters,
                body: self.nodes(definition.body),
                location: self.range(&definition.span),
            })),
            SegmentWithSpans::MacroCall(call) => Node::MacroCall {
                name: call.name,
                arguments: call
                    .arguments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|argument| self.expression(argument))
                    .collect(),
                literal: self.source_text(&call.span),
                location: self.range(&call.span),
            },
            SegmentWithSpans::Evaluate { argument, span } => Node::Evaluate {
                argument: self.expression(argument),
                location: self.range(&span),
            },
            SegmentWithSpans::Parse { argument, span } => Node::Parse {
                argument: self.expression(argument),
                location: self.range(&span),
            },
            SegmentWithSpans::Include { arguments, span } => Node::Include {
                arguments: arguments
                    .into_iter()
                    .map(|argument| self.expression(argument))
                    .collect(),
                location: self.range(&span),
            },
        };
        Some(node)
    }

    fn branch(&self, branch: BranchWithSpans) -> Option<Branch> {
        Some(Branch {
            condition: self.expression(branch.condition?),
            body: self.nodes(branch.body),
        })
    }

    fn expression(&self, expression: ExpressionWithSpans) -> Expression {
        match expression {
            ExpressionWithSpans::Ternary {
                condition,
                then,
                otherwise,
                span,
            } => Expression::Ternary {
                condition: Box::new(self.expression(*condition)),
                then: Box::new(self.expression(*then)),
                otherwise: Box::new(self.expression(*otherwise)),
                location: self.range(&span),
            },
            ExpressionWithSpans::Chain { first, rest, .. } => {
                rest.into_iter()
                    .fold(self.expression(*first), |left, (operator, right)| {
                        let right = self.expression(right);
                        let location = left.location().to(right.location());
                        Expression::BinaryOp {
                            operator,
                            left: Box::new(left),
                            right: Box::new(right),
                            location,
                        }
                    })
            }
            ExpressionWithSpans::Unary {
                operators,
                operand,
                span,
            } => operators
                .into_iter()
                .rev()
                .fold(self.expression(*operand), |operand, operator| {
                    Expression::UnaryOp {
                        operator,
                        operand: Box::new(operand),
                        location: self.range(&span),
                    }
                }),
            ExpressionWithSpans::Postfix {
                primary, suffixes, ..
            } => suffixes
                .into_iter()
                .fold(self.primary(primary), |object, suffix| {
                    self.suffix(object, suffix)
                }),
            ExpressionWithSpans::Primary(primary) => self.primary(primary),
        }
    }

    fn suffix(&self, object: Expression, suffix: SuffixWithSpans) -> Expression {
        match suffix {
            SuffixWithSpans::Property { name, span } => Expression::MemberAccess {
                location: object.location().to(&self.range(&span)),
                object: Box::new(object),
                property: name,
            },
            SuffixWithSpans::Call { arguments, span } => Expression::FunctionCall {
                location: object.location().to(&self.range(&span)),
                callee: Box::new(object),
                arguments: arguments
                    .into_iter()
                    .map(|argument| self.expression(argument))
                    .collect(),
            },
            SuffixWithSpans::Index { index, span } => Expression::ArrayAccess {
                location: object.location().to(&self.range(&span)),
                array: Box::new(object),
                index: Box::new(self.expression(*index)),
            },
        }
    }

    fn primary(&self, primary: PrimaryWithSpans) -> Expression {
        match primary {
            PrimaryWithSpans::Literal { token, span } => self.literal(token, &span),
            PrimaryWithSpans::Reference { name, quiet, span } => Expression::VariableReference {
                name,
                quiet,
                location: self.range(&span),
            },
            PrimaryWithSpans::Formal { inner, .. } | PrimaryWithSpans::Group { inner, .. } => {
                self.expression(*inner)
            }
            PrimaryWithSpans::List { items, span } => Expression::ArrayLiteral {
                elements: items
                    .into_iter()
                    .map(|item| self.expression(item))
                    .collect(),
                location: self.range(&span),
            },
            PrimaryWithSpans::Range { start, end, span } => Expression::RangeLiteral {
                start: Box::new(self.expression(*start)),
                end: Box::new(self.expression(*end)),
                location: self.range(&span),
            },
            PrimaryWithSpans::Map { entries, span } => Expression::ObjectLiteral {
                entries: entries
                    .into_iter()
                    .map(|(key, value)| {
                        let key = match key {
                            MapKeyWithSpans::Ident(name) => name,
                            MapKeyWithSpans::Str(raw) => {
                                let (quote, body) = split_quotes(&raw);
                                unquote(body, quote)
                            }
                        };
                        (key, self.expression(value))
                    })
                    .collect(),
                location: self.range(&span),
            },
        }
    }

    fn literal(&self, token: LiteralToken, span: &Span) -> Expression {
        let location = self.range(span);
        let value = match token {
            LiteralToken::Null => Literal::Null,
            LiteralToken::Bool(value) => Literal::Bool(value),
            LiteralToken::Number(raw) => Literal::Number(raw.parse().unwrap_or(0.0)),
            LiteralToken::Str(raw) => {
                let (quote, body) = split_quotes(&raw);
                if quote == '"' && (body.contains('$') || body.contains('#')) {
                    if let Some(nodes) = self.interpolated(body, span.start + 1) {
                        return Expression::InterpolatedString { nodes, location };
                    }
                }
                Literal::String(unquote(body, quote))
            }
        };
        Expression::Literal { value, location }
    }

    /// Parse the body of a double-quoted literal as a template. `None` when it fails to
    /// parse or holds nothing but text.
    fn interpolated(&self, body: &str, start: usize) -> Option<Vec<Node>> {
        let max_nesting = self.max_nesting / 2;
        let tokens = tokenize(body).ok()?;
        let segments = parse_segments(body, tokens, max_nesting).ok()?;
        let nested = AstBuilder {
            source: self.source,
            location: self.location,
            offset: self.offset + start,
            max_nesting,
        };
        let nodes: Vec<Node> = nested
            .nodes(segments)
            .into_iter()
            .map(|node| match node {
                Node::Text { text, location } => Node::Text {
                    text: unquote(&text, '"'),
                    location,
                },
                other => other,
            })
            .collect();
        if nodes.iter().all(|node| matches!(node, Node::Text { .. })) {
            return None;
        }
        Some(nodes)
    }
}

/// Split a quoted literal into its quote character and body.
fn split_quotes(raw: &str) -> (char, &str) {
    let quote = raw.chars().next().unwrap_or('"');
    let body = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
    (quote, body)
}

/// Collapse `""` and `\"` (or the single-quote equivalents) into the quote character.
fn unquote(body: &str, quote: char) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if (c == '\\' || c == quote) && chars.peek() == Some(&quote) {
            chars.next();
            text.push(quote);
        } else {
            text.push(c);
        }
    }
    text
}
