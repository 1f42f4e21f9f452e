//! Evaluator
//!
//!     Walks a [Template] depth first against a scope stack, appending to one output
//!     buffer. Everything that lives for the duration of a render (scopes, the macro table,
//!     recursion counters, the stack of active loops) is owned by one [Evaluator] and dropped
//!     with it; nothing is shared between renders.
//!
//! Control Flow
//!
//!     Rendering a node yields a [Flow]. `#break` unwinds to the nearest enclosing boundary:
//!     a `#foreach`, a macro body, or a whole template (top level, `#parse` or `#evaluate`).
//!     `#stop` unwinds through everything and ends the render with the output so far.
//!
//!     Every scope push is paired with a pop that runs before the body's result is inspected,
//!     so scopes are popped on `#break`, `#stop` and errors alike.
//!
//! Async
//!
//!     `#parse` and `#include` await the [ResourceLoader] at any nesting depth, so the walk is
//!     async throughout. The recursive steps return boxed futures.

use super::builtins;
use super::context::Context;
use super::host::{setter_name, HostObject};
use super::iteration::{Items, LoopState};
use super::loader::{LoaderError, ResourceLoader};
use super::operators;
use super::scope::{MacroTable, ScopeStack};
use super::value::Value;
use crate::vtl::ast::{BinaryOperator, Expression, Literal, MacroDefinition, Node, Template};
use crate::vtl::config::RenderOptions;
use crate::vtl::engine::compile;
use crate::vtl::error::Error;
use indexmap::IndexMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

type Eval<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + 'a>>;

/// How rendering a node ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Stop,
}

/// Per-render evaluation state.
pub struct Evaluator<'r, L> {
    options: &'r RenderOptions,
    loader: &'r L,
    scopes: ScopeStack,
    macros: MacroTable,
    loops: Vec<Rc<LoopState>>,
    macro_depth: usize,
    parse_depth: usize,
}

impl<'r, L: ResourceLoader> Evaluator<'r, L> {
    pub fn new(context: &Context, options: &'r RenderOptions, loader: &'r L) -> Self {
        Evaluator {
            options,
            loader,
            scopes: ScopeStack::new(context.global_scope()),
            macros: MacroTable::new(options.allow_macro_replace),
            loops: Vec::new(),
            macro_depth: 0,
            parse_depth: 0,
        }
    }

    /// Render `template` to a string, consuming the evaluator.
    pub async fn render(mut self, template: &Template) -> Result<String, Error> {
        let mut out = String::new();
        if self.render_template(template, &mut out).await? == Flow::Stop {
            log::debug!("render ended by #stop");
        }
        Ok(out)
    }

    async fn render_template(&mut self, template: &Template, out: &mut String) -> Result<Flow, Error> {
        self.hoist_macros(&template.nodes);
        if let Some(expression) = &template.expression {
            let value = self.evaluate(expression).await?;
            if !value.is_null() {
                out.push_str(&value.to_string());
                return Ok(Flow::Normal);
            }
        }
        match self.render_nodes(&template.nodes, out).await? {
            Flow::Stop => Ok(Flow::Stop),
            _ => Ok(Flow::Normal),
        }
    }

    /// Register every macro a template defines outside other macros, so calls may precede
    /// definitions.
    fn hoist_macros(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Macro(definition) => {
                    self.macros.define(Rc::clone(definition));
                }
                Node::If {
                    branches,
                    otherwise,
                    ..
                } => {
                    for branch in branches {
                        self.hoist_macros(&branch.body);
                    }
                    if let Some(otherwise) = otherwise {
                        self.hoist_macros(otherwise);
                    }
                }
                Node::ForEach { body, otherwise, .. } => {
                    self.hoist_macros(body);
                    if let Some(otherwise) = otherwise {
                        self.hoist_macros(otherwise);
                    }
                }
                _ => {}
            }
        }
    }

    fn render_nodes<'a>(&'a mut self, nodes: &'a [Node], out: &'a mut String) -> Eval<'a, Flow> {
        Box::pin(async move {
            for node in nodes {
                let flow = self.render_node(node, out).await?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
            }
            Ok(Flow::Normal)
        })
    }

    async fn render_node(&mut self, node: &Node, out: &mut String) -> Result<Flow, Error> {
        match node {
            Node::Text { text, .. } => out.push_str(text),
            Node::Interpolation {
                expression,
                quiet,
                literal,
                ..
            } => {
                let value = self.evaluate(expression).await?;
                if !value.is_null() {
                    out.push_str(&value.to_string());
                } else if !quiet {
                    out.push_str(literal);
                }
            }
            Node::If {
                branches,
                otherwise,
                ..
            } => {
                for branch in branches {
                    if self.evaluate(&branch.condition).await?.is_truthy() {
                        return self.render_nodes(&branch.body, out).await;
                    }
                }
                if let Some(otherwise) = otherwise {
                    return self.render_nodes(otherwise, out).await;
                }
            }
            Node::Set {
                name, path, value, ..
            } => {
                let value = self.evaluate(value).await?;
                self.assign(name, path, value);
            }
            Node::ForEach {
                variable,
                iterable,
                body,
                otherwise,
                ..
            } => {
                return self
                    .render_foreach(variable, iterable, body, otherwise.as_deref(), out)
                    .await;
            }
            Node::Break { .. } => return Ok(Flow::Break),
            Node::Stop { .. } => return Ok(Flow::Stop),
            Node::Macro(definition) => {
                self.macros.define(Rc::clone(definition));
            }
            Node::MacroCall {
                name,
                arguments,
                literal,
                ..
            } => match self.macros.get(name) {
                Some(definition) => return self.call_macro(definition, arguments, out).await,
                None => {
                    log::debug!("undefined macro #{}", name);
                    out.push_str(literal);
                }
            },
            Node::Evaluate { argument, .. } => {
                let source = self.evaluate(argument).await?.to_string();
                if self.may_nest("#evaluate") {
                    return self.render_nested(&source, out).await;
                }
            }
            Node::Parse { argument, .. } => {
                let name = self.evaluate(argument).await?.to_string();
                if self.may_nest("#parse") {
                    match self.loader.resolve(&name).await {
                        Ok(source) => return self.render_nested(&source, out).await,
                        Err(error) => self.tolerate(error)?,
                    }
                }
            }
            Node::Include { arguments, .. } => {
                for argument in arguments {
                    let name = self.evaluate(argument).await?.to_string();
                    match self.loader.resolve(&name).await {
                        Ok(source) => out.push_str(&source),
                        Err(error) => self.tolerate(error)?,
                    }
                }
            }
        }
        Ok(Flow::Normal)
    }

    /// `#set($name.a.b = value)`
    fn assign(&mut self, name: &str, path: &[String], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            self.scopes.set_variable(name, value);
            return;
        };
        let mut target = self.scopes.get_variable(name).cloned().unwrap_or_default();
        for key in parents {
            target = builtins::get_property(&target, key).unwrap_or_default();
        }
        match &target {
            Value::Map(entries) => {
                entries.borrow_mut().insert(last.clone(), value);
            }
            Value::Object(object) => {
                if object.invoke_method(&setter_name(last), &[value]).is_none() {
                    log::debug!("{} has no writable property {}", object, last);
                }
            }
            other => log::debug!("cannot set {} on a {} value", last, other.kind()),
        }
    }

    async fn render_foreach(
        &mut self,
        variable: &str,
        iterable: &Expression,
        body: &[Node],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<Flow, Error> {
        let items = self.items(iterable).await?;
        let parent = self
            .loops
            .last()
            .map(|state| Value::Object(Rc::clone(state) as Rc<dyn HostObject>));
        let state = Rc::new(LoopState::new(parent));

        self.loops.push(Rc::clone(&state));
        let result = self.iterate(variable, items, body, &state, out).await;
        self.loops.pop();
        let (flow, iterations) = result?;

        if iterations == 0 && flow == Flow::Normal {
            if let Some(otherwise) = otherwise {
                return self.render_nodes(otherwise, out).await;
            }
        }
        Ok(flow)
    }

    /// Run the loop body once per item; returns how the loop ended and how many iterations
    /// ran. `#break` is absorbed here.
    async fn iterate(
        &mut self,
        variable: &str,
        items: Items,
        body: &[Node],
        state: &Rc<LoopState>,
        out: &mut String,
    ) -> Result<(Flow, usize), Error> {
        let limit = self.options.max_loop_iterations;
        let mut items = items.peekable();
        let mut index = 0;

        while let Some(item) = items.next() {
            if index >= limit {
                log::warn!("#foreach stopped after {} iterations", limit);
                break;
            }
            state.advance(index, items.peek().is_some() && index + 1 < limit);

            self.scopes.push_scope();
            self.scopes.set_variable(variable, item);
            self.scopes
                .set_variable("foreach", Value::Object(Rc::clone(state) as Rc<dyn HostObject>));
            self.scopes.set_variable("velocityCount", Value::from(index + 1));
            let result = self.render_nodes(body, out).await;
            self.scopes.pop_scope()?;
            index += 1;

            match result? {
                Flow::Normal => {}
                Flow::Break => break,
                Flow::Stop => return Ok((Flow::Stop, index)),
            }
            if state.is_stopped() {
                break;
            }
        }
        Ok((Flow::Normal, index))
    }

    /// What a foreach iterates; inline ranges stay lazy.
    async fn items(&mut self, iterable: &Expression) -> Result<Items, Error> {
        if let Expression::RangeLiteral { start, end, .. } = iterable {
            return Ok(match self.bounds(start, end).await? {
                Some((first, last)) => Items::range(first, last),
                None => Items::of(&Value::Null),
            });
        }
        Ok(Items::of(&self.evaluate(iterable).await?))
    }

    async fn bounds(&mut self, start: &Expression, end: &Expression) -> Result<Option<(i64, i64)>, Error> {
        let first = self.evaluate(start).await?.as_index();
        let last = self.evaluate(end).await?.as_index();
        Ok(first.zip(last))
    }

    async fn call_macro(
        &mut self,
        definition: Rc<MacroDefinition>,
        arguments: &[Expression],
        out: &mut String,
    ) -> Result<Flow, Error> {
        if self.macro_depth >= self.options.max_macro_depth {
            log::warn!(
                "#{} skipped: macro nesting exceeds {}",
                definition.name,
                self.options.max_macro_depth
            );
            return Ok(Flow::Normal);
        }
        let values = self.evaluate_all(arguments).await?;

        self.scopes.push_scope();
        for (at, parameter) in definition.parameters.iter().enumerate() {
            let value = values.get(at).cloned().unwrap_or_default();
            self.scopes.set_variable(parameter.as_str(), value);
        }
        self.macro_depth += 1;
        let result = self.render_nodes(&definition.body, out).await;
        self.macro_depth -= 1;
        self.scopes.pop_scope()?;

        match result? {
            Flow::Stop => Ok(Flow::Stop),
            _ => Ok(Flow::Normal),
        }
    }

    fn may_nest(&self, directive: &str) -> bool {
        if self.parse_depth >= self.options.max_parse_depth {
            log::warn!(
                "{} skipped: nesting exceeds {}",
                directive,
                self.options.max_parse_depth
            );
            return false;
        }
        true
    }

    /// Compile `source` and render it in the current scope.
    async fn render_nested(&mut self, source: &str, out: &mut String) -> Result<Flow, Error> {
        let template = compile(source, self.options)?;
        self.parse_depth += 1;
        let result = self.render_template(&template, out).await;
        self.parse_depth -= 1;
        result
    }

    fn tolerate(&self, error: LoaderError) -> Result<(), Error> {
        if self.options.tolerant_loader {
            log::warn!("{}; rendering nothing", error);
            Ok(())
        } else {
            Err(Error::Loader(error))
        }
    }

    async fn evaluate_all(&mut self, expressions: &[Expression]) -> Result<Vec<Value>, Error> {
        let mut values = Vec::with_capacity(expressions.len());
        for expression in expressions {
            values.push(self.evaluate(expression).await?);
        }
        Ok(values)
    }

    fn evaluate<'a>(&'a mut self, expression: &'a Expression) -> Eval<'a, Value> {
        Box::pin(async move {
            let value = match expression {
                Expression::Literal { value, .. } => match value {
                    Literal::Null => Value::Null,
                    Literal::Bool(b) => Value::Bool(*b),
                    Literal::Number(n) => Value::Number(*n),
                    Literal::String(s) => Value::String(s.clone()),
                },
                Expression::InterpolatedString { nodes, .. } => {
                    let mut text = String::new();
                    self.render_nodes(nodes, &mut text).await?;
                    Value::String(text)
                }
                Expression::VariableReference { name, .. } => {
                    match self.scopes.get_variable(name) {
                        Some(value) => value.clone(),
                        None => {
                            log::debug!("undefined reference ${}", name);
                            Value::Null
                        }
                    }
                }
                Expression::MemberAccess {
                    object, property, ..
                } => {
                    let target = self.evaluate(object).await?;
                    builtins::get_property(&target, property).unwrap_or_default()
                }
                Expression::FunctionCall {
                    callee, arguments, ..
                } => match callee.as_ref() {
                    Expression::MemberAccess {
                        object, property, ..
                    } => {
                        let target = self.evaluate(object).await?;
                        let arguments = self.evaluate_all(arguments).await?;
                        builtins::invoke_method(&target, property, &arguments).unwrap_or_default()
                    }
                    other => {
                        log::debug!("expression at {} is not callable", other.location());
                        Value::Null
                    }
                },
                Expression::ArrayAccess { array, index, .. } => {
                    let target = self.evaluate(array).await?;
                    let key = self.evaluate(index).await?;
                    builtins::index(&target, &key).unwrap_or_default()
                }
                Expression::ObjectLiteral { entries, .. } => {
                    let mut map = IndexMap::with_capacity(entries.len());
                    for (key, expression) in entries {
                        map.insert(key.clone(), self.evaluate(expression).await?);
                    }
                    Value::map(map)
                }
                Expression::ArrayLiteral { elements, .. } => {
                    Value::list(self.evaluate_all(elements).await?)
                }
                Expression::RangeLiteral { start, end, .. } => match self.bounds(start, end).await? {
                    Some((first, last)) => Value::list(Items::range(first, last).collect()),
                    None => Value::list(Vec::new()),
                },
                Expression::BinaryOp {
                    operator: BinaryOperator::And,
                    left,
                    right,
                    ..
                } => Value::Bool(
                    self.evaluate(left).await?.is_truthy() && self.evaluate(right).await?.is_truthy(),
                ),
                Expression::BinaryOp {
                    operator: BinaryOperator::Or,
                    left,
                    right,
                    ..
                } => Value::Bool(
                    self.evaluate(left).await?.is_truthy() || self.evaluate(right).await?.is_truthy(),
                ),
                Expression::BinaryOp {
                    operator,
                    left,
                    right,
                    ..
                } => {
                    let left = self.evaluate(left).await?;
                    let right = self.evaluate(right).await?;
                    operators::binary(*operator, &left, &right)
                }
                Expression::UnaryOp {
                    operator, operand, ..
                } => operators::unary(*operator, &self.evaluate(operand).await?),
                Expression::Ternary {
                    condition,
                    then,
                    otherwise,
                    ..
                } => {
                    if self.evaluate(condition).await?.is_truthy() {
                        self.evaluate(then).await?
                    } else {
                        self.evaluate(otherwise).await?
                    }
                }
            };
            Ok(value)
        })
    }
}
