//! Foreach support: what a value iterates as, and the `$foreach` loop object.

use super::host::HostObject;
use super::value::Value;
use std::cell::Cell;
use std::fmt;

/// Items of a foreach, produced lazily so that `[1..1000000]` never materialises.
#[derive(Debug)]
pub enum Items {
    Values(std::vec::IntoIter<Value>),
    Range { next: i64, last: i64, done: bool },
}

impl Items {
    /// Lists iterate their elements, maps their values, null nothing, and anything else
    /// iterates once as itself.
    pub fn of(value: &Value) -> Self {
        let values = match value {
            Value::Null => Vec::new(),
            Value::List(items) => items.borrow().clone(),
            Value::Map(entries) => entries.borrow().values().cloned().collect(),
            other => vec![other.clone()],
        };
        Items::Values(values.into_iter())
    }

    /// Inclusive range, descending when `last < first`.
    pub fn range(first: i64, last: i64) -> Self {
        Items::Range {
            next: first,
            last,
            done: false,
        }
    }
}

impl Iterator for Items {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Items::Values(values) => values.next(),
            Items::Range { next, last, done } => {
                if *done {
                    return None;
                }
                let current = *next;
                if current == *last {
                    *done = true;
                } else if current < *last {
                    *next += 1;
                } else {
                    *next -= 1;
                }
                Some(Value::from(current as f64))
            }
        }
    }
}

/// The `$foreach` object of one loop.
#[derive(Debug)]
pub struct LoopState {
    index: Cell<usize>,
    has_next: Cell<bool>,
    stopped: Cell<bool>,
    parent: Value,
}

impl LoopState {
    pub fn new(parent: Option<Value>) -> Self {
        LoopState {
            index: Cell::new(0),
            has_next: Cell::new(false),
            stopped: Cell::new(false),
            parent: parent.unwrap_or_default(),
        }
    }

    /// Move to iteration `index`; `has_next` tells whether another one follows.
    pub fn advance(&self, index: usize, has_next: bool) {
        self.index.set(index);
        self.has_next.set(has_next);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub fn count(&self) -> usize {
        self.index.get() + 1
    }
}

impl HostObject for LoopState {
    fn get_property(&self, name: &str) -> Option<Value> {
        let value = match name {
            "index" => Value::from(self.index.get()),
            "count" => Value::from(self.count()),
            "hasNext" => Value::Bool(self.has_next.get()),
            "first" => Value::Bool(self.index.get() == 0),
            "last" => Value::Bool(!self.has_next.get()),
            "parent" => self.parent.clone(),
            _ => return None,
        };
        Some(value)
    }

    fn invoke_method(&self, name: &str, arguments: &[Value]) -> Option<Value> {
        match name {
            "stop" => {
                self.stopped.set(true);
                Some(Value::Null)
            }
            "hasNext" | "getIndex" | "getCount" | "getParent" | "isFirst" | "isLast"
                if arguments.is_empty() =>
            {
                let property = match name {
                    "getIndex" => "index",
                    "getCount" => "count",
                    "getParent" => "parent",
                    "isFirst" => "first",
                    "isLast" => "last",
                    other => other,
                };
                self.get_property(property)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "foreach[{}]", self.index.get())
    }
}
