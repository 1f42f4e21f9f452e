//! Scope manager
//!
//!     Variables live in a stack of scopes. The bottom scope is the global one, seeded from
//!     providers and the caller's context; foreach iterations and macro invocations push a
//!     child on entry and pop it on exit. Reads search innermost to outermost; writes always
//!     go to the innermost scope.
//!
//!     Macros are not scoped: one flat [MacroTable] per render holds every definition seen so
//!     far, wherever it appeared.

use super::value::Value;
use crate::vtl::ast::MacroDefinition;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("cannot pop the global scope")]
    PopGlobal,
}

/// Nested name → value scopes, innermost last.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<IndexMap<String, Value>>,
}

impl ScopeStack {
    /// A stack holding only the given global scope.
    pub fn new(global: IndexMap<String, Value>) -> Self {
        ScopeStack {
            scopes: vec![global],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop_scope(&mut self) -> Result<(), ScopeError> {
        if self.scopes.len() <= 1 {
            return Err(ScopeError::PopGlobal);
        }
        self.scopes.pop();
        Ok(())
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Number of scopes including the global one.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        ScopeStack::new(IndexMap::new())
    }
}

/// Macros defined during one render.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Rc<MacroDefinition>>,
    allow_replace: bool,
}

impl MacroTable {
    pub fn new(allow_replace: bool) -> Self {
        MacroTable {
            macros: HashMap::new(),
            allow_replace,
        }
    }

    /// Register a definition. The first definition of a name wins unless replacement is
    /// allowed; returns whether `definition` is now the active one.
    pub fn define(&mut self, definition: Rc<MacroDefinition>) -> bool {
        if !self.allow_replace && self.macros.contains_key(&definition.name) {
            log::debug!("macro #{} already defined, keeping the first", definition.name);
            return false;
        }
        self.macros.insert(definition.name.clone(), definition);
        true
    }

    pub fn get(&self, name: &str) -> Option<Rc<MacroDefinition>> {
        self.macros.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtl::ast::Range;

    #[test]
    fn test_innermost_scope_shadows() {
        let mut scopes = ScopeStack::default();
        scopes.set_variable("x", Value::from(1));
        scopes.push_scope();
        assert_eq!(scopes.get_variable("x"), Some(&Value::from(1)));
        scopes.set_variable("x", Value::from(2));
        assert_eq!(scopes.get_variable("x"), Some(&Value::from(2)));
        scopes.pop_scope().unwrap();
        assert_eq!(scopes.get_variable("x"), Some(&Value::from(1)));
        assert_eq!(scopes.get_variable("y"), None);
    }

    #[test]
    fn test_pop_global_is_error() {
        let mut scopes = ScopeStack::default();
        scopes.push_scope();
        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.pop_scope(), Ok(()));
        assert_eq!(scopes.pop_scope(), Err(ScopeError::PopGlobal));
        assert_eq!(scopes.depth(), 1);
    }

    fn definition(name: &str, parameter: &str) -> Rc<MacroDefinition> {
        Rc::new(MacroDefinition {
            name: name.to_string(),
            parameters: vec![parameter.to_string()],
            body: Vec::new(),
            location: Range::default(),
        })
    }

    #[test]
    fn test_first_macro_definition_wins() {
        let mut table = MacroTable::new(false);
        assert!(table.define(definition("m", "a")));
        assert!(!table.define(definition("m", "b")));
        assert_eq!(table.get("m").map(|m| m.parameters.clone()), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_macro_replacement_when_allowed() {
        let mut table = MacroTable::new(true);
        table.define(definition("m", "a"));
        assert!(table.define(definition("m", "b")));
        assert_eq!(table.get("m").map(|m| m.parameters.clone()), Some(vec!["b".to_string()]));
        assert!(table.get("other").is_none());
    }
}
