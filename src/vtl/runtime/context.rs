//! Evaluation context and provider registry
//!
//! The [Context] is what a caller renders against: plain values by name plus the host
//! objects of its [Providers] registry. Neither is ever written by a render. The evaluator
//! builds the global scope from a deep copy, providers first, so a context value wins over a
//! provider of the same name.

use super::host::HostObject;
use super::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

/// Named host objects (`$util`, `$input`, ...) injected into every render.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    objects: IndexMap<String, Rc<dyn HostObject>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, object: impl HostObject + 'static) {
        self.objects.insert(name.into(), Rc::new(object));
    }

    pub fn get(&self, name: &str) -> Option<&Rc<dyn HostObject>> {
        self.objects.get(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    values: IndexMap<String, Value>,
    providers: Providers,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose variables are the entries of a JSON object. Anything else yields an
    /// empty context.
    pub fn from_json(json: serde_json::Value) -> Self {
        let mut context = Context::new();
        match json {
            serde_json::Value::Object(entries) => {
                for (name, value) in entries {
                    context.insert(name, Value::from(value));
                }
            }
            other => log::warn!("context must be a JSON object, ignoring {}", other),
        }
        context
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder form of [Context::insert].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_provider(mut self, name: impl Into<String>, object: impl HostObject + 'static) -> Self {
        self.providers.register(name, object);
        self
    }

    pub fn providers_mut(&mut self) -> &mut Providers {
        &mut self.providers
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The global scope of a render: providers, then a deep copy of every context value.
    pub(crate) fn global_scope(&self) -> IndexMap<String, Value> {
        let mut global: IndexMap<String, Value> = self
            .providers
            .objects
            .iter()
            .map(|(name, object)| (name.clone(), Value::Object(Rc::clone(object))))
            .collect();
        for (name, value) in &self.values {
            global.insert(name.clone(), value.deep_clone());
        }
        global
    }
}
