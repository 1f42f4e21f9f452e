//! Host object capability interface
//!
//!     Anything the embedding application hands to templates that is not plain data is a
//!     [HostObject]: something that can be asked for a property by name and asked to run a
//!     method by name with evaluated arguments. Templates never see more than that, so
//!     gateway-style providers (`$util`, `$input`, ...) and loop metadata go through the same
//!     two calls as everything else.
//!
//!     [FnObject] is the ready-made adapter for callable-bearing objects: a named bag of
//!     properties and closures.

use super::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// An opaque value exposing properties and methods to templates.
///
/// Returning `None` means the member does not exist; the evaluator turns that into null.
pub trait HostObject: fmt::Debug + fmt::Display {
    fn get_property(&self, name: &str) -> Option<Value>;

    fn invoke_method(&self, name: &str, arguments: &[Value]) -> Option<Value>;
}

type Method = Box<dyn Fn(&[Value]) -> Value>;

/// A host object assembled from named properties and closures.
///
/// Besides exact names, a property `foo` is also served by a zero-argument method `getFoo`,
/// and a call `getFoo()` by a property `foo`, mirroring bean-style accessors.
pub struct FnObject {
    name: String,
    properties: IndexMap<String, Value>,
    methods: IndexMap<String, Method>,
}

impl FnObject {
    pub fn new(name: impl Into<String>) -> Self {
        FnObject {
            name: name.into(),
            properties: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `foo` → `getFoo`
pub(crate) fn getter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

/// `foo` → `setFoo`
pub(crate) fn setter_name(property: &str) -> String {
    format!("s{}", &getter_name(property)[1..])
}

/// `getFoo` → `foo`
fn property_name(getter: &str) -> Option<String> {
    let rest = getter.strip_prefix("get")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(format!("{}{}", first.to_lowercase(), chars.as_str()))
}

impl HostObject for FnObject {
    fn get_property(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.clone());
        }
        self.methods.get(&getter_name(name)).map(|method| method(&[]))
    }

    fn invoke_method(&self, name: &str, arguments: &[Value]) -> Option<Value> {
        if let Some(method) = self.methods.get(name) {
            return Some(method(arguments));
        }
        if arguments.is_empty() {
            return property_name(name).and_then(|property| self.properties.get(&property).cloned());
        }
        None
    }
}

impl fmt::Debug for FnObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObject")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for FnObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn util() -> FnObject {
        FnObject::new("util")
            .with_property("version", "1.0")
            .with_method("getName", |_| Value::from("gateway"))
            .with_method("escape", |args| {
                Value::from(args.first().map(|v| v.to_string().replace('"', "\\\"")))
            })
    }

    #[test]
    fn test_properties_and_methods() {
        let util = util();
        assert_eq!(util.get_property("version"), Some(Value::from("1.0")));
        assert_eq!(
            util.invoke_method("escape", &[Value::from("a\"b")]),
            Some(Value::from("a\\\"b"))
        );
        assert_eq!(util.invoke_method("escape", &[]), Some(Value::Null));
        assert_eq!(util.get_property("missing"), None);
    }

    #[test]
    fn test_bean_style_accessors() {
        let util = util();
        assert_eq!(util.get_property("name"), Some(Value::from("gateway")));
        assert_eq!(util.invoke_method("getVersion", &[]), Some(Value::from("1.0")));
        assert_eq!(util.invoke_method("getVersion", &[Value::Null]), None);
        assert_eq!(getter_name("size"), "getSize");
        assert_eq!(setter_name("size"), "setSize");
        assert_eq!(property_name("gets"), None);
    }

    #[test]
    fn test_display_is_name() {
        assert_eq!(util().to_string(), "util");
    }
}
