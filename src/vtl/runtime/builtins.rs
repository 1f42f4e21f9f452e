//! Built-in members of plain data
//!
//! Strings, lists, maps, numbers and booleans answer a fixed set of Java-flavoured methods
//! (`$name.toUpperCase()`, `$list.add(1)`, `$map.keySet()`). Host objects answer their own.
//! Unknown members resolve to `None`, which the evaluator renders as null.

use super::host::getter_name;
use super::value::{format_number, Value};
use indexmap::IndexMap;
use regex::Regex;

/// `$value.name`
pub fn get_property(target: &Value, name: &str) -> Option<Value> {
    match target {
        Value::Null => None,
        Value::Map(entries) => entries.borrow().get(name).cloned(),
        Value::Object(object) => object.get_property(name),
        _ => {
            // bean-style: `$list.empty` → isEmpty(), `$s.bytes` → getBytes()
            let mut chars = name.chars();
            let first = chars.next()?;
            let is_name = format!("is{}{}", first.to_uppercase(), chars.as_str());
            invoke_method(target, &getter_name(name), &[])
                .or_else(|| invoke_method(target, &is_name, &[]))
        }
    }
}

/// `$value.name(arguments)`
pub fn invoke_method(target: &Value, name: &str, arguments: &[Value]) -> Option<Value> {
    match target {
        Value::Null => None,
        Value::Bool(b) => match name {
            "toString" => Some(Value::from(b.to_string())),
            "booleanValue" => Some(Value::Bool(*b)),
            _ => None,
        },
        Value::Number(n) => match name {
            "intValue" | "longValue" => Some(Value::Number(n.trunc())),
            "doubleValue" => Some(Value::Number(*n)),
            "toString" => Some(Value::from(format_number(*n))),
            _ => None,
        },
        Value::String(s) => string_method(s, name, arguments),
        Value::List(_) => list_method(target, name, arguments),
        Value::Map(_) => map_method(target, name, arguments),
        Value::Object(object) => object.invoke_method(name, arguments),
    }
}

/// `$value[index]`: list positions (negative counts from the end) and map keys.
pub fn index(target: &Value, key: &Value) -> Option<Value> {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            position(items.len(), key).map(|at| items[at].clone())
        }
        Value::Map(entries) => entries.borrow().get(&key.to_string()).cloned(),
        Value::Object(object) => object
            .invoke_method("get", std::slice::from_ref(key))
            .or_else(|| object.get_property(&key.to_string())),
        _ => None,
    }
}

/// Resolve a possibly negative index against a length.
fn position(len: usize, key: &Value) -> Option<usize> {
    let at = key.as_index()?;
    let at = if at < 0 { len as i64 + at } else { at };
    (0..len as i64).contains(&at).then_some(at as usize)
}

fn argument(arguments: &[Value], at: usize) -> Option<&Value> {
    arguments.get(at)
}

fn text_argument(arguments: &[Value], at: usize) -> Option<String> {
    argument(arguments, at)
        .filter(|value| !value.is_null())
        .map(Value::to_string)
}

fn char_index(haystack: &str, byte: Option<usize>) -> Value {
    match byte {
        Some(byte) => Value::from(haystack[..byte].chars().count()),
        None => Value::from(-1),
    }
}

fn string_method(s: &str, name: &str, arguments: &[Value]) -> Option<Value> {
    let value = match name {
        "length" | "size" => Value::from(s.chars().count()),
        "isEmpty" => Value::Bool(s.is_empty()),
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "toString" => Value::from(s),
        "contains" => Value::Bool(s.contains(text_argument(arguments, 0)?.as_str())),
        "startsWith" => Value::Bool(s.starts_with(text_argument(arguments, 0)?.as_str())),
        "endsWith" => Value::Bool(s.ends_with(text_argument(arguments, 0)?.as_str())),
        "indexOf" => char_index(s, s.find(text_argument(arguments, 0)?.as_str())),
        "lastIndexOf" => char_index(s, s.rfind(text_argument(arguments, 0)?.as_str())),
        "concat" => Value::from(format!("{}{}", s, text_argument(arguments, 0)?)),
        "equals" => Value::Bool(argument(arguments, 0)?.as_str() == Some(s)),
        "equalsIgnoreCase" => Value::Bool(
            argument(arguments, 0)?
                .as_str()
                .is_some_and(|other| other.to_lowercase() == s.to_lowercase()),
        ),
        "charAt" => {
            let at = argument(arguments, 0)?.as_index()?;
            let c = usize::try_from(at).ok().and_then(|at| s.chars().nth(at))?;
            Value::from(c.to_string())
        }
        "substring" => {
            let len = s.chars().count() as i64;
            let start = argument(arguments, 0)?.as_index()?.clamp(0, len);
            let end = match argument(arguments, 1) {
                Some(end) => end.as_index()?.clamp(start, len),
                None => len,
            };
            Value::from(
                s.chars()
                    .skip(start as usize)
                    .take((end - start) as usize)
                    .collect::<String>(),
            )
        }
        "replace" => {
            let from = text_argument(arguments, 0)?;
            let to = text_argument(arguments, 1).unwrap_or_default();
            Value::from(s.replace(from.as_str(), &to))
        }
        "replaceAll" | "replaceFirst" => {
            let pattern = compile(&text_argument(arguments, 0)?)?;
            let to = text_argument(arguments, 1).unwrap_or_default();
            if name == "replaceAll" {
                Value::from(pattern.replace_all(s, to.as_str()).into_owned())
            } else {
                Value::from(pattern.replace(s, to.as_str()).into_owned())
            }
        }
        "matches" => {
            let pattern = compile(&format!("^(?:{})$", text_argument(arguments, 0)?))?;
            Value::Bool(pattern.is_match(s))
        }
        "split" => {
            let pattern = compile(&text_argument(arguments, 0)?)?;
            let mut parts: Vec<Value> = pattern.split(s).map(Value::from).collect();
            // trailing empty strings are dropped
            while parts.last().is_some_and(|part| part.as_str() == Some("")) {
                parts.pop();
            }
            Value::list(parts)
        }
        _ => return None,
    };
    Some(value)
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            log::debug!("invalid pattern {:?}: {}", pattern, error);
            None
        }
    }
}

fn list_method(target: &Value, name: &str, arguments: &[Value]) -> Option<Value> {
    let Value::List(items) = target else {
        return None;
    };
    let value = match name {
        "size" => Value::from(items.borrow().len()),
        "isEmpty" => Value::Bool(items.borrow().is_empty()),
        "toString" => Value::from(target.to_string()),
        "get" => {
            let items = items.borrow();
            let at = position(items.len(), argument(arguments, 0)?)?;
            items[at].clone()
        }
        "contains" => {
            let needle = argument(arguments, 0)?;
            Value::Bool(items.borrow().iter().any(|item| item.loose_eq(needle)))
        }
        "indexOf" => {
            let needle = argument(arguments, 0)?;
            let found = items.borrow().iter().position(|item| item.loose_eq(needle));
            found.map_or(Value::from(-1), Value::from)
        }
        "add" => match arguments {
            [item] => {
                items.borrow_mut().push(item.clone());
                Value::Bool(true)
            }
            [at, item] => {
                let len = items.borrow().len();
                let at = usize::try_from(at.as_index()?).ok().filter(|at| *at <= len)?;
                items.borrow_mut().insert(at, item.clone());
                Value::Null
            }
            _ => return None,
        },
        "remove" => {
            let key = argument(arguments, 0)?;
            if let Value::Number(_) = key {
                let len = items.borrow().len();
                let at = position(len, key)?;
                items.borrow_mut().remove(at)
            } else {
                let found = items.borrow().iter().position(|item| item.loose_eq(key));
                match found {
                    Some(at) => {
                        items.borrow_mut().remove(at);
                        Value::Bool(true)
                    }
                    None => Value::Bool(false),
                }
            }
        }
        _ => return None,
    };
    Some(value)
}

fn map_method(target: &Value, name: &str, arguments: &[Value]) -> Option<Value> {
    let Value::Map(entries) = target else {
        return None;
    };
    let key = || argument(arguments, 0).map(Value::to_string);
    let value = match name {
        "size" => Value::from(entries.borrow().len()),
        "isEmpty" => Value::Bool(entries.borrow().is_empty()),
        "toString" => Value::from(target.to_string()),
        "get" => entries.borrow().get(&key()?).cloned().unwrap_or_default(),
        "containsKey" => Value::Bool(entries.borrow().contains_key(&key()?)),
        "put" => {
            let value = argument(arguments, 1).cloned().unwrap_or_default();
            entries
                .borrow_mut()
                .insert(key()?, value)
                .unwrap_or_default()
        }
        "remove" => entries
            .borrow_mut()
            .shift_remove(&key()?)
            .unwrap_or_default(),
        "keySet" => Value::list(entries.borrow().keys().map(|k| Value::from(k.as_str())).collect()),
        "values" => Value::list(entries.borrow().values().cloned().collect()),
        "entrySet" => Value::list(
            entries
                .borrow()
                .iter()
                .map(|(key, value)| {
                    let mut entry = IndexMap::new();
                    entry.insert("key".to_string(), Value::from(key.as_str()));
                    entry.insert("value".to_string(), value.clone());
                    Value::map(entry)
                })
                .collect(),
        ),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(target: &Value, name: &str, arguments: &[Value]) -> String {
        invoke_method(target, name, arguments)
            .map(|value| value.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }

    #[test]
    fn test_string_methods() {
        let s = Value::from("Hello, World");
        assert_eq!(call(&s, "length", &[]), "12");
        assert_eq!(call(&s, "toUpperCase", &[]), "HELLO, WORLD");
        assert_eq!(call(&s, "indexOf", &["World".into()]), "7");
        assert_eq!(call(&s, "indexOf", &["x".into()]), "-1");
        assert_eq!(call(&s, "substring", &[7.into()]), "World");
        assert_eq!(call(&s, "substring", &[0.into(), 5.into()]), "Hello");
        assert_eq!(call(&s, "charAt", &[4.into()]), "o");
        assert_eq!(call(&s, "replace", &["l".into(), "L".into()]), "HeLLo, WorLd");
        assert_eq!(call(&s, "equalsIgnoreCase", &["hello, world".into()]), "true");
        assert_eq!(call(&s, "frobnicate", &[]), "<none>");
    }

    #[test]
    fn test_string_regex_methods() {
        let s = Value::from("a1b22c333");
        assert_eq!(call(&s, "replaceAll", &["[0-9]+".into(), "-".into()]), "a-b-c-");
        assert_eq!(call(&s, "matches", &["[a-c0-9]+".into()]), "true");
        assert_eq!(call(&s, "matches", &["a1".into()]), "false");
        assert_eq!(call(&s, "split", &["[0-9]+".into()]), "[a, b, c]");
        assert_eq!(call(&s, "replaceAll", &["(".into(), "".into()]), "<none>");
    }

    #[test]
    fn test_list_methods_mutate_shared_list() {
        let list = Value::from(json!([1, 2, 3]));
        let alias = list.clone();
        assert_eq!(call(&list, "add", &[4.into()]), "true");
        assert_eq!(alias.to_string(), "[1, 2, 3, 4]");
        assert_eq!(call(&list, "remove", &[0.into()]), "1");
        assert_eq!(call(&list, "contains", &["3".into()]), "true");
        assert_eq!(call(&list, "get", &[(-1).into()]), "4");
        assert_eq!(call(&list, "get", &[10.into()]), "<none>");
        assert_eq!(call(&list, "size", &[]), "3");
    }

    #[test]
    fn test_map_methods() {
        let map = Value::from(json!({"a": 1}));
        assert_eq!(call(&map, "put", &["b".into(), 2.into()]), "");
        assert_eq!(call(&map, "put", &["a".into(), 3.into()]), "1");
        assert_eq!(call(&map, "keySet", &[]), "[a, b]");
        assert_eq!(call(&map, "entrySet", &[]), "[{key=a, value=3}, {key=b, value=2}]");
        assert_eq!(call(&map, "remove", &["a".into()]), "3");
        assert_eq!(map.to_string(), "{b=2}");
    }

    #[test]
    fn test_properties() {
        let map = Value::from(json!({"name": "x"}));
        assert_eq!(get_property(&map, "name"), Some(Value::from("x")));
        assert_eq!(get_property(&map, "size"), None);
        assert_eq!(get_property(&Value::from(json!([])), "empty"), Some(Value::Bool(true)));
        assert_eq!(get_property(&Value::Null, "x"), None);
    }

    #[test]
    fn test_index() {
        let list = Value::from(json!(["a", "b"]));
        assert_eq!(index(&list, &Value::from(1)), Some(Value::from("b")));
        assert_eq!(index(&list, &Value::from(-2)), Some(Value::from("a")));
        assert_eq!(index(&list, &Value::from(2)), None);
        let map = Value::from(json!({"k": true}));
        assert_eq!(index(&map, &Value::from("k")), Some(Value::Bool(true)));
    }
}
