use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamic, serialisable document used for every opaque payload in the
/// data model (`content`, `caller_context`, `request_params`,
/// `response_data`).
///
/// This is a typed container rather than a language-native "any": callers
/// build and inspect it through the variants below instead of storing
/// arbitrary trait objects. It serialises byte-for-byte like
/// `serde_json::Value` (same wire shape) so storage and fingerprinting can
/// convert freely between the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn object() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Map(m) = self {
            m.insert(key.into(), value);
        }
    }

    /// Recursively collect every key path (dotted for maps, indexed for
    /// arrays) reachable from this value, used by the comparator's
    /// structural similarity pass.
    pub fn key_paths(&self, ignore: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_key_paths(String::new(), ignore, &mut out);
        out
    }

    fn collect_key_paths(&self, prefix: String, ignore: &[&str], out: &mut Vec<String>) {
        match self {
            Value::Map(m) => {
                for (k, v) in m {
                    if ignore.contains(&k.as_str()) {
                        continue;
                    }
                    let path = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    out.push(path.clone());
                    v.collect_key_paths(path, ignore, out);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    let path = format!("{prefix}[{i}]");
                    out.push(path.clone());
                    v.collect_key_paths(path, ignore, out);
                }
            }
            _ => {}
        }
    }

    /// Recursively collect string values found under keys named `content`
    /// or `text`, joined in encounter order — used for the comparator's
    /// semantic-similarity text extraction.
    pub fn collect_text_under(&self, keys: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_text(keys, false, &mut out);
        out
    }

    fn collect_text(&self, keys: &[&str], under_target: bool, out: &mut Vec<String>) {
        match self {
            Value::String(s) => {
                if under_target {
                    out.push(s.clone());
                }
            }
            Value::Array(items) => {
                for v in items {
                    v.collect_text(keys, under_target, out);
                }
            }
            Value::Map(m) => {
                for (k, v) in m {
                    let next_target = under_target || keys.contains(&k.as_str());
                    v.collect_text(keys, next_target, out);
                }
            }
            _ => {}
        }
    }

    /// The type name used by the comparator's value-type agreement check.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Canonical JSON: object keys sorted, minimal separators. Used for
    /// hashing (fingerprinting, checkpoint hashes, exact-match detection).
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&serde_json::to_value(self).expect("Value <-> json is infallible"))
            .expect("serialising a canonicalised json value is infallible")
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Value::Map(m) => {
                serde_json::Value::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_paths_ignore_configured_fields() {
        let mut v = Value::object();
        v.insert("keep", Value::from("a"));
        v.insert("drop", Value::from("b"));
        let paths = v.key_paths(&["drop"]);
        assert_eq!(paths, vec!["keep".to_string()]);
    }

    #[test]
    fn collect_text_under_content_and_text_keys() {
        let mut inner = Value::object();
        inner.insert("content", Value::from("hello world"));
        let mut outer = Value::object();
        outer.insert("message", inner);
        outer.insert("ignored", Value::from("nope"));
        assert_eq!(outer.collect_text_under(&["content", "text"]), vec!["hello world"]);
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let mut v = Value::object();
        v.insert("b", Value::from("2"));
        v.insert("a", Value::from("1"));
        assert_eq!(v.canonical_json(), r#"{"a":"1","b":"2"}"#);
    }
}
