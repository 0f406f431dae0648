use agentgit_types::Value;

/// Canonical JSON text for a `Value`, as stored in a TEXT column.
pub fn value_to_sql(v: &Value) -> String {
    v.canonical_json()
}

pub fn value_from_sql(text: &str) -> Value {
    let json: serde_json::Value = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
    Value::from(json)
}

pub fn string_vec_to_sql(v: &[String]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string())
}

pub fn string_vec_from_sql(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_default()
}
