use agentgit_types::Value;
use sha2::{Digest, Sha256};

/// A 16-hex-character structural signature of an LLM request: stable
/// across equivalent calls, different across materially different ones.
/// Content bodies, parameter values, temperatures, and token limits are
/// deliberately excluded — they are payload for similarity scoring, not
/// structure for alignment.
pub fn compute_fingerprint(
    provider: &str,
    method: &str,
    model: &str,
    message_roles: &[String],
    tool_names: &[String],
) -> String {
    let roles_json = serde_json::to_string(message_roles).unwrap_or_else(|_| "[]".into());
    let tools_json = serde_json::to_string(tool_names).unwrap_or_else(|_| "[]".into());

    let input = [provider, method, model, &roles_json, &tools_json].join("|");

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 16)
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut out = String::with_capacity(chars);
    for byte in bytes {
        if out.len() >= chars {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(chars);
    out
}

/// Extracts tool names from `invocation_params`, preferring `tools` (each
/// either `{"function": {"name": ...}}` or `{"name": ...}`), falling back
/// to the legacy top-level `functions` array. Order is preserved.
pub fn extract_tool_names(invocation_params: &Value) -> Vec<String> {
    let list = invocation_params
        .get("tools")
        .and_then(Value::as_array)
        .or_else(|| invocation_params.get("functions").and_then(Value::as_array));

    let Some(list) = list else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|entry| {
            entry
                .get("function")
                .and_then(|f| f.get("name"))
                .or_else(|| entry.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

/// Flattens nested message batches (a list of lists, or a flat list) into
/// an ordered list of role strings, preserving order.
pub fn extract_message_roles(messages: &Value) -> Vec<String> {
    let mut roles = Vec::new();
    collect_roles(messages, &mut roles);
    roles
}

fn collect_roles(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                if let Some(role) = item.get("role").and_then(Value::as_str) {
                    out.push(role.to_string());
                } else {
                    collect_roles(item, out);
                }
            }
        }
        Value::Map(_) => {
            if let Some(role) = value.get("role").and_then(Value::as_str) {
                out.push(role.to_string());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_equal_inputs() {
        let a = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["user".to_string()],
            &[],
        );
        let b = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["user".to_string()],
            &[],
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn order_sensitive_for_roles_and_tools() {
        let base = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["user".to_string(), "system".to_string()],
            &[],
        );
        let swapped = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["system".to_string(), "user".to_string()],
            &[],
        );
        assert_ne!(base, swapped);

        let tools_a = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["user".to_string()],
            &["search".to_string(), "lookup".to_string()],
        );
        let tools_b = compute_fingerprint(
            "openai",
            "chat.completions.create",
            "gpt-4",
            &["user".to_string()],
            &["lookup".to_string(), "search".to_string()],
        );
        assert_ne!(tools_a, tools_b);
    }

    #[test]
    fn extracts_tool_names_from_function_shape() {
        let mut function = Value::object();
        function.insert("name", Value::from("search"));
        let mut tool = Value::object();
        tool.insert("function", function);
        let mut params = Value::object();
        params.insert("tools", Value::Array(vec![tool]));

        assert_eq!(extract_tool_names(&params), vec!["search".to_string()]);
    }
}
