//! Deterministic builders for owners, workspace files and bus events so
//! integration tests don't hand-roll `Value` trees inline.

use std::path::Path;

use agentgit_types::{Event, EventKind, Owner, Value};
use sha2::{Digest, Sha256};

/// A stable owner derived from `label`, so two tests picking the same
/// label never collide and the same label always reproduces the same
/// owner across runs.
pub fn owner(label: &str) -> Owner {
    let digest = Sha256::digest(label.as_bytes());
    let session_id = digest.iter().take(4).map(|b| format!("{b:02x}")).collect::<String>();
    Owner::new(label, session_id)
}

/// Writes `contents` to `workspace/relative_path`, creating parent
/// directories as needed.
pub fn write_workspace_file(workspace: &Path, relative_path: &str, contents: &str) {
    let path = workspace.join(relative_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create fixture parent dir");
    }
    std::fs::write(path, contents).expect("failed to write fixture file");
}

/// A single chat message `{"role": ..., "content": ...}`.
pub fn message(role: &str, content: &str) -> Value {
    let mut m = Value::object();
    m.insert("role", Value::from(role));
    m.insert("content", Value::from(content));
    m
}

pub fn messages(pairs: &[(&str, &str)]) -> Value {
    Value::Array(pairs.iter().map(|(role, content)| message(role, content)).collect())
}

/// The metadata payload the framework adapter attaches to `LlmCallEnd` /
/// `LlmError` events, built directly rather than through the adapter so
/// tests can target the tracer/recording pipeline in isolation.
pub fn llm_call_end_event(
    owner: &Owner,
    provider: &str,
    method: &str,
    model: &str,
    fingerprint: &str,
    request_params: Value,
    response_data: Value,
) -> Event {
    let mut metadata = Value::object();
    metadata.insert("provider", Value::from(provider));
    metadata.insert("method", Value::from(method));
    metadata.insert("model", Value::from(model));
    metadata.insert("fingerprint", Value::from(fingerprint));
    metadata.insert("request_params", request_params);
    metadata.insert("response_data", response_data);
    Event::new(EventKind::LlmCallEnd, owner.clone()).with_metadata(metadata)
}

pub fn user_input_event(owner: &Owner, message: &str) -> Event {
    let mut metadata = Value::object();
    metadata.insert("message", Value::from(message));
    Event::new(EventKind::UserInput, owner.clone()).with_metadata(metadata)
}

pub fn tool_call_end_event(owner: &Owner, tool_name: &str, output: Value) -> Event {
    let mut metadata = Value::object();
    metadata.insert("tool_name", Value::from(tool_name));
    metadata.insert("output", output);
    Event::new(EventKind::ToolCallEnd, owner.clone()).with_metadata(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_fixture_is_stable_across_calls() {
        assert_eq!(owner("alice"), owner("alice"));
        assert_ne!(owner("alice"), owner("bob"));
    }

    #[test]
    fn messages_builds_an_array_of_role_content_maps() {
        let v = messages(&[("system", "be terse"), ("user", "hi")]);
        let arr = v.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0].get("role").and_then(Value::as_str), Some("system"));
    }
}
