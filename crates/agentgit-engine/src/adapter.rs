use std::collections::HashMap;
use std::sync::Mutex;

use agentgit_bus::EventBus;
use agentgit_types::{Event, EventKind, Owner, Value};
use rusqlite::Connection;

use crate::fingerprint::{compute_fingerprint, extract_message_roles, extract_tool_names};
use crate::Result;

/// Substring table for inferring `provider` from a serialized class name.
/// Checked in order; a name containing both "azure" and "openai" resolves
/// to `azure_openai` before the plain `openai` entry can match.
const PROVIDER_TABLE: &[(&str, &str)] = &[
    ("azure_openai_combo", "azure_openai"),
    ("anthropic", "anthropic"),
    ("openai", "openai"),
    ("bedrock", "bedrock"),
    ("vertexai", "vertexai"),
    ("cohere", "cohere"),
];

fn infer_provider(class_name: &str) -> String {
    let lower = class_name.to_lowercase();
    if lower.contains("azure") && lower.contains("openai") {
        return "azure_openai".to_string();
    }
    for (needle, provider) in PROVIDER_TABLE {
        if *needle != "azure_openai_combo" && lower.contains(needle) {
            return provider.to_string();
        }
    }
    "unknown".to_string()
}

fn method_for_provider(provider: &str) -> &'static str {
    match provider {
        "openai" | "azure_openai" => "chat.completions.create",
        "anthropic" => "messages.create",
        "bedrock" => "invoke_model",
        "vertexai" => "generate_content",
        "cohere" => "chat",
        _ => "unknown",
    }
}

/// Transient state for one in-flight LLM call, kept from the start
/// callback until the matching end/error callback fires.
struct PendingCall {
    owner: Owner,
    provider: String,
    method: String,
    model: String,
    message_roles: Vec<String>,
    tool_names: Vec<String>,
    request_params: Value,
    fingerprint: String,
}

/// Translates an external agent-orchestration framework's callbacks into
/// bus `Event`s. Owns the bus and a per-`run_id` map of in-flight calls;
/// every entry is released on the matching end or error callback so
/// long-running agents never leak memory here.
pub struct FrameworkAdapter {
    pending: Mutex<HashMap<String, PendingCall>>,
    seen_owners: Mutex<HashMap<String, Owner>>,
}

impl Default for FrameworkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameworkAdapter {
    pub fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()), seen_owners: Mutex::new(HashMap::new()) }
    }

    /// Resolves `(user_id, session_id)` with priority: explicit
    /// `configurable` field > event metadata > inherited from `run_id`
    /// already seen > inherited from `parent_run_id` > the sentinel.
    fn resolve_owner(
        &self,
        configurable: Option<&Owner>,
        metadata_owner: Option<&Owner>,
        run_id: &str,
        parent_run_id: Option<&str>,
    ) -> Owner {
        if let Some(owner) = configurable {
            return owner.clone();
        }
        if let Some(owner) = metadata_owner {
            return owner.clone();
        }
        let seen = self.seen_owners.lock().unwrap();
        if let Some(owner) = seen.get(run_id) {
            return owner.clone();
        }
        if let Some(parent) = parent_run_id {
            if let Some(owner) = seen.get(parent) {
                return owner.clone();
            }
        }
        Owner::default_sentinel()
    }

    fn remember_owner(&self, run_id: &str, owner: &Owner) {
        self.seen_owners.lock().unwrap().insert(run_id.to_string(), owner.clone());
    }

    /// A chat-model-start callback: infers provider/method, flattens
    /// messages, extracts tools, computes the fingerprint, and stashes a
    /// pending entry keyed by `run_id`. Does not itself publish an event —
    /// the adapter only emits on the matching end/error callback.
    #[allow(clippy::too_many_arguments)]
    pub fn on_llm_start(
        &self,
        run_id: &str,
        parent_run_id: Option<&str>,
        class_name: &str,
        model: &str,
        messages: &Value,
        invocation_params: &Value,
        configurable: Option<&Owner>,
        metadata_owner: Option<&Owner>,
    ) -> Owner {
        let owner = self.resolve_owner(configurable, metadata_owner, run_id, parent_run_id);
        self.remember_owner(run_id, &owner);

        let provider = infer_provider(class_name);
        let method = method_for_provider(&provider).to_string();
        let message_roles = extract_message_roles(messages);
        let tool_names = extract_tool_names(invocation_params);
        let fingerprint =
            compute_fingerprint(&provider, &method, model, &message_roles, &tool_names);

        self.pending.lock().unwrap().insert(
            run_id.to_string(),
            PendingCall {
                owner: owner.clone(),
                provider,
                method,
                model: model.to_string(),
                message_roles,
                tool_names,
                request_params: invocation_params.clone(),
                fingerprint,
            },
        );
        owner
    }

    /// On llm-end: builds and publishes `LLM_CALL_END` carrying the
    /// enriched sidecar fields in event metadata, then drops the pending
    /// entry. A missing entry (duplicate or orphaned callback) is handled
    /// defensively — the handler returns without emitting. `conn` is bound
    /// to the publish so the tracer's node insert and the recording
    /// session's sidecar insert commit (or roll back) atomically with this
    /// event, the same as every other production publish.
    pub fn on_llm_end(
        &self,
        bus: &EventBus,
        conn: &Connection,
        run_id: &str,
        response_data: &Value,
    ) -> Result<()> {
        let Some(pending) = self.pending.lock().unwrap().remove(run_id) else { return Ok(()) };

        let mut metadata = Value::object();
        metadata.insert("provider", Value::from(pending.provider.clone()));
        metadata.insert("method", Value::from(pending.method.clone()));
        metadata.insert("model", Value::from(pending.model.clone()));
        metadata.insert("fingerprint", Value::from(pending.fingerprint.clone()));
        metadata.insert("request_params", pending.request_params.clone());
        metadata.insert("response_data", response_data.clone());

        let event = Event::new(EventKind::LlmCallEnd, pending.owner)
            .with_run_id(run_id.to_string())
            .with_metadata(metadata);
        bus.publish(&event, Some(conn))?;
        Ok(())
    }

    /// On llm-error: publishes `LLM_ERROR` and frees the per-run entry
    /// regardless of whether the publish succeeds.
    pub fn on_llm_error(
        &self,
        bus: &EventBus,
        conn: &Connection,
        run_id: &str,
        error: &str,
    ) -> Result<()> {
        let Some(pending) = self.pending.lock().unwrap().remove(run_id) else { return Ok(()) };

        let mut metadata = Value::object();
        metadata.insert("error", Value::from(error.to_string()));
        let event = Event::new(EventKind::LlmError, pending.owner)
            .with_run_id(run_id.to_string())
            .with_metadata(metadata);
        bus.publish(&event, Some(conn))?;
        Ok(())
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        agentgit_store::test_support::init_schema_for_tests(&conn).unwrap();
        conn
    }

    #[test]
    fn azure_openai_combo_resolves_before_plain_openai() {
        assert_eq!(infer_provider("AzureChatOpenAI"), "azure_openai");
        assert_eq!(infer_provider("ChatOpenAI"), "openai");
        assert_eq!(infer_provider("ChatAnthropic"), "anthropic");
    }

    #[test]
    fn pending_entry_is_released_on_end() {
        let adapter = FrameworkAdapter::new();
        let bus = EventBus::new();
        let conn = open_conn();
        let messages = Value::Array(vec![]);
        let params = Value::object();

        adapter.on_llm_start(
            "run-1",
            None,
            "ChatOpenAI",
            "gpt-4",
            &messages,
            &params,
            None,
            None,
        );
        assert_eq!(adapter.pending_count(), 1);

        adapter.on_llm_end(&bus, &conn, "run-1", &Value::object()).unwrap();
        assert_eq!(adapter.pending_count(), 0);
    }

    #[test]
    fn pending_entry_is_released_on_error_too() {
        let adapter = FrameworkAdapter::new();
        let bus = EventBus::new();
        let conn = open_conn();
        adapter.on_llm_start(
            "run-2",
            None,
            "ChatOpenAI",
            "gpt-4",
            &Value::Array(vec![]),
            &Value::object(),
            None,
            None,
        );
        adapter.on_llm_error(&bus, &conn, "run-2", "boom").unwrap();
        assert_eq!(adapter.pending_count(), 0);
    }

    #[test]
    fn duplicate_end_callback_is_a_defensive_no_op() {
        let adapter = FrameworkAdapter::new();
        let bus = EventBus::new();
        let conn = open_conn();
        adapter.on_llm_end(&bus, &conn, "never-started", &Value::object()).unwrap();
        assert_eq!(adapter.pending_count(), 0);
    }

    #[test]
    fn owner_falls_back_to_sentinel_when_unresolvable() {
        let adapter = FrameworkAdapter::new();
        let owner = adapter.on_llm_start(
            "run-3",
            None,
            "ChatOpenAI",
            "gpt-4",
            &Value::Array(vec![]),
            &Value::object(),
            None,
            None,
        );
        assert!(owner.is_default_sentinel());
    }
}
