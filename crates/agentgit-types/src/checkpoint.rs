use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A filesystem + conversation-state checkpoint, keyed by a 12-char hash
/// computed over canonical JSON of `{agent_memory, conversation_history}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub hash: String,
    /// SHA of the snapshot commit in the bare content-addressed repo.
    pub filesystem_ref: String,
    pub agent_memory: Value,
    pub conversation_history: Value,
    pub files_changed: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub compressed: bool,
    pub size_bytes: u64,
    pub label: Option<String>,
}

impl Checkpoint {
    /// The 12-char hash used as this checkpoint's identity.
    pub fn compute_hash(agent_memory: &Value, conversation_history: &Value) -> String {
        use sha2::{Digest, Sha256};

        let mut payload = Value::object();
        payload.insert("agent_memory", agent_memory.clone());
        payload.insert("conversation_history", conversation_history.clone());

        let mut hasher = Sha256::new();
        hasher.update(payload.canonical_json().as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 12)
    }
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut s = String::with_capacity(chars);
    for byte in bytes {
        if s.len() >= chars {
            break;
        }
        s.push_str(&format!("{byte:02x}"));
    }
    s.truncate(chars);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_twelve_hex_chars_and_deterministic() {
        let mem = Value::from("memory-a");
        let hist = Value::from("history-a");
        let h1 = Checkpoint::compute_hash(&mem, &hist);
        let h2 = Checkpoint::compute_hash(&mem, &hist);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 12);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_changes_with_content() {
        let mem = Value::from("memory-a");
        let h1 = Checkpoint::compute_hash(&mem, &Value::from("history-a"));
        let h2 = Checkpoint::compute_hash(&mem, &Value::from("history-b"));
        assert_ne!(h1, h2);
    }
}
