//! Synthetic provider payloads shaped the way a real framework adapter
//! would see them, for exercising fingerprinting and comparator scoring
//! without a live LLM call.

use agentgit_types::Value;

/// An OpenAI-shaped `invocation_params` document with the given tool
/// names attached under `tools[].function.name`.
pub fn openai_invocation_params(model: &str, tool_names: &[&str]) -> Value {
    let mut params = Value::object();
    params.insert("model", Value::from(model));

    if !tool_names.is_empty() {
        let tools: Vec<Value> = tool_names
            .iter()
            .map(|name| {
                let mut function = Value::object();
                function.insert("name", Value::from(*name));
                let mut tool = Value::object();
                tool.insert("function", function);
                tool
            })
            .collect();
        params.insert("tools", Value::Array(tools));
    }

    params
}

/// An Anthropic-shaped `invocation_params` document: top-level `tools`
/// entries carry `name` directly instead of nesting under `function`.
pub fn anthropic_invocation_params(model: &str, tool_names: &[&str]) -> Value {
    let mut params = Value::object();
    params.insert("model", Value::from(model));

    if !tool_names.is_empty() {
        let tools: Vec<Value> = tool_names
            .iter()
            .map(|name| {
                let mut tool = Value::object();
                tool.insert("name", Value::from(*name));
                tool
            })
            .collect();
        params.insert("tools", Value::Array(tools));
    }

    params
}

/// A chat-completion-shaped response body with a single assistant
/// message of `content`.
pub fn chat_response(content: &str) -> Value {
    let mut message = Value::object();
    message.insert("role", Value::from("assistant"));
    message.insert("content", Value::from(content));

    let mut choice = Value::object();
    choice.insert("message", message);

    let mut response = Value::object();
    response.insert("choices", Value::Array(vec![choice]));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_params_nest_tool_names_under_function() {
        let params = openai_invocation_params("gpt-4", &["search"]);
        let tools = params.get("tools").and_then(Value::as_array).unwrap();
        let name = tools[0].get("function").and_then(|f| f.get("name")).and_then(Value::as_str);
        assert_eq!(name, Some("search"));
    }

    #[test]
    fn anthropic_params_put_tool_names_at_top_level() {
        let params = anthropic_invocation_params("claude-3", &["search"]);
        let tools = params.get("tools").and_then(Value::as_array).unwrap();
        assert_eq!(tools[0].get("name").and_then(Value::as_str), Some("search"));
    }
}
