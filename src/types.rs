use serde::{Deserialize, Deserializer, Serialize};

pub const CHUNK_ID: &str = "chatcmpl-llm-router-openai";
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";
pub const SYSTEM_FINGERPRINT: &str = "fp-llm-router-openai";

#[derive(Debug, Deserialize)]
pub struct ChatReq {
    #[serde(default)]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: bool,
    /// Tool schemas, kept opaque; they are only re-rendered into the prompt.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "content_from_wire")]
    pub content: String,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub function: ToolCallFunction,
}

/// `arguments` is carried as raw text, never parsed at this layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ToolCallFunction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: &'static str,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    pub system_fingerprint: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Default, Serialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

#[derive(Debug, Serialize)]
pub struct ToolCallResponse {
    pub index: u32,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolCallFunction,
}

/// Error event sent in place of the normal terminator when the engine fails.
#[derive(Debug, Serialize)]
pub struct StreamError {
    pub error: StreamErrorBody,
}

#[derive(Debug, Serialize)]
pub struct StreamErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ChatCompletionChunk {
    fn with_choice(
        model: &str,
        created: i64,
        delta: ChunkDelta,
        finish_reason: Option<FinishReason>,
    ) -> Self {
        Self {
            id: CHUNK_ID,
            object: CHUNK_OBJECT,
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            system_fingerprint: SYSTEM_FINGERPRINT,
        }
    }

    pub fn content(model: &str, created: i64, text: &str) -> Self {
        let delta = ChunkDelta {
            role: Some("assistant"),
            content: Some(text.to_string()),
            ..Default::default()
        };
        Self::with_choice(model, created, delta, None)
    }

    pub fn tool_call(model: &str, created: i64, call: ToolCallResponse) -> Self {
        let delta = ChunkDelta {
            role: Some("assistant"),
            tool_calls: Some(vec![call]),
            ..Default::default()
        };
        Self::with_choice(model, created, delta, None)
    }

    pub fn finish(model: &str, created: i64, reason: FinishReason) -> Self {
        Self::with_choice(model, created, ChunkDelta::default(), Some(reason))
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

// Clients send either a plain string, null, or an array of typed parts.
fn content_from_wire<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<WireContent>::deserialize(d)? {
        None => String::new(),
        Some(WireContent::Text(s)) => s,
        Some(WireContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_missing_fields() {
        let req: ChatReq = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert!(!req.stream);
        assert!(req.tools.is_empty());
        assert_eq!(req.model, "");
        assert_eq!(req.messages[0].tool_call_id, None);
        assert_eq!(req.messages[0].tool_calls, None);
    }

    #[test]
    fn message_content_accepts_null_and_parts() {
        let req: ChatReq = serde_json::from_value(json!({
            "model": "m",
            "stream": true,
            "tools": null,
            "messages": [
                {"role": "assistant", "content": null, "tool_calls": [
                    {
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "Read", "arguments": "{}"}
                    }
                ]},
                {"role": "user", "content": [
                    {"type": "text", "text": "first"},
                    {"type": "image_url", "image_url": {"url": "x"}},
                    {"type": "text", "text": "second"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(req.messages[0].content, "");
        assert_eq!(req.messages[0].tool_calls.as_ref().unwrap()[0].function.name, "Read");
        assert_eq!(req.messages[1].content, "first\nsecond");
    }

    #[test]
    fn message_without_role_decodes_as_empty_role() {
        let req: ChatReq = serde_json::from_value(json!({
            "model": "m",
            "stream": true,
            "messages": [{"content": "hi"}]
        }))
        .unwrap();
        assert_eq!(req.messages[0].role, "");
        assert_eq!(req.messages[0].content, "hi");
    }

    #[test]
    fn content_chunk_shape() {
        let v = serde_json::to_value(ChatCompletionChunk::content("gpt", 42, "Hel")).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "chatcmpl-llm-router-openai",
                "object": "chat.completion.chunk",
                "created": 42,
                "model": "gpt",
                "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hel"}}],
                "system_fingerprint": "fp-llm-router-openai"
            })
        );
    }

    #[test]
    fn finish_chunk_has_empty_delta() {
        let chunk = ChatCompletionChunk::finish("gpt", 1, FinishReason::ToolCalls);
        let v = serde_json::to_value(chunk).unwrap();
        assert_eq!(v["choices"][0]["delta"], json!({}));
        assert_eq!(v["choices"][0]["finish_reason"], "tool_calls");
    }
}
