//! Turns one engine completion into the OpenAI chunk stream.
//!
//! Fragments are forwarded as content deltas the moment they arrive. Once the
//! engine is finished the accumulated answer is scanned for tool-use spans and
//! the stream closes with either a `stop` chunk or one tool-call chunk per span
//! followed by a `tool_calls` chunk.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::inference::{ChatEngine, FragmentSink};
use crate::sse;
use crate::tooluse::{self, ToolUse};
use crate::types::{
    ChatCompletionChunk, FinishReason, StreamError, StreamErrorBody, ToolCallFunction,
    ToolCallResponse,
};

pub struct StreamTranslator {
    tx: mpsc::Sender<Bytes>,
    model: String,
    created: i64,
    answer: String,
    disconnected: bool,
}

impl StreamTranslator {
    pub fn new(tx: mpsc::Sender<Bytes>, model: String) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self {
            tx,
            model,
            created,
            answer: String::new(),
            disconnected: false,
        }
    }

    /// Drive the engine and write the whole response. An empty prompt skips
    /// the engine and ends the stream straight away.
    pub async fn run(mut self, engine: &dyn ChatEngine, prompt: &str) {
        if !prompt.is_empty() {
            let model = self.model.clone();
            if let Err(e) = engine.complete(&model, prompt, &mut self).await {
                error!(model = %model, error = %e, "upstream completion failed");
                let event = StreamError {
                    error: StreamErrorBody {
                        message: e.to_string(),
                        kind: "upstream_error",
                    },
                };
                self.send_json(&event).await;
                self.send(Bytes::from_static(sse::DONE.as_bytes())).await;
                return;
            }
        }
        debug!(answer = %self.answer, "upstream answer");

        let tool_uses = tooluse::extract(&self.answer);
        info!(tool_calls = tool_uses.len(), "completion finished");

        let reason = if tool_uses.is_empty() {
            FinishReason::Stop
        } else {
            for tool_use in tool_uses {
                let call = tool_call(tool_use);
                let chunk = ChatCompletionChunk::tool_call(&self.model, self.created, call);
                self.send_json(&chunk).await;
            }
            FinishReason::ToolCalls
        };
        let end = ChatCompletionChunk::finish(&self.model, self.created, reason);
        self.send_json(&end).await;
        self.send(Bytes::from_static(sse::DONE.as_bytes())).await;
    }

    async fn send_json<T: Serialize>(&mut self, value: &T) {
        match sse::frame(value) {
            Ok(bytes) => self.send(bytes).await,
            Err(e) => error!(error = %e, "failed to encode event"),
        }
    }

    async fn send(&mut self, bytes: Bytes) {
        if self.disconnected {
            return;
        }
        if self.tx.send(bytes).await.is_err() {
            warn!(model = %self.model, "client disconnected, dropping the rest of the stream");
            self.disconnected = true;
        }
    }
}

#[async_trait]
impl FragmentSink for StreamTranslator {
    async fn on_fragment(&mut self, text: &str) {
        self.answer.push_str(text);
        let chunk = ChatCompletionChunk::content(&self.model, self.created, text);
        self.send_json(&chunk).await;
    }
}

fn tool_call(tool_use: ToolUse) -> ToolCallResponse {
    if serde_json::from_str::<serde::de::IgnoredAny>(&tool_use.arguments).is_err() {
        warn!(tool = %tool_use.name, "tool arguments are not valid JSON, passing through");
    }
    ToolCallResponse {
        index: 0,
        id: tooluse::new_call_id(),
        kind: "function",
        function: ToolCallFunction {
            name: tool_use.name,
            arguments: tool_use.arguments,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::ScriptedEngine;
    use serde_json::Value;
    use std::sync::atomic::Ordering;

    async fn run_collect(engine: &ScriptedEngine, prompt: &str) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(1);
        let translator = StreamTranslator::new(tx, "m".to_string());
        let collector = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(bytes) = rx.recv().await {
                events.push(String::from_utf8(bytes.to_vec()).unwrap());
            }
            events
        });
        translator.run(engine, prompt).await;
        collector.await.unwrap()
    }

    fn json_of(event: &str) -> Value {
        let payload = event.strip_prefix("data: ").unwrap().strip_suffix("\n\n").unwrap();
        serde_json::from_str(payload).unwrap()
    }

    #[tokio::test]
    async fn content_then_stop() {
        let engine = ScriptedEngine::replying(vec!["Hel", "lo"]);
        let events = run_collect(&engine, "<user>\n  hi\n</user>\n").await;

        assert_eq!(events.len(), 4);
        assert_eq!(json_of(&events[0])["choices"][0]["delta"]["content"], "Hel");
        assert_eq!(json_of(&events[1])["choices"][0]["delta"]["content"], "lo");
        let end = json_of(&events[2]);
        assert_eq!(end["choices"][0]["finish_reason"], "stop");
        assert_eq!(events[3], "data: [DONE]\n\n");

        let created = json_of(&events[0])["created"].clone();
        assert_eq!(json_of(&events[1])["created"], created);
        assert_eq!(end["created"], created);
    }

    #[tokio::test]
    async fn empty_prompt_skips_engine() {
        let engine = ScriptedEngine::replying(vec!["never"]);
        let events = run_collect(&engine, "").await;

        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.len(), 2);
        assert_eq!(json_of(&events[0])["choices"][0]["finish_reason"], "stop");
        assert_eq!(events[1], sse::DONE);
    }

    #[tokio::test]
    async fn each_span_becomes_a_tool_call_chunk() {
        let engine = ScriptedEngine::replying(vec![
            "Reading both.\n<use tool=\"Read\">{\"path\":\"a\"}</use>",
            "\n<use tool=\"Read\">\n{\"path\":\"b\"}\n</use>",
        ]);
        let events = run_collect(&engine, "p").await;

        assert_eq!(events.len(), 6);
        let first = json_of(&events[2]);
        let second = json_of(&events[3]);
        for (chunk, args) in [(&first, "{\"path\":\"a\"}"), (&second, "{\"path\":\"b\"}")] {
            let call = &chunk["choices"][0]["delta"]["tool_calls"][0];
            assert_eq!(call["index"], 0);
            assert_eq!(call["type"], "function");
            assert_eq!(call["function"]["name"], "Read");
            assert_eq!(call["function"]["arguments"], args);
            assert!(chunk["choices"][0].get("finish_reason").is_none());
        }
        assert_ne!(
            first["choices"][0]["delta"]["tool_calls"][0]["id"],
            second["choices"][0]["delta"]["tool_calls"][0]["id"]
        );
        assert_eq!(json_of(&events[4])["choices"][0]["finish_reason"], "tool_calls");
        assert_eq!(events[5], sse::DONE);
    }

    #[tokio::test]
    async fn engine_failure_ends_with_error_event() {
        let engine = ScriptedEngine::failing(vec!["partial <use tool=\"A\">{}</use>"], "boom");
        let events = run_collect(&engine, "p").await;

        assert_eq!(events.len(), 3);
        assert!(json_of(&events[0])["choices"][0]["delta"]["content"].is_string());
        let err = json_of(&events[1]);
        assert_eq!(err["error"]["type"], "upstream_error");
        assert_eq!(err["error"]["message"], "upstream error: boom");
        assert_eq!(events[2], sse::DONE);
    }

    #[tokio::test]
    async fn disconnected_client_does_not_stop_engine() {
        let engine = ScriptedEngine::replying(vec!["a", "b", "c"]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        StreamTranslator::new(tx, "m".to_string()).run(&engine, "p").await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }
}
