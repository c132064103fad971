use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::engine::{ChatEngine, EngineError, FragmentSink};

#[derive(Default)]
pub struct CollectSink {
    pub fragments: Vec<String>,
}

#[async_trait]
impl FragmentSink for CollectSink {
    async fn on_fragment(&mut self, text: &str) {
        self.fragments.push(text.to_string());
    }
}

/// Replays fixed fragments, then succeeds or fails with `error`.
#[derive(Default)]
pub struct ScriptedEngine {
    pub fragments: Vec<&'static str>,
    pub error: Option<&'static str>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn replying(fragments: Vec<&'static str>) -> Self {
        Self {
            fragments,
            ..Default::default()
        }
    }

    pub fn failing(fragments: Vec<&'static str>, error: &'static str) -> Self {
        Self {
            fragments,
            error: Some(error),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChatEngine for ScriptedEngine {
    async fn init(&self, _session_id: &str) {}

    async fn complete(
        &self,
        _model: &str,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        for fragment in &self.fragments {
            sink.on_fragment(fragment).await;
        }
        match self.error {
            Some(err) => Err(EngineError::Upstream(err.to_string())),
            None => Ok(self.fragments.concat()),
        }
    }
}
