use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::engine::{ChatEngine, EngineError, FragmentSink};

#[derive(Serialize)]
struct GenerateReq<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Engine reached over HTTP at `{base}/api/generate`, answering with
/// newline-delimited JSON objects.
pub struct HttpEngine {
    client: Client,
    base: String,
    session_id: RwLock<String>,
}

impl HttpEngine {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
            session_id: RwLock::new(String::new()),
        }
    }
}

#[async_trait]
impl ChatEngine for HttpEngine {
    async fn init(&self, session_id: &str) {
        *self.session_id.write().await = session_id.to_string();
        info!(has_session = !session_id.is_empty(), "upstream engine initialized");
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<String, EngineError> {
        let base = self.base.trim_end_matches('/');
        let url = format!("{}/api/generate", base);

        debug!("Forwarding prompt to URL: {}", url);

        let start = Instant::now();
        let mut request = self.client.post(&url).json(&GenerateReq {
            model,
            prompt,
            stream: true,
        });
        {
            let session_id = self.session_id.read().await;
            if !session_id.is_empty() {
                request = request.bearer_auth(session_id.as_str());
            }
        }

        let resp = request.send().await.map_err(EngineError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = LineDecoder {
            answer: String::new(),
            first_fragment: true,
            start,
        };
        let mut pending: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(EngineError::Stream)?;
            pending.extend_from_slice(&chunk);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if decoder.feed(&line, sink).await? {
                    return Ok(decoder.answer);
                }
            }
        }
        decoder.feed(&pending, sink).await?;
        Ok(decoder.answer)
    }
}

struct LineDecoder {
    answer: String,
    first_fragment: bool,
    start: Instant,
}

impl LineDecoder {
    /// Handle one line; returns true once the engine reports it is done.
    async fn feed(
        &mut self,
        line: &[u8],
        sink: &mut dyn FragmentSink,
    ) -> Result<bool, EngineError> {
        if line.trim_ascii().is_empty() {
            return Ok(false);
        }
        let line: GenerateLine = serde_json::from_slice(line)?;
        if let Some(err) = line.error {
            return Err(EngineError::Upstream(err));
        }
        if !line.response.is_empty() {
            if self.first_fragment {
                self.first_fragment = false;
                info!(
                    ttft_ms = self.start.elapsed().as_millis() as u64,
                    first_fragment_bytes = line.response.len(),
                    "ttft"
                );
            }
            self.answer.push_str(&line.response);
            sink.on_fragment(&line.response).await;
        }
        Ok(line.done)
    }
}
