use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream broke: {0}")]
    Stream(#[source] reqwest::Error),

    #[error("undecodable upstream line: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Receives generated text as it arrives.
///
/// The engine awaits every call before reading further, so a slow sink slows
/// generation down instead of buffering without bound.
#[async_trait]
pub trait FragmentSink: Send {
    async fn on_fragment(&mut self, text: &str);
}

/// A chat engine that takes one flattened prompt and produces plain text.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Bind the engine to a session. Called once at startup.
    async fn init(&self, session_id: &str);

    /// Generate a completion for `prompt`, feeding each fragment to `sink` in
    /// order, and return the full text.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<String, EngineError>;
}
