use crate::appstate::AppState;
use crate::error::AppError;
use crate::prompt;
use crate::stream::StreamTranslator;
use crate::types::ChatReq;
use axum::{
    body::Body,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, Response, StatusCode, header},
};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

pub async fn completions_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatReq>, JsonRejection>,
) -> Result<Response<Body>, AppError> {
    let Json(req) = body.map_err(|e| {
        error!("invalid request: {}", e.body_text());
        AppError::BadRequest(e.body_text())
    })?;

    if !req.stream {
        error!("invalid request: stream=false");
        return Err(AppError::BadRequest("stream=false".to_string()));
    }

    let prompt = prompt::compose(&req);
    debug!(prompt = %prompt, "composed prompt");
    info!(
        model = %req.model,
        messages = req.messages.len(),
        tools = req.tools.len(),
        "chat completion"
    );

    // Capacity 1 keeps the engine at most one event ahead of the client.
    let (tx, rx) = mpsc::channel::<Bytes>(1);
    let translator = StreamTranslator::new(tx, req.model);
    let engine = state.engine.clone();
    tokio::spawn(async move {
        translator.run(engine.as_ref(), &prompt).await;
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, std::io::Error>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"))
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))
        .header(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("Content-Type"),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.into()))
}
