pub mod healthz;
pub mod v1;

use crate::appstate::AppState;
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use std::time::Instant;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(healthz::router())
        .nest("/v1", v1::router())
        .layer(middleware::from_fn(access_log))
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let resp = next.run(req).await;

    info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    resp
}
