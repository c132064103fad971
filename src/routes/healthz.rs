use axum::{Router, routing::get};
use tracing::debug;

use crate::appstate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

pub async fn healthz() -> &'static str {
    debug!("healthz check");
    "OK"
}
