use std::sync::Arc;

use crate::inference::ChatEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ChatEngine>,
}
