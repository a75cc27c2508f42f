use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::error::ErrorPolicy;
use crate::inference::model::Classifier;

pub(crate) mod health;
pub(crate) mod predict;

/// Shared by every handler, the classifier is never mutated after startup.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) classifier: Arc<dyn Classifier>,
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) max_body_bytes: usize,
}

pub(crate) fn router(state: AppState) -> Router {
    let predict_route =
        post(predict::handle_predict_request).layer(DefaultBodyLimit::max(state.max_body_bytes));

    Router::new()
        .route("/predict", predict_route)
        .route("/health", get(health::handle_health_request))
        .with_state(state)
}
