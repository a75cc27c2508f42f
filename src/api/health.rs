use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::inference::model::ModelInfo;

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: ModelInfo,
}

/// The server only listens once the model is loaded, so answering at all means ready.
#[axum_macros::debug_handler]
pub(crate) async fn handle_health_request(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            model: state.classifier.info().clone(),
        }),
    )
}
