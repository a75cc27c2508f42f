use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{PredictError, ServiceError, ServiceResult};
use crate::inference::features::FeatureVector;

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct PredictResponse {
    /// Probability of the positive outcome
    pub prediction: f32,
}

/// Body is taken as raw bytes so that malformed JSON, as well as a body the extractor refuses,
/// follows the same error path as any other prediction failure.
#[axum_macros::debug_handler]
pub(crate) async fn handle_predict_request(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ServiceResult<(StatusCode, Json<PredictResponse>)> {
    let result = match body {
        Ok(body) => {
            let classifier = state.classifier.clone();
            tokio::task::spawn_blocking(move || -> Result<f32, PredictError> {
                let features = FeatureVector::from_body(&body)?;
                classifier.predict(&features)
            })
            .await
        }
        Err(rejection) => Ok(Err(PredictError::InvalidInput(rejection.body_text()))),
    };

    match result {
        Ok(Ok(prediction)) => {
            info!(monotonic_counter.predictions = 1u64, outcome = "ok");
            Ok((StatusCode::OK, Json(PredictResponse { prediction })))
        }
        Ok(Err(err)) => {
            info!(monotonic_counter.predictions = 1u64, outcome = "error");
            Err(ServiceError::from_prediction(err, state.error_policy))
        }
        Err(join_err) => {
            info!(monotonic_counter.predictions = 1u64, outcome = "error");
            Err(join_err.into())
        }
    }
}
