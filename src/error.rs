use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// Body returned for every request-time failure unless it is reported as a client error
pub(crate) const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

// Taken from https://github.com/tokio-rs/axum/blob/main/examples/anyhow-error-response/src/main.rs
#[derive(Debug)]
pub struct ServiceError {
    pub status: StatusCode,
    pub message: HttpErrorResponse,
}

#[derive(Debug, Serialize)]
pub struct HttpErrorResponse {
    error: String,
}

impl From<String> for HttpErrorResponse {
    fn from(message: String) -> Self {
        HttpErrorResponse { error: message }
    }
}

impl From<&str> for HttpErrorResponse {
    fn from(message: &str) -> Self {
        HttpErrorResponse {
            error: message.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut res = Json(self.message).into_response();
        *res.status_mut() = self.status;
        res
    }
}

/// Anything not explicitly classified is a server fault, its details stay in the logs.
impl<E> From<E> for ServiceError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        error!("Prediction API error: {:#}", err.into());
        ServiceError::internal()
    }
}

impl ServiceError {
    pub fn internal() -> Self {
        ServiceError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: HttpErrorResponse::from(GENERIC_ERROR_MESSAGE),
        }
    }

    /// Logs the failure with its original message and maps it onto the client facing response.
    pub fn from_prediction(err: PredictError, policy: ErrorPolicy) -> Self {
        error!("Prediction API error: {}", err);
        match (policy, err) {
            (ErrorPolicy::ReportInvalidInput, PredictError::InvalidInput(detail)) => ServiceError {
                status: StatusCode::BAD_REQUEST,
                message: HttpErrorResponse::from(format!("Invalid input: {detail}")),
            },
            _ => ServiceError::internal(),
        }
    }
}

pub type ServiceResult<T, E = ServiceError> = Result<T, E>;

/// Failures of a single prediction, from request body to extracted probability.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// The request body could not be turned into a feature vector
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    /// The model ran but its output does not have the expected layout
    #[error("unexpected model output: {0}")]
    Output(String),
}

/// How request-time failures are reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Every failure is a 500 with the same body
    #[default]
    Generic,
    /// Invalid input becomes a 400 carrying the reason, everything else stays generic
    ReportInvalidInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_generic_by_default() {
        let err = ServiceError::from_prediction(
            PredictError::InvalidInput("expected a JSON array".into()),
            ErrorPolicy::Generic,
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message.error, GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn invalid_input_can_be_reported_as_client_error() {
        let err = ServiceError::from_prediction(
            PredictError::InvalidInput("expected a JSON array".into()),
            ErrorPolicy::ReportInvalidInput,
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message.error, "Invalid input: expected a JSON array");
    }

    #[test]
    fn output_errors_are_never_client_errors() {
        let err = ServiceError::from_prediction(
            PredictError::Output("no column 1".into()),
            ErrorPolicy::ReportInvalidInput,
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message.error, GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn anyhow_errors_collapse_to_internal() {
        let err: ServiceError = anyhow::anyhow!("worker panicked").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message.error, GENERIC_ERROR_MESSAGE);
    }
}
