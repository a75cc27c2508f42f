use serde::Serialize;

use crate::error::PredictError;
use crate::inference::features::FeatureVector;

/// Describes the loaded model artifact
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Path the model was loaded from
    pub path: String,

    /// Name of the input tensor the feature vector is bound to
    pub input: String,

    /// Name of the output the positive-class probability is read from
    pub output: String,
}

/// A loaded binary classifier answering with the probability of the positive class.
///
/// Implementations are immutable once constructed and are shared across request handlers.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f32, PredictError>;

    fn info(&self) -> &ModelInfo;
}
