use std::path::Path;

use anyhow::{bail, Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::error::PredictError;
use crate::inference::extract::OutputSelector;
use crate::inference::features::FeatureVector;
use crate::inference::model::{Classifier, ModelInfo};

/// An ONNX Runtime session bound to one input and one probability output.
///
/// Input and output names are resolved once at load time, the model file is not expected to
/// change while the process runs.
pub struct OnnxClassifier {
    session: Session,
    selector: OutputSelector,
    info: ModelInfo,
}

impl OnnxClassifier {
    #[tracing::instrument(level = "info", skip(selector))]
    pub fn load(model_path: &Path, selector: OutputSelector, intra_threads: usize) -> Result<Self> {
        info!("Loading the model {}", model_path.display());
        if !model_path.is_file() {
            bail!("Model file {} does not exist", model_path.display());
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;

        let input = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => bail!("Model {} declares no inputs", model_path.display()),
        };
        let output = match session.outputs.get(selector.output_index) {
            Some(output) => output.name.clone(),
            None => bail!(
                "Model {} has {} outputs, probability output {} is out of range",
                model_path.display(),
                session.outputs.len(),
                selector.output_index
            ),
        };
        debug!(%input, %output, "Resolved model tensors");

        Ok(Self {
            session,
            selector,
            info: ModelInfo {
                path: model_path.display().to_string(),
                input,
                output,
            },
        })
    }
}

impl Classifier for OnnxClassifier {
    #[tracing::instrument(level = "debug", skip_all, fields(features = features.as_slice().len()))]
    fn predict(&self, features: &FeatureVector) -> Result<f32, PredictError> {
        let tensor = Tensor::from_array(features.to_batch()?)?;
        let outputs = self
            .session
            .run(ort::inputs![self.info.input.as_str() => tensor]?)?;

        let probabilities = outputs.get(self.info.output.as_str()).ok_or_else(|| {
            PredictError::Output(format!("output {} missing from results", self.info.output))
        })?;
        self.selector.extract(probabilities)
    }

    fn info(&self) -> &ModelInfo {
        &self.info
    }
}
