use std::collections::HashMap;

use ndarray::{ArrayViewD, Ix2};
use ort::memory::Allocator;
use ort::value::{DynMapValueType, DynValue};

use crate::error::PredictError;

/// Where the positive-class probability lives in the model outputs.
///
/// Classifier converters usually emit `[label, probabilities]`, so the default reads row 0 of the
/// second output at the column of class `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSelector {
    pub output_index: usize,
    pub positive_class: usize,
}

impl Default for OutputSelector {
    fn default() -> Self {
        Self {
            output_index: 1,
            positive_class: 1,
        }
    }
}

impl OutputSelector {
    /// Reads the probability from either a `[batch, classes]` tensor or a sequence of
    /// `class -> probability` maps.
    pub fn extract(&self, value: &DynValue) -> Result<f32, PredictError> {
        match value.try_extract_tensor::<f32>() {
            Ok(tensor) => self.select_in_tensor(tensor),
            Err(tensor_err) => {
                let maps = value
                    .try_extract_sequence::<DynMapValueType>(&Allocator::default())
                    .map_err(|_| PredictError::Inference(tensor_err))?;
                let first = maps.first().ok_or_else(|| {
                    PredictError::Output("probability sequence is empty".into())
                })?;
                self.select_in_map(&first.try_extract_map::<i64, f32>()?)
            }
        }
    }

    pub fn select_in_tensor(&self, tensor: ArrayViewD<'_, f32>) -> Result<f32, PredictError> {
        let shape = tensor.shape().to_vec();
        let tensor = tensor.into_dimensionality::<Ix2>().map_err(|_| {
            PredictError::Output(format!(
                "expected a [batch, classes] tensor, got shape {shape:?}"
            ))
        })?;
        let (rows, classes) = tensor.dim();
        if rows == 0 {
            return Err(PredictError::Output("probability tensor has no rows".into()));
        }
        tensor
            .get((0, self.positive_class))
            .copied()
            .ok_or_else(|| {
                PredictError::Output(format!(
                    "class {} out of range for {classes} classes",
                    self.positive_class
                ))
            })
    }

    pub fn select_in_map(&self, probabilities: &HashMap<i64, f32>) -> Result<f32, PredictError> {
        i64::try_from(self.positive_class)
            .ok()
            .and_then(|class| probabilities.get(&class))
            .copied()
            .ok_or_else(|| {
                PredictError::Output(format!(
                    "class {} missing from probability map",
                    self.positive_class
                ))
            })
    }
}
