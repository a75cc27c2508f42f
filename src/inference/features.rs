use ndarray::Array2;
use serde_json::Value;

use crate::error::PredictError;

/// The ordered feature values of a single prediction instance.
///
/// Neither the length nor the value ranges are checked here, a mismatch with the model surfaces
/// as an inference failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn from_body(body: &[u8]) -> Result<Self, PredictError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| PredictError::InvalidInput(format!("malformed JSON body: {e}")))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, PredictError> {
        let Value::Array(items) = value else {
            return Err(PredictError::InvalidInput(format!(
                "expected a JSON array of numbers, got {}",
                kind(value)
            )));
        };
        if items.is_empty() {
            return Err(PredictError::InvalidInput("feature array is empty".into()));
        }

        let values = items
            .iter()
            .enumerate()
            .map(|(position, item)| to_f32(item).ok_or_else(|| {
                PredictError::InvalidInput(format!(
                    "feature {position} is not numeric, got {}",
                    kind(item)
                ))
            }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureVector(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Wraps the vector as the single row of a `1 x n` batch.
    pub fn to_batch(&self) -> Result<Array2<f32>, PredictError> {
        Array2::from_shape_vec((1, self.0.len()), self.0.clone())
            .map_err(|e| PredictError::InvalidInput(e.to_string()))
    }
}

// Booleans count as 0/1, numeric strings are parsed.
fn to_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(number) => number.as_f64().map(|n| n as f32),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f32>().ok(),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
