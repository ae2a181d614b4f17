//! The scoring model seam and the shipped bag-of-words implementation.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::tokenizer::{OOV_ID, PAD_ID, Tokenizer};

/// An opaque, pretrained scoring function.
///
/// Input: `[batch, sequence_length]` token ids as `f32`.
/// Output: `[batch, 1]` hoax probability, or `[batch, 2]` (valid, hoax) scores.
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &str;

    fn sequence_length(&self) -> usize;

    fn forward(&self, input: ArrayView2<'_, f32>) -> Result<Array2<f32>, ClassifierError>;
}

/// On-disk model description (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub sequence_length: usize,
    pub vocabulary: HashMap<String, u32>,
    #[serde(default)]
    pub oov_buckets: u32,
    /// One weight per token id, indexed by id.
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let artifact: Self = serde_json::from_str(raw)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.sequence_length == 0 {
            return Err(ClassifierError::InvalidArtifact(
                "sequence_length must be greater than 0".to_string(),
            ));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ClassifierError::InvalidArtifact(
                "weights and bias must be finite".to_string(),
            ));
        }

        let required = self.tokenizer()?.id_space();
        if self.weights.len() < required {
            return Err(ClassifierError::InvalidArtifact(format!(
                "weights cover {} ids but the tokenizer emits up to {}",
                self.weights.len(),
                required
            )));
        }
        Ok(())
    }

    pub fn tokenizer(&self) -> Result<Tokenizer, ClassifierError> {
        Tokenizer::new(self.vocabulary.clone(), self.oov_buckets)
    }
}

/// Mean-of-embeddings logistic model over token ids.
///
/// logit = bias + mean(weights[id] for non-PAD ids); output = sigmoid(logit).
#[derive(Debug, Clone)]
pub struct BagOfWordsModel {
    name: String,
    sequence_length: usize,
    weights: Array1<f32>,
    bias: f32,
}

impl BagOfWordsModel {
    pub fn new(name: impl Into<String>, sequence_length: usize, weights: Vec<f32>, bias: f32) -> Self {
        Self {
            name: name.into(),
            sequence_length,
            weights: Array1::from(weights),
            bias,
        }
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self::new(
            artifact.name.clone(),
            artifact.sequence_length,
            artifact.weights.clone(),
            artifact.bias,
        )
    }

    fn weight(&self, id: usize) -> f32 {
        self.weights
            .get(id)
            .or_else(|| self.weights.get(OOV_ID as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

impl ScoringModel for BagOfWordsModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn forward(&self, input: ArrayView2<'_, f32>) -> Result<Array2<f32>, ClassifierError> {
        if input.ncols() != self.sequence_length {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.sequence_length,
                actual: input.ncols(),
            });
        }

        let mut output = Array2::<f32>::zeros((input.nrows(), 1));
        for (row_idx, row) in input.rows().into_iter().enumerate() {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for value in row.iter() {
                if !value.is_finite() || *value < 0.0 {
                    return Err(ClassifierError::InvalidInput(format!(
                        "token id {value} is not a valid index"
                    )));
                }
                let id = *value as usize;
                if id == PAD_ID as usize {
                    continue;
                }
                sum += self.weight(id);
                count += 1;
            }

            let mean = if count == 0 { 0.0 } else { sum / count as f32 };
            output[[row_idx, 0]] = sigmoid(self.bias + mean);
        }

        Ok(output)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
