//! Fixed-length id sequences and the model input tensor.

use ndarray::Array2;

use crate::tokenizer::PAD_ID;

/// Truncates or post-pads id sequences to a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceBuilder {
    length: usize,
}

impl SequenceBuilder {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Keep the first `length` ids, fill the rest with [`PAD_ID`].
    pub fn fit(&self, ids: &[u32]) -> Vec<u32> {
        let mut fitted: Vec<u32> = ids.iter().copied().take(self.length).collect();
        fitted.resize(self.length, PAD_ID);
        fitted
    }

    /// Single-row `f32` tensor of shape `[1, length]`.
    pub fn tensor(&self, ids: &[u32]) -> Array2<f32> {
        let fitted = self.fit(ids);
        Array2::from_shape_fn((1, self.length), |(_, col)| fitted[col] as f32)
    }
}
