use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The text produced no tokens (empty or punctuation only).
    #[error("input text contains no words to classify")]
    EmptyInput,

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// The input tensor holds something that is not a token id.
    #[error("invalid model input: {0}")]
    InvalidInput(String),

    /// The model's input tensor did not match what it was built for.
    #[error("input shape mismatch: expected {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The model produced something the verdict step cannot read.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("no model is configured")]
    NotConfigured,
}
