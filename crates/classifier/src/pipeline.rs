//! Text in, verdict out: tokenizer, sequence builder and scoring model together.

use std::path::Path;
use std::sync::Arc;

use crate::error::ClassifierError;
use crate::model::{BagOfWordsModel, ModelArtifact, ScoringModel};
use crate::sequence::SequenceBuilder;
use crate::tokenizer::Tokenizer;
use crate::verdict::Verdict;

/// Tokenizer + sequence builder + scoring model, wired for single-text prediction.
#[derive(Clone)]
pub struct Classifier {
    tokenizer: Tokenizer,
    sequences: SequenceBuilder,
    model: Arc<dyn ScoringModel>,
}

impl Classifier {
    pub fn new(tokenizer: Tokenizer, model: Arc<dyn ScoringModel>) -> Self {
        let sequences = SequenceBuilder::new(model.sequence_length());
        Self {
            tokenizer,
            sequences,
            model,
        }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        artifact.validate()?;
        let tokenizer = artifact.tokenizer()?;
        let model = BagOfWordsModel::from_artifact(&artifact);
        Ok(Self::new(tokenizer, Arc::new(model)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        Self::from_artifact(ModelArtifact::load(path)?)
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn predict(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let ids = self.tokenizer.encode(text);
        if ids.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let input = self.sequences.tensor(&ids);
        let output = self.model.forward(input.view())?;
        let verdict = Verdict::from_output(output.view())?;

        tracing::debug!(
            model = self.model.name(),
            tokens = ids.len(),
            truncated = ids.len() > self.sequences.length(),
            label = %verdict.label,
            hoax_score = verdict.hoax_score,
            "classified text"
        );

        Ok(verdict)
    }
}

impl core::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Classifier")
            .field("model", &self.model.name())
            .field("sequence_length", &self.sequences.length())
            .field("vocabulary", &self.tokenizer.vocabulary_len())
            .finish()
    }
}
