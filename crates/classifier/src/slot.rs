//! Load-once holder for the process-wide classifier.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::ClassifierError;
use crate::pipeline::Classifier;

/// Holds the classifier loaded from `path`, loading it at most once.
///
/// A failed load leaves the slot empty, so the next [`ModelSlot::get`] retries.
/// Concurrent first callers block on a single load.
#[derive(Debug, Default)]
pub struct ModelSlot {
    path: Option<PathBuf>,
    cell: OnceCell<Arc<Classifier>>,
}

impl ModelSlot {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cell: OnceCell::new(),
        }
    }

    /// A slot that already holds a classifier (tests, embedded models).
    pub fn preloaded(classifier: Classifier) -> Self {
        Self {
            path: None,
            cell: OnceCell::with_value(Arc::new(classifier)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Classifier>, ClassifierError> {
        self.cell
            .get_or_try_init(|| {
                let path = self.path.as_ref().ok_or(ClassifierError::NotConfigured)?;
                let classifier = Classifier::load(path)?;
                tracing::info!(
                    model = classifier.model_name(),
                    path = %path.display(),
                    "classifier model loaded"
                );
                Ok(Arc::new(classifier))
            })
            .cloned()
    }
}
