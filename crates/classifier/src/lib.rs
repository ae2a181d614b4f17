//! `factha-classifier`
//!
//! **Responsibility:** turn article text into a hoax/valid verdict.
//!
//! The path is: tokenize → fixed-length id sequence → opaque scoring model →
//! verdict. The model's internals are not this crate's concern; anything that
//! implements [`ScoringModel`] can be plugged in.
//!
//! This crate does not know about users, news or HTTP.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod sequence;
pub mod slot;
pub mod tokenizer;
pub mod verdict;

pub use error::ClassifierError;
pub use model::{BagOfWordsModel, ModelArtifact, ScoringModel};
pub use pipeline::Classifier;
pub use sequence::SequenceBuilder;
pub use slot::ModelSlot;
pub use tokenizer::{OOV_ID, PAD_ID, Tokenizer};
pub use verdict::{HOAX_THRESHOLD, Label, Verdict};
