//! Reading model output as a hoax/valid label.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Hoax probability at or above which text is labelled a hoax.
pub const HOAX_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Hoax,
    Valid,
}

impl Label {
    /// Numeric result code: 1 for hoax, 0 for valid.
    pub fn result_code(self) -> u8 {
        match self {
            Label::Hoax => 1,
            Label::Valid => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Hoax => "hoax",
            Label::Valid => "valid",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Label::Hoax => "Hoax news! / NOT VALID",
            Label::Valid => "Factual news! / VALID",
        }
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpreted classifier output.
///
/// `hoax_score + valid_score == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    pub hoax_score: f64,
    pub valid_score: f64,
}

impl Verdict {
    /// Build a verdict from a hoax probability (clamped into `[0, 1]`).
    pub fn from_hoax_probability(p: f64) -> Self {
        let hoax = p.clamp(0.0, 1.0);
        let label = if hoax >= HOAX_THRESHOLD {
            Label::Hoax
        } else {
            Label::Valid
        };
        Self {
            label,
            hoax_score: hoax,
            valid_score: 1.0 - hoax,
        }
    }

    /// Read the first row of a model output.
    ///
    /// `[n, 1]` is a hoax probability; `[n, 2]` is (valid, hoax) and is
    /// normalized to sum to 1.
    pub fn from_output(output: ArrayView2<'_, f32>) -> Result<Self, ClassifierError> {
        if output.nrows() == 0 {
            return Err(ClassifierError::InvalidOutput("empty output".to_string()));
        }
        let row = output.row(0);
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::InvalidOutput("non-finite score".to_string()));
        }

        match row.len() {
            1 => Ok(Self::from_hoax_probability(row[0] as f64)),
            2 => {
                let (valid, hoax) = (row[0] as f64, row[1] as f64);
                if valid < 0.0 || hoax < 0.0 {
                    return Err(ClassifierError::InvalidOutput("negative score".to_string()));
                }
                let total = valid + hoax;
                if total == 0.0 {
                    return Err(ClassifierError::InvalidOutput("scores sum to zero".to_string()));
                }
                Ok(Self::from_hoax_probability(hoax / total))
            }
            n => Err(ClassifierError::InvalidOutput(format!(
                "expected 1 or 2 output columns, got {n}"
            ))),
        }
    }

    /// Confidence in the chosen label, as a percentage.
    pub fn confidence(&self) -> f64 {
        self.hoax_score.max(self.valid_score) * 100.0
    }

    pub fn description(&self) -> &'static str {
        self.label.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn single_column_is_a_hoax_probability() {
        let v = Verdict::from_output(array![[0.8f32]].view()).unwrap();
        assert_eq!(v.label, Label::Hoax);
        assert!((v.hoax_score - 0.8).abs() < 1e-6);
        assert!((v.valid_score - 0.2).abs() < 1e-6);
        assert!((v.confidence() - 80.0).abs() < 1e-4);
    }

    #[test]
    fn low_probability_is_valid_with_inverse_confidence() {
        let v = Verdict::from_output(array![[0.1f32]].view()).unwrap();
        assert_eq!(v.label, Label::Valid);
        assert_eq!(v.label.result_code(), 0);
        assert!((v.confidence() - 90.0).abs() < 1e-4);
        assert_eq!(v.description(), "Factual news! / VALID");
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(Verdict::from_hoax_probability(0.5).label, Label::Hoax);
        assert_eq!(Verdict::from_hoax_probability(0.4999).label, Label::Valid);
    }

    #[test]
    fn two_columns_are_valid_then_hoax() {
        let v = Verdict::from_output(array![[1.0f32, 3.0]].view()).unwrap();
        assert_eq!(v.label, Label::Hoax);
        assert!((v.hoax_score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let v = Verdict::from_hoax_probability(1.3);
        assert_eq!(v.hoax_score, 1.0);
        assert_eq!(v.valid_score, 0.0);
    }

    #[test]
    fn unreadable_outputs_are_rejected() {
        assert!(Verdict::from_output(array![[f32::NAN]].view()).is_err());
        assert!(Verdict::from_output(array![[0.0f32, 0.0]].view()).is_err());
        assert!(Verdict::from_output(array![[-1.0f32, 2.0]].view()).is_err());
        assert!(Verdict::from_output(array![[0.1f32, 0.2, 0.7]].view()).is_err());
        assert!(Verdict::from_output(Array2::<f32>::zeros((0, 1)).view()).is_err());
    }

    #[test]
    fn label_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Label::Hoax).unwrap(), "\"hoax\"");
    }
}
