use crate::{
    error::AppError,
    types::{FeatureVector, Label},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the phishing class, when the model exposes one.
    pub probability: Option<f64>,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        let label = if probability >= 0.5 {
            Label::Phishing
        } else {
            Label::Legitimate
        };
        Self {
            label,
            probability: Some(probability),
        }
    }
}

/// A previously trained binary classifier over the sixteen URL features.
/// Implementations that work with named columns should read them through
/// [`FeatureVector::named`], which preserves the training order.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, AppError>;

    fn name(&self) -> &str {
        "classifier"
    }
}
