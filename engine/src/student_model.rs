use crate::{
    error::{classifier_unavailable, AppError},
    models::{Classifier, Prediction},
    types::{Feature, FeatureVector},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// On-disk form of a logistic model: one weight per named column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentWeights {
    pub intercept: f64,
    pub weights: Vec<f64>,
    pub feature_order: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Logistic regression over the URL feature vector.
#[derive(Debug, Clone)]
pub struct StudentModel {
    intercept: f64,
    columns: Vec<(Feature, f64)>,
    version: String,
}

impl StudentModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            classifier_unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let weights: StudentWeights = serde_json::from_str(&data).map_err(|e| {
            classifier_unavailable(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let model = Self::from_weights(weights)?;
        debug!(
            "Loaded student model from {}: version {}, {} columns",
            path.display(),
            model.version,
            model.columns.len()
        );
        Ok(model)
    }

    pub fn from_weights(weights: StudentWeights) -> Result<Self, AppError> {
        if weights.weights.len() != weights.feature_order.len() {
            return Err(classifier_unavailable(format!(
                "{} weights for {} columns",
                weights.weights.len(),
                weights.feature_order.len()
            )));
        }

        let columns = weights
            .feature_order
            .iter()
            .zip(&weights.weights)
            .map(|(name, weight)| {
                Feature::from_name(name)
                    .map(|feature| (feature, *weight))
                    .ok_or_else(|| classifier_unavailable(format!("unknown column {}", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            intercept: weights.intercept,
            columns,
            version: weights.version.unwrap_or_else(|| "unversioned".to_string()),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn probability(&self, features: &FeatureVector) -> f64 {
        let z = self
            .columns
            .iter()
            .fold(self.intercept, |z, (feature, weight)| {
                z + weight * features.get(*feature) as f64
            });
        1.0 / (1.0 + (-z).exp())
    }
}

impl Classifier for StudentModel {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, AppError> {
        let probability = self.probability(features);
        if !probability.is_finite() {
            return Err(AppError::ModelInference(format!(
                "non-finite probability {}",
                probability
            )));
        }
        Ok(Prediction::from_probability(probability))
    }

    fn name(&self) -> &str {
        "student-logistic"
    }
}
