use crate::{
    config::Config,
    error::{classifier_unavailable, validation_error, AppError},
    features::{Extraction, FeatureExtractor},
    lookups::NetworkLookups,
    models::Classifier,
    student_model::StudentModel,
    types::{ColumnValue, ExtractResponse, PredictResponse},
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Feature extraction plus an optional classifier. Extraction keeps working
/// when no model could be loaded.
pub struct PhishingEngine {
    extractor: FeatureExtractor,
    classifier: Option<Arc<dyn Classifier>>,
}

impl PhishingEngine {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        info!("Initializing phishing engine...");

        let lookups = NetworkLookups::new(config)?;
        let extractor = FeatureExtractor::from_config(Arc::new(lookups), config);

        let classifier: Option<Arc<dyn Classifier>> = match StudentModel::load(&config.model_path) {
            Ok(model) => {
                info!("Loaded model {} from {}", model.version(), config.model_path);
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!("Prediction disabled: {}", e);
                None
            }
        };

        Ok(Self::with_parts(extractor, classifier))
    }

    pub fn with_parts(extractor: FeatureExtractor, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            extractor,
            classifier,
        }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractResponse, AppError> {
        if url.trim().is_empty() {
            return Err(validation_error("url must not be empty"));
        }

        let extraction = self.extractor.extract(url).await;
        Ok(Self::to_response(url, extraction))
    }

    pub async fn predict(&self, url: &str) -> Result<PredictResponse, AppError> {
        let classifier = self
            .classifier
            .clone()
            .ok_or_else(|| classifier_unavailable("no model loaded"))?;

        let extraction = self.extract(url).await?;
        let prediction = classifier.predict(&extraction.features)?;

        metrics::counter!("predictions_total", "label" => prediction.label.as_str()).increment(1);
        info!(
            url = %extraction.url,
            classifier = classifier.name(),
            "Classified as {}",
            prediction.label.as_str()
        );

        Ok(PredictResponse {
            extraction,
            label: prediction.label.as_u8(),
            phishing: prediction.label.as_u8() == 1,
            probability: prediction.probability,
        })
    }

    fn to_response(url: &str, extraction: Extraction) -> ExtractResponse {
        let features = extraction.features;
        ExtractResponse {
            request_id: Uuid::new_v4(),
            url: url.to_string(),
            domain: extraction.url.registrable_domain,
            columns: features
                .named()
                .into_iter()
                .map(|(name, value)| ColumnValue {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            suspicious: features
                .suspicious()
                .into_iter()
                .map(str::to_string)
                .collect(),
            features,
        }
    }
}
