//! URL phishing indicators: sixteen features per URL, computed from the URL
//! text and a handful of DNS, WHOIS and HTTP lookups, plus an optional
//! classifier that scores the resulting vector.

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod lookups;
pub mod models;
pub mod normalizer;
pub mod routes;
pub mod student_model;
pub mod types;
pub mod whois;

pub use config::Config;
pub use engine::PhishingEngine;
pub use error::AppError;
pub use features::{assemble, FeatureExtractor, IndicatorInput};
pub use lookups::{ExternalLookupResult, LookupProvider, NetworkLookups};
pub use normalizer::NormalizedUrl;
pub use types::{Feature, FeatureVector, Label, FEATURE_COUNT, FEATURE_NAMES};

use std::sync::Arc;
use tracing::warn;

/// Extract the feature vector for `url` with default settings and live
/// network lookups. Never fails: lookups that cannot run leave their
/// features at the failure value.
pub async fn extract_features(url: &str) -> FeatureVector {
    let config = Config::default();
    match NetworkLookups::new(&config) {
        Ok(lookups) => {
            FeatureExtractor::from_config(Arc::new(lookups), &config)
                .extract(url)
                .await
                .features
        }
        Err(e) => {
            warn!("Network lookups unavailable, using lexical features only: {}", e);
            let normalized = NormalizedUrl::parse(url);
            let lookups = ExternalLookupResult::default();
            assemble(&IndicatorInput::new(&normalized, &lookups, chrono::Utc::now()))
        }
    }
}
