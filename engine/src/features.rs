use crate::{
    config::Config,
    lookups::{gather, ExternalLookupResult, LookupProvider, LookupTimeouts},
    normalizer::NormalizedUrl,
    types::{Feature, FeatureVector},
};
use chrono::{DateTime, Utc};
use std::{net::IpAddr, sync::Arc, time::Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Known URL shortening services, matched as plain substrings of the raw URL.
pub const SHORTENING_SERVICES: [&str; 9] = [
    "bit.ly",
    "goo.gl",
    "tinyurl.com",
    "t.co",
    "ow.ly",
    "is.gd",
    "cli.gs",
    "yfrog.com",
    "migre.me",
];

pub const URL_LENGTH_THRESHOLD: usize = 54;
pub const DEFAULT_AGE_THRESHOLD_DAYS: i64 = 180;

const CONTEXT_MENU_HANDLER: &str = "oncontextmenu";

/// An indicator could not be computed; the feature takes its failure value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{0} unavailable")]
pub struct Absent(pub &'static str);

/// Everything an indicator may look at.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorInput<'a> {
    pub url: &'a NormalizedUrl,
    pub lookups: &'a ExternalLookupResult,
    pub now: DateTime<Utc>,
    pub age_threshold_days: i64,
}

impl<'a> IndicatorInput<'a> {
    pub fn new(url: &'a NormalizedUrl, lookups: &'a ExternalLookupResult, now: DateTime<Utc>) -> Self {
        Self {
            url,
            lookups,
            now,
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
        }
    }

    fn host(&self) -> Result<&'a str, Absent> {
        let host = self.url.host();
        if host.is_empty() {
            Err(Absent("host"))
        } else {
            Ok(host)
        }
    }
}

pub fn indicator(feature: Feature, input: &IndicatorInput<'_>) -> Result<u32, Absent> {
    match feature {
        Feature::HaveIp => have_ip(input),
        Feature::HaveAt => Ok(have_at(input)),
        Feature::UrlLength => Ok(url_length(input)),
        Feature::UrlDepth => Ok(url_depth(input)),
        Feature::Redirection => Ok(redirection(input)),
        Feature::HttpsDomain => Ok(https_domain(input)),
        Feature::TinyUrl => Ok(tiny_url(input)),
        Feature::PrefixSuffix => prefix_suffix(input),
        Feature::DnsRecord => dns_record(input),
        Feature::WebTraffic => Ok(web_traffic(input)),
        Feature::DomainAge => Ok(domain_age(input)),
        Feature::DomainEnd => Ok(domain_end(input)),
        Feature::IFrame => Ok(0),
        Feature::MouseOver => Ok(1),
        Feature::RightClick => Ok(right_click(input)),
        Feature::WebForwards => Ok(0),
    }
}

/// Compute all sixteen indicators in canonical order. A failed indicator
/// never affects the others.
pub fn assemble(input: &IndicatorInput<'_>) -> FeatureVector {
    FeatureVector::new(Feature::ALL.map(|feature| {
        indicator(feature, input).unwrap_or_else(|absent| {
            trace!(%feature, %absent, "using failure value");
            feature.failure_value()
        })
    }))
}

fn flag(value: bool) -> u32 {
    u32::from(value)
}

fn have_ip(input: &IndicatorInput<'_>) -> Result<u32, Absent> {
    Ok(flag(input.host()?.parse::<IpAddr>().is_ok()))
}

fn have_at(input: &IndicatorInput<'_>) -> u32 {
    flag(input.url.raw.contains('@'))
}

fn url_length(input: &IndicatorInput<'_>) -> u32 {
    flag(input.url.raw.chars().count() > URL_LENGTH_THRESHOLD)
}

fn url_depth(input: &IndicatorInput<'_>) -> u32 {
    input.url.path_segments().count() as u32
}

fn redirection(input: &IndicatorInput<'_>) -> u32 {
    flag(input.url.raw.matches("//").count() > 1)
}

fn https_domain(input: &IndicatorInput<'_>) -> u32 {
    flag(input.url.scheme == "https")
}

fn tiny_url(input: &IndicatorInput<'_>) -> u32 {
    flag(SHORTENING_SERVICES
        .iter()
        .any(|service| input.url.raw.contains(service)))
}

fn prefix_suffix(input: &IndicatorInput<'_>) -> Result<u32, Absent> {
    Ok(flag(input.host()?.contains('-')))
}

fn dns_record(input: &IndicatorInput<'_>) -> Result<u32, Absent> {
    if input.url.registrable_domain.is_empty() {
        return Err(Absent("registrable domain"));
    }
    Ok(flag(input.lookups.dns_resolvable))
}

fn web_traffic(input: &IndicatorInput<'_>) -> u32 {
    let has_creation = input
        .lookups
        .registration
        .map_or(false, |r| r.creation_date.is_some());
    flag(!has_creation)
}

fn domain_age(input: &IndicatorInput<'_>) -> u32 {
    match input.lookups.registration.and_then(|r| r.creation_date) {
        Some(created) => flag((input.now - created).num_days() > input.age_threshold_days),
        None => 0,
    }
}

fn domain_end(input: &IndicatorInput<'_>) -> u32 {
    match input.lookups.registration.and_then(|r| r.expiration_date) {
        Some(expires) => flag((expires - input.now).num_days() > input.age_threshold_days),
        None => 1,
    }
}

fn right_click(input: &IndicatorInput<'_>) -> u32 {
    input.lookups.page_body.as_deref().map_or(0, |body| {
        flag(body.to_lowercase().contains(CONTEXT_MENU_HANDLER))
    })
}

/// Result of one extraction call.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub url: NormalizedUrl,
    pub lookups: ExternalLookupResult,
    pub features: FeatureVector,
}

/// Turns URL strings into feature vectors using an injected lookup provider.
#[derive(Clone)]
pub struct FeatureExtractor {
    provider: Arc<dyn LookupProvider>,
    timeouts: LookupTimeouts,
    age_threshold_days: i64,
}

impl FeatureExtractor {
    pub fn new(provider: Arc<dyn LookupProvider>, timeouts: LookupTimeouts) -> Self {
        Self {
            provider,
            timeouts,
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
        }
    }

    pub fn from_config(provider: Arc<dyn LookupProvider>, config: &Config) -> Self {
        Self {
            provider,
            timeouts: LookupTimeouts::from(config),
            age_threshold_days: config.age_threshold_days,
        }
    }

    pub async fn extract(&self, url: &str) -> Extraction {
        self.extract_at(url, Utc::now()).await
    }

    /// Like [`extract`](Self::extract) with an explicit notion of "now".
    pub async fn extract_at(&self, url: &str, now: DateTime<Utc>) -> Extraction {
        let started = Instant::now();

        let normalized = NormalizedUrl::parse(url);
        let lookups = gather(self.provider.as_ref(), &normalized, &self.timeouts).await;

        let input = IndicatorInput {
            url: &normalized,
            lookups: &lookups,
            now,
            age_threshold_days: self.age_threshold_days,
        };
        let features = assemble(&input);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("extractions_total").increment(1);
        metrics::histogram!("extraction_duration_ms").record(elapsed_ms);
        debug!(
            domain = %normalized.registrable_domain,
            features = ?features.values(),
            "extracted features in {:.1}ms",
            elapsed_ms
        );

        Extraction {
            url: normalized,
            lookups,
            features,
        }
    }
}
