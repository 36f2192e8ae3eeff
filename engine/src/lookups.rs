use crate::{config::Config, error::AppError, normalizer::NormalizedUrl, whois::WhoisClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::debug;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveError,
    TokioAsyncResolver,
};
use url::Url;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no domain to look up")]
    EmptyDomain,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("DNS resolution error: {0}")]
    Dns(#[from] ResolveError),

    #[error("WHOIS connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no WHOIS server known for .{0}")]
    NoWhoisServer(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("non-text response: {0}")]
    NonText(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Request-scoped snapshot of the three external signals. Every field is
/// best-effort: absence is an expected outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalLookupResult {
    pub dns_resolvable: bool,
    pub registration: Option<Registration>,
    pub page_body: Option<String>,
}

/// The external data sources consulted during extraction.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Whether `domain` resolves to at least one address.
    async fn resolve(&self, domain: &str) -> Result<bool, LookupError>;

    async fn whois(&self, domain: &str) -> Result<Option<Registration>, LookupError>;

    /// Body text of `url`.
    async fn fetch_page(&self, url: &str) -> Result<String, LookupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTimeouts {
    pub dns: Duration,
    pub whois: Duration,
    pub http: Duration,
}

impl Default for LookupTimeouts {
    fn default() -> Self {
        Self {
            dns: Duration::from_secs(3),
            whois: Duration::from_secs(5),
            http: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for LookupTimeouts {
    fn from(config: &Config) -> Self {
        Self {
            dns: config.dns_timeout(),
            whois: config.whois_timeout(),
            http: config.http_timeout(),
        }
    }
}

/// Run the DNS, WHOIS and HTTP lookups for `url` concurrently, each under its
/// own timeout. Never fails and never retries.
pub async fn gather(
    provider: &dyn LookupProvider,
    url: &NormalizedUrl,
    timeouts: &LookupTimeouts,
) -> ExternalLookupResult {
    let domain = url.registrable_domain.as_str();

    let (dns, registration, page) = tokio::join!(
        bounded("dns", timeouts.dns, async {
            if domain.is_empty() {
                return Err(LookupError::EmptyDomain);
            }
            provider.resolve(domain).await
        }),
        bounded("whois", timeouts.whois, async {
            if domain.is_empty() {
                return Err(LookupError::EmptyDomain);
            }
            provider.whois(domain).await
        }),
        bounded("http", timeouts.http, provider.fetch_page(&url.raw)),
    );

    ExternalLookupResult {
        dns_resolvable: dns.unwrap_or(false),
        registration: registration.flatten(),
        page_body: page,
    }
}

async fn bounded<T, F>(source: &'static str, limit: Duration, lookup: F) -> Option<T>
where
    F: Future<Output = Result<T, LookupError>>,
{
    let outcome = match tokio::time::timeout(limit, lookup).await {
        Ok(outcome) => outcome,
        Err(_) => Err(LookupError::Timeout(limit)),
    };

    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(source, error = %e, "external lookup unavailable");
            metrics::counter!("lookup_failures_total", "source" => source).increment(1);
            None
        }
    }
}

/// Live lookups over the network.
pub struct NetworkLookups {
    resolver: TokioAsyncResolver,
    http: reqwest::Client,
    whois: WhoisClient,
}

impl NetworkLookups {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.dns_timeout();
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            resolver,
            http,
            whois: WhoisClient::new(config.whois_server.clone()),
        })
    }
}

#[async_trait]
impl LookupProvider for NetworkLookups {
    async fn resolve(&self, domain: &str) -> Result<bool, LookupError> {
        let lookup = self.resolver.lookup_ip(domain).await?;
        Ok(lookup.iter().next().is_some())
    }

    async fn whois(&self, domain: &str) -> Result<Option<Registration>, LookupError> {
        self.whois.lookup(domain).await
    }

    async fn fetch_page(&self, raw: &str) -> Result<String, LookupError> {
        let url = Url::parse(raw).map_err(|e| LookupError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LookupError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let response = self.http.get(url).send().await?;

        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            let content_type = content_type
                .to_str()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !is_textual(&content_type) {
                return Err(LookupError::NonText(content_type));
            }
        }

        Ok(response.text().await?)
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || ["html", "xml", "json", "javascript"]
            .iter()
            .any(|kind| content_type.contains(kind))
}
