use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const FEATURE_COUNT: usize = 16;

/// Column names in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Have_IP",
    "Have_At",
    "URL_Length",
    "URL_Depth",
    "Redirection",
    "https_Domain",
    "TinyURL",
    "Prefix/Suffix",
    "DNS_Record",
    "Web_Traffic",
    "Domain_Age",
    "Domain_End",
    "iFrame",
    "Mouse_Over",
    "Right_Click",
    "Web_Forwards",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    HaveIp,
    HaveAt,
    UrlLength,
    UrlDepth,
    Redirection,
    HttpsDomain,
    TinyUrl,
    PrefixSuffix,
    DnsRecord,
    WebTraffic,
    DomainAge,
    DomainEnd,
    IFrame,
    MouseOver,
    RightClick,
    WebForwards,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::HaveIp,
        Feature::HaveAt,
        Feature::UrlLength,
        Feature::UrlDepth,
        Feature::Redirection,
        Feature::HttpsDomain,
        Feature::TinyUrl,
        Feature::PrefixSuffix,
        Feature::DnsRecord,
        Feature::WebTraffic,
        Feature::DomainAge,
        Feature::DomainEnd,
        Feature::IFrame,
        Feature::MouseOver,
        Feature::RightClick,
        Feature::WebForwards,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical column name.
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
    }

    /// Human readable label used in feature analysis output.
    pub fn label(self) -> &'static str {
        match self {
            Feature::HaveIp => "IP Address",
            Feature::HaveAt => "@ Symbol",
            Feature::UrlLength => "Long URL",
            Feature::UrlDepth => "Deep URL Path",
            Feature::Redirection => "Multiple Redirects",
            Feature::HttpsDomain => "HTTPS",
            Feature::TinyUrl => "URL Shortener",
            Feature::PrefixSuffix => "Domain with Hyphens",
            Feature::DnsRecord => "No DNS Record",
            Feature::WebTraffic => "Poor Web Traffic",
            Feature::DomainAge => "New Domain",
            Feature::DomainEnd => "Short Domain Expiration",
            Feature::IFrame => "iFrame",
            Feature::MouseOver => "Mouse Over Script",
            Feature::RightClick => "Disabled Right Click",
            Feature::WebForwards => "Multiple Forwards",
        }
    }

    /// Value used when the indicator cannot be computed.
    pub fn failure_value(self) -> u32 {
        match self {
            Feature::DomainEnd | Feature::MouseOver => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered indicator values. Every entry is 0 or 1 except `URL_Depth`,
/// which is a segment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([u32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [u32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// The vector produced when nothing at all could be computed.
    pub fn defaults() -> Self {
        Self(Feature::ALL.map(Feature::failure_value))
    }

    pub fn get(&self, feature: Feature) -> u32 {
        self.0[feature.index()]
    }

    pub fn values(&self) -> &[u32; FEATURE_COUNT] {
        &self.0
    }

    /// Values paired with their column names, in canonical order.
    pub fn named(&self) -> Vec<(&'static str, u32)> {
        Feature::ALL
            .iter()
            .map(|f| (f.name(), self.get(*f)))
            .collect()
    }

    /// Labels of every feature whose value is non-zero.
    pub fn suspicious(&self) -> Vec<&'static str> {
        Feature::ALL
            .iter()
            .filter(|f| self.get(**f) > 0)
            .map(|f| f.label())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Legitimate,
    Phishing,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Legitimate => 0,
            Label::Phishing => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Legitimate => "legitimate",
            Label::Phishing => "phishing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnValue {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub request_id: Uuid,
    pub url: String,
    pub domain: String,
    pub features: FeatureVector,
    pub columns: Vec<ColumnValue>,
    pub suspicious: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub extraction: ExtractResponse,
    pub label: u8,
    pub phishing: bool,
    pub probability: Option<f64>,
}
