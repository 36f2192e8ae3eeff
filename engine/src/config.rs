use crate::error::AppError;
use serde::Deserialize;
use std::{env, time::Duration};

const CONFIG_PATH_VAR: &str = "PHISHING_ENGINE_CONFIG";
const ENV_PREFIX: &str = "PHISHING_ENGINE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,
    #[serde(default = "default_whois_timeout_ms")]
    pub whois_timeout_ms: u64,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Query this WHOIS server instead of picking one per TLD.
    #[serde(default)]
    pub whois_server: Option<String>,
    #[serde(default = "default_age_threshold_days")]
    pub age_threshold_days: i64,
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> String {
    "model.json".to_string()
}

fn default_dns_timeout_ms() -> u64 {
    3000
}

fn default_whois_timeout_ms() -> u64 {
    5000
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    format!("phishing-engine/{}", env!("CARGO_PKG_VERSION"))
}

fn default_age_threshold_days() -> i64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            model_path: default_model_path(),
            dns_timeout_ms: default_dns_timeout_ms(),
            whois_timeout_ms: default_whois_timeout_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            user_agent: default_user_agent(),
            whois_server: None,
            age_threshold_days: default_age_threshold_days(),
        }
    }
}

impl Config {
    /// Defaults, then `phishing-engine.{toml,json,yaml}` if present, then
    /// `PHISHING_ENGINE_*` environment variables.
    pub fn load() -> Result<Self, AppError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "phishing-engine".to_string());
        Self::from_file(config::File::with_name(&path).required(false))
    }

    fn from_file<S>(file: S) -> Result<Self, AppError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.dns_timeout_ms == 0 || self.whois_timeout_ms == 0 || self.http_timeout_ms == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "lookup timeouts must be greater than zero".to_string(),
            )));
        }
        if self.age_threshold_days < 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "age_threshold_days must not be negative".to_string(),
            )));
        }
        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_millis(self.whois_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
