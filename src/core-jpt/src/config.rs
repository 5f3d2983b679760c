//! Pipeline settings read from the environment.

use std::sync::Arc;
use std::time::Duration;

use common_jpt::{parse_flag, split_list};
use data_model_jpt::models::{NewSource, SourcePayload, UNNAMED_SOURCE};

use crate::Error;
use crate::fetch::{BrowserFetchConfig, ChromeFetcher, FetchRouter, HttpFetchConfig, HttpFetcher};
use crate::llms::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::llms::{KeyRotatingProvider, LlmError, OpenAiChat};
use crate::verify::InconclusivePolicy;

pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_EMAIL_SENDER: &str = "Job Tracker <onboarding@resend.dev>";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No LLM API keys configured: set LLM_API_KEYS (comma separated) or LLM_API_KEY, or their GEMINI_* equivalents")]
    MissingApiKeys,

    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("JOB_SOURCES is not a valid JSON list of sources: {0}")]
    InvalidSources(#[from] serde_json::Error),

    #[error("EXISTENCE_CHECK_POLICY: {0}")]
    InvalidPolicy(String),
}

/// Where and how new-job emails are delivered. Resend is used when its key is present, SMTP otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub sender: String,
    pub recipient: Option<String>,
    pub smtp: SmtpConfig,
}

/// STARTTLS relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    /// Login name; the sender's address when unset.
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ordered: the first key is tried first.
    pub llm_api_keys: Vec<String>,
    pub llm_model: String,
    pub llm_api_base: String,
    /// Sources to insert at start-up (existing URLs are left alone).
    pub seed_sources: Vec<NewSource>,
    pub browser_fallback: bool,
    pub http: HttpFetchConfig,
    pub browser: BrowserFetchConfig,
    pub fetch_concurrency: usize,
    pub check_interval_minutes: u64,
    pub scheduler_enabled: bool,
    pub existence_check_policy: InconclusivePolicy,
    pub email: EmailConfig,
}

impl AppConfig {
    /// Reads the process environment (after `.env`, when the binary loaded one).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |name: &str, default: bool| get(name).map(|v| parse_flag(&v)).unwrap_or(default);

        // The GEMINI_* names are the older spelling of the same settings.
        let llm_api_keys = ["LLM_API_KEYS", "LLM_API_KEY", "GEMINI_API_KEYS", "GEMINI_API_KEY"]
            .into_iter()
            .map(|var| get(var).map(|v| split_list(&v)).unwrap_or_default())
            .find(|keys| !keys.is_empty())
            .ok_or(ConfigError::MissingApiKeys)?;

        let default_use_browser = flag("DEFAULT_USE_BROWSER", true);
        let seed_sources = match get("JOB_SOURCES") {
            Some(json) => parse_job_sources(&json, default_use_browser)?,
            None => get("JOB_URLS")
                .map(|v| split_list(&v))
                .unwrap_or_default()
                .into_iter()
                .map(|url| seed_source(SourcePayload {
                    url,
                    name: None,
                    requires_browser: Some(default_use_browser),
                }))
                .collect(),
        };

        let defaults = HttpFetchConfig::default();
        let http = HttpFetchConfig {
            timeout: Duration::from_secs(number(&get, "FETCH_TIMEOUT_S", defaults.timeout.as_secs())?),
            max_retries: number(&get, "FETCH_MAX_RETRIES", u64::from(defaults.max_retries))?
                .try_into()
                .map_err(|_| invalid_number(&get, "FETCH_MAX_RETRIES"))?,
            delay: Duration::from_millis(number(&get, "FETCH_RETRY_DELAY_MS", defaults.delay.as_millis() as u64)?),
        };
        let browser = BrowserFetchConfig {
            page_load_timeout: http.timeout,
            ..BrowserFetchConfig::default()
        };

        let existence_check_policy = match get("EXISTENCE_CHECK_POLICY") {
            Some(v) => v.parse().map_err(ConfigError::InvalidPolicy)?,
            None => InconclusivePolicy::default(),
        };

        Ok(Self {
            llm_api_keys,
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_api_base: get("LLM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            seed_sources,
            browser_fallback: flag("BROWSER_FALLBACK", true),
            http,
            browser,
            fetch_concurrency: number(&get, "FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY as u64)? as usize,
            check_interval_minutes: check_interval_minutes(&get)?,
            scheduler_enabled: flag("SCHEDULER_ENABLED", true),
            existence_check_policy,
            email: EmailConfig {
                api_key: get("RESEND_API_KEY"),
                sender: get("EMAIL_SENDER").unwrap_or_else(|| DEFAULT_EMAIL_SENDER.to_string()),
                recipient: get("EMAIL_RECIPIENT"),
                smtp: SmtpConfig {
                    server: get("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
                    port: number(&get, "SMTP_PORT", u64::from(DEFAULT_SMTP_PORT))?
                        .try_into()
                        .map_err(|_| invalid_number(&get, "SMTP_PORT"))?,
                    username: get("SMTP_USERNAME"),
                    password: get("EMAIL_PASSWORD"),
                },
            },
        })
    }

    /// One chat client per configured key, behind a rotating cursor.
    pub fn llm_provider(&self) -> Result<KeyRotatingProvider<OpenAiChat>, LlmError> {
        let clients = self
            .llm_api_keys
            .iter()
            .map(|key| OpenAiChat::new(key, &self.llm_api_base, &self.llm_model))
            .collect::<Result<Vec<_>, _>>()?;
        KeyRotatingProvider::new(clients)
    }

    /// HTTP fetching plus headless Chrome for sources that need rendering.
    pub fn fetch_router(&self) -> Result<FetchRouter, Error> {
        let http = HttpFetcher::new(self.http.clone())?;
        Ok(FetchRouter::new(Arc::new(http))
            .with_browser(Arc::new(ChromeFetcher::new(self.browser.clone())))
            .with_fallback(self.browser_fallback)
            .with_concurrency(self.fetch_concurrency))
    }
}

/// Parses the `JOB_SOURCES` JSON list. Entries without `requires_browser` use `default_use_browser`.
pub fn parse_job_sources(json: &str, default_use_browser: bool) -> Result<Vec<NewSource>, ConfigError> {
    let payloads: Vec<SourcePayload> = serde_json::from_str(json)?;
    Ok(payloads
        .into_iter()
        .filter(|p| !p.url.trim().is_empty())
        .map(|mut p| {
            p.requires_browser.get_or_insert(default_use_browser);
            seed_source(p)
        })
        .collect())
}

/// A configured source is named after its host unless a name is given.
fn seed_source(payload: SourcePayload) -> NewSource {
    let host = url::Url::parse(payload.url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| UNNAMED_SOURCE.to_string());
    payload.into_new_source(&host)
}

fn number<G>(get: &G, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(default),
    }
}

/// `CHECK_INTERVAL_MINUTES`, else `CHECK_INTERVAL_HOURS` converted to minutes.
fn check_interval_minutes<G>(get: &G) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if get("CHECK_INTERVAL_MINUTES").is_none()
        && let Some(hours) = get("CHECK_INTERVAL_HOURS")
    {
        return hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(60))
            .ok_or(ConfigError::InvalidNumber {
                var: "CHECK_INTERVAL_HOURS",
                value: hours,
            });
    }
    number(get, "CHECK_INTERVAL_MINUTES", DEFAULT_CHECK_INTERVAL_MINUTES)
}

fn invalid_number<G>(get: &G, var: &'static str) -> ConfigError
where
    G: Fn(&str) -> Option<String>,
{
    ConfigError::InvalidNumber {
        var,
        value: get(var).unwrap_or_default(),
    }
}
