//! Endpoint and HTTP client configuration.

use crate::error::{ImageError, Result};
use crate::params::Operation;
use std::time::Duration;

/// Default OpenAI API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Path of the generation endpoint, relative to the base URL.
pub const GENERATIONS_PATH: &str = "/images/generations";

/// Path of the edit endpoint, relative to the base URL.
pub const EDITS_PATH: &str = "/images/edits";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Default request and connect timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Absolute URLs of the two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Image generation endpoint.
    pub generations: String,
    /// Image edit endpoint.
    pub edits: String,
}

impl Endpoints {
    /// Derive both endpoints from a base URL such as `https://api.openai.com/v1`.
    #[must_use]
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            generations: format!("{base}{GENERATIONS_PATH}"),
            edits: format!("{base}{EDITS_PATH}"),
        }
    }

    /// Returns the endpoint serving `operation`.
    #[must_use]
    pub fn url_for(&self, operation: Operation) -> &str {
        match operation {
            Operation::Generate => &self.generations,
            Operation::Edit => &self.edits,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_base_url(OPENAI_API_BASE_URL)
    }
}

/// Settings for the default `reqwest` transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// User agent string.
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            connect_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            user_agent: Some(
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest client with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Config`] if the client cannot be built.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        if let Some(timeout) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(timeout));
        }
        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder
            .build()
            .map_err(|e| ImageError::config(format!("failed to build HTTP client: {e}")))
    }
}

/// Values read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: Option<String>,
}

impl EnvConfig {
    /// Read [`API_KEY_ENV`] and [`BASE_URL_ENV`] through `lookup`.
    pub(crate) fn load<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ImageError::config(format!("{API_KEY_ENV} is not set")))?;
        let base_url = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty());
        Ok(Self { api_key, base_url })
    }
}
