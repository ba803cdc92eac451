//! Sentinel Hub connection settings
//!
//! Credentials are never compiled in: they come from the environment or are
//! set explicitly through the builder.

use std::fmt;
use std::time::Duration;

use crate::carbon_pipeline::common::error::{EstimationError, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://services.sentinel-hub.com/oauth/token";
pub const DEFAULT_PROCESS_URL: &str = "https://services.sentinel-hub.com/api/v1/process";

pub const ENV_CLIENT_ID: &str = "SENTINEL_HUB_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SENTINEL_HUB_CLIENT_SECRET";
pub const ENV_TOKEN_URL: &str = "SENTINEL_HUB_TOKEN_URL";
pub const ENV_PROCESS_URL: &str = "SENTINEL_HUB_PROCESS_URL";

const DEFAULT_OUTPUT_SIZE: u32 = 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct SentinelHubConfig {
    pub client_id: String,
    client_secret: String,
    pub token_url: String,
    pub process_url: String,
    /// Requested output width in pixels
    pub output_width: u32,
    /// Requested output height in pixels
    pub output_height: u32,
    pub timeout: Duration,
}

impl fmt::Debug for SentinelHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentinelHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("process_url", &self.process_url)
            .field("output_width", &self.output_width)
            .field("output_height", &self.output_height)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SentinelHubConfig {
    pub fn builder() -> SentinelHubConfigBuilder {
        SentinelHubConfigBuilder::default()
    }

    /// Reads credentials and optional endpoint overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(id) = lookup(ENV_CLIENT_ID) {
            builder = builder.client_id(id);
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            builder = builder.client_secret(secret);
        }
        if let Some(url) = lookup(ENV_TOKEN_URL) {
            builder = builder.token_url(url);
        }
        if let Some(url) = lookup(ENV_PROCESS_URL) {
            builder = builder.process_url(url);
        }
        builder.build()
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

#[derive(Default)]
pub struct SentinelHubConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: Option<String>,
    process_url: Option<String>,
    output_width: Option<u32>,
    output_height: Option<u32>,
    timeout: Option<Duration>,
}

impl SentinelHubConfigBuilder {
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn process_url(mut self, url: impl Into<String>) -> Self {
        self.process_url = Some(url.into());
        self
    }

    pub fn output_size(mut self, width: u32, height: u32) -> Self {
        self.output_width = Some(width);
        self.output_height = Some(height);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<SentinelHubConfig> {
        let client_id = non_empty(self.client_id, ENV_CLIENT_ID)?;
        let client_secret = non_empty(self.client_secret, ENV_CLIENT_SECRET)?;

        let output_width = self.output_width.unwrap_or(DEFAULT_OUTPUT_SIZE);
        let output_height = self.output_height.unwrap_or(DEFAULT_OUTPUT_SIZE);
        if output_width == 0 || output_height == 0 {
            return Err(EstimationError::ConfigError(format!(
                "output size must be non-zero, got {}x{}",
                output_width, output_height
            )));
        }

        Ok(SentinelHubConfig {
            client_id,
            client_secret,
            token_url: self.token_url.unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            process_url: self
                .process_url
                .unwrap_or_else(|| DEFAULT_PROCESS_URL.to_string()),
            output_width,
            output_height,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn non_empty(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EstimationError::ConfigError(format!(
            "missing Sentinel Hub credential, set {}",
            name
        ))),
    }
}
