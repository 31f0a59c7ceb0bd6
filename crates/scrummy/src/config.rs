//! Configuration for the webhook service.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::remote::{Credentials, GITHUB_API_URL};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GITHUB_WEBHOOK_SECRET is required to verify deliveries")]
    MissingWebhookSecret,

    #[error("GITHUB_TOKEN is required to call the GitHub API")]
    MissingToken,

    #[error("unknown log format '{0}', expected 'json' or 'pretty'")]
    InvalidLogFormat(String),
}

/// Webhook service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Shared secret for `X-Hub-Signature` verification.
    pub webhook_secret: Option<String>,
    /// REST API base URL; GraphQL is served from `<api_url>/graphql`.
    pub api_url: String,
    /// Login for Basic auth. Bearer auth is used when unset.
    pub github_user: Option<String>,
    /// API token.
    pub github_token: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("SCRUMMY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            webhook_secret: non_empty("GITHUB_WEBHOOK_SECRET"),
            api_url: non_empty("GITHUB_API_URL").unwrap_or_else(|| GITHUB_API_URL.to_string()),
            github_user: non_empty("GITHUB_USER"),
            github_token: non_empty("GITHUB_TOKEN"),
            log_format: env::var("SCRUMMY_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Check that everything needed to serve deliveries is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_secret.is_none() {
            return Err(ConfigError::MissingWebhookSecret);
        }
        if self.github_token.is_none() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }

    /// API credentials: Basic when a user is configured, bearer otherwise.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let token = self.github_token.clone().ok_or(ConfigError::MissingToken)?;
        Ok(Credentials::new(self.github_user.clone(), token))
    }
}
