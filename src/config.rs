//! Client configuration from the environment.

use std::fmt;
use thiserror::Error;

/// Environment variable holding a pre-obtained REST session token.
pub const TOKEN_ENV: &str = "BULLHORN_SESSION_TOKEN";

/// Environment variable holding the REST base URL returned at login.
pub const REST_URL_ENV: &str = "BULLHORN_REST_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Everything needed to construct a [`BullhornClient`](crate::BullhornClient).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub token: Option<String>,
    pub rest_url: String,
}

impl ClientConfig {
    pub fn new(token: Option<String>, rest_url: impl Into<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            rest_url: rest_url.into(),
        }
    }

    /// Reads [`TOKEN_ENV`] and [`REST_URL_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rest_url = lookup(REST_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(REST_URL_ENV))?;

        Ok(Self::new(lookup(TOKEN_ENV), rest_url))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("rest_url", &self.rest_url)
            .finish()
    }
}
