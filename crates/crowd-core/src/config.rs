//! Configuration structures for Crowd clients.
//!
//! This module provides the connection configuration for a Crowd application account:
//! server location, application credentials, TLS verification policy, and request limits.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Path of the user-management REST API below the server base URL.
pub const REST_ROOT_PATH: &str = "rest/usermanagement/1";

/// Page-size ceiling requested by nested membership queries.
///
/// Nested queries are paginated server-side; the client always asks for one window this
/// large, which covers practical directory sizes. Larger directories should raise it via
/// [`CrowdConfig::with_nested_max_results`].
pub const DEFAULT_NESTED_MAX_RESULTS: u32 = 99_999;

/// TLS certificate verification policy.
///
/// Deserializes from a boolean (`true` / `false`), the strings `"true"` / `"false"` (as
/// environment-sourced settings deliver them), or a path to a PEM trust bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsVerify {
    /// Verify against the platform trust roots.
    #[default]
    Enabled,
    /// Accept any certificate.
    Disabled,
    /// Verify against the certificates in this PEM bundle.
    TrustBundle(PathBuf),
}

impl TlsVerify {
    /// Returns true unless verification is disabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Path of the trust bundle, if one is configured.
    #[must_use]
    pub fn trust_bundle(&self) -> Option<&PathBuf> {
        match self {
            Self::TrustBundle(path) => Some(path),
            _ => None,
        }
    }
}

impl From<bool> for TlsVerify {
    fn from(verify: bool) -> Self {
        if verify {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl From<PathBuf> for TlsVerify {
    fn from(path: PathBuf) -> Self {
        Self::TrustBundle(path)
    }
}

impl<'de> Deserialize<'de> for TlsVerify {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(verify) => verify.into(),
            Repr::Text(text) => {
                let flag = text.trim();
                if flag.eq_ignore_ascii_case("true") {
                    Self::Enabled
                } else if flag.eq_ignore_ascii_case("false") {
                    Self::Disabled
                } else if flag.is_empty() {
                    return Err(serde::de::Error::custom(
                        "tls_verify must be a boolean or a trust bundle path",
                    ));
                } else {
                    Self::TrustBundle(PathBuf::from(text))
                }
            }
        })
    }
}

/// Credentials identifying this application to the Crowd server.
///
/// These are the application account's name and password, sent as HTTP Basic
/// authentication on every request. They are distinct from end-user credentials.
pub struct AppCredentials {
    name: String,
    secret: SecretString,
}

impl AppCredentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(name: impl Into<String>, secret: SecretString) -> Self {
        Self {
            name: name.into(),
            secret,
        }
    }

    /// Application name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Application password.
    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for a Crowd application connection.
///
/// Immutable once handed to a client.
#[derive(Debug, Deserialize, Validate)]
pub struct CrowdConfig {
    /// Crowd server base URL (e.g., `https://crowd.example.com/crowd`)
    #[validate(url, length(min = 1))]
    pub base_url: String,

    /// Application name
    #[validate(length(min = 1))]
    pub app_name: String,

    /// Application password
    #[serde(deserialize_with = "deserialize_secret")]
    pub app_password: SecretString,

    /// TLS certificate verification policy
    #[serde(default)]
    pub tls_verify: TlsVerify,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Page-size ceiling for nested membership queries
    #[validate(range(min = 1))]
    #[serde(default = "default_nested_max_results")]
    pub nested_max_results: u32,
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_nested_max_results() -> u32 {
    DEFAULT_NESTED_MAX_RESULTS
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl CrowdConfig {
    /// Create a new configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Crowd server URL; trailing slashes are stripped
    /// * `app_name` - Application account name
    /// * `app_password` - Application account password
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(
        base_url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            base_url: base_url.into(),
            app_name: app_name.into(),
            app_password: SecretString::from(app_password.into()),
            tls_verify: TlsVerify::default(),
            request_timeout_secs: default_request_timeout_secs(),
            nested_max_results: default_nested_max_results(),
        };
        config.check()?;
        Ok(config)
    }

    /// Validate a configuration built by deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid field.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        if self.app_password.expose_secret().is_empty() {
            return Err(Error::ConfigError(
                "Invalid configuration: app_password must not be empty".to_string(),
            ));
        }
        self.rest_root().map(|_| ())
    }

    /// Set the TLS verification policy.
    #[must_use]
    pub fn with_tls_verify(mut self, tls_verify: impl Into<TlsVerify>) -> Self {
        self.tls_verify = tls_verify.into();
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the page-size ceiling for nested membership queries.
    #[must_use]
    pub const fn with_nested_max_results(mut self, max_results: u32) -> Self {
        self.nested_max_results = max_results;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with trailing slashes removed.
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Parse the REST root, `<base>/rest/usermanagement/1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be parsed or cannot carry a path.
    pub fn rest_root(&self) -> Result<Url, Error> {
        let root = format!("{}/{REST_ROOT_PATH}", self.normalized_base_url());
        let url = Url::parse(&root)
            .map_err(|e| Error::ConfigError(format!("Invalid Crowd URL: {e}")))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!(
                "Invalid Crowd URL: `{}` is not an http(s) base",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Application credentials for HTTP Basic authentication.
    #[must_use]
    pub fn credentials(&self) -> AppCredentials {
        AppCredentials::new(
            self.app_name.clone(),
            SecretString::from(self.app_password.expose_secret().to_owned()),
        )
    }
}
