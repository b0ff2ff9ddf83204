//! HTTP transport seam.
//!
//! [`DirectoryClient`](crate::DirectoryClient) builds fully-formed [`HttpRequest`]s and
//! hands them to an [`HttpTransport`]. Content negotiation travels with each request, so
//! switching one call to XML never touches shared state.

use crate::Result;
use async_trait::async_trait;
use crowd_core::config::{AppCredentials, TlsVerify};
use crowd_core::http::HttpSettings;
use crowd_core::Error;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::ExposeSecret;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("crowd-usermgmt/", env!("CARGO_PKG_VERSION"));

/// Media type declared in both `Content-Type` and `Accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl MediaType {
    /// MIME string for the header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to the Crowd REST API.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Declared content type and accepted response type.
    pub media_type: MediaType,
    /// Encoded request body.
    pub body: Option<Vec<u8>>,
    /// Application credentials for HTTP Basic authentication.
    pub credentials: Arc<AppCredentials>,
}

impl HttpRequest {
    /// Returns the value of the first query parameter named `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with an empty body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Vec::new())
    }
}

/// Sends requests to the Crowd server.
///
/// Implementations own connection pooling, timeouts and cancellation. They must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs one request/response round trip.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Builds the transport. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the trust bundle cannot be read or parsed, or the
    /// HTTP client cannot be constructed.
    pub fn new(tls_verify: &TlsVerify, settings: &HttpSettings) -> Result<Self> {
        let mut builder = settings.apply(ClientBuilder::new().user_agent(USER_AGENT));

        match tls_verify {
            TlsVerify::Enabled => {}
            TlsVerify::Disabled => {
                warn!("TLS verification disabled for Crowd client");
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerify::TrustBundle(path) => {
                debug!("loading Crowd trust bundle from {}", path.display());
                let bytes = std::fs::read(path).map_err(|err| {
                    Error::ConfigError(format!(
                        "Failed to read Crowd trust bundle {}: {err}",
                        path.display()
                    ))
                })?;
                let certificates = reqwest::Certificate::from_pem_bundle(&bytes).map_err(|err| {
                    Error::ConfigError(format!("Invalid Crowd trust bundle: {err}"))
                })?;
                if certificates.is_empty() {
                    return Err(Error::ConfigError(format!(
                        "Crowd trust bundle {} contains no certificates",
                        path.display()
                    )));
                }
                for certificate in certificates {
                    builder = builder.add_root_certificate(certificate);
                }
            }
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build Crowd HTTP client: {err}"))
        })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let media_type = request.media_type.as_str();
        let mut builder = self
            .http
            .request(request.method, request.url)
            .basic_auth(
                request.credentials.name(),
                Some(request.credentials.secret().expose_secret()),
            )
            .header(CONTENT_TYPE, media_type)
            .header(ACCEPT, media_type);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(Error::from)?;
        let status = response.status();
        let body = response.bytes().await.map_err(Error::from)?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_core::config::CrowdConfig;
    use std::io::Write;

    fn settings() -> HttpSettings {
        HttpSettings::from_config(
            &CrowdConfig::new("https://crowd.example.com", "app", "secret").unwrap(),
        )
    }

    #[test]
    fn media_type_strings() {
        assert_eq!(MediaType::default(), MediaType::Json);
        assert_eq!(MediaType::Json.as_str(), "application/json");
        assert_eq!(MediaType::Xml.to_string(), "application/xml");
    }

    #[test]
    fn transport_builds_without_network() {
        assert!(ReqwestTransport::new(&TlsVerify::Enabled, &settings()).is_ok());
        assert!(ReqwestTransport::new(&TlsVerify::Disabled, &settings()).is_ok());
    }

    #[test]
    fn missing_trust_bundle_is_config_error() {
        let tls = TlsVerify::TrustBundle("/nonexistent/crowd-ca.pem".into());
        let err = ReqwestTransport::new(&tls, &settings()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn empty_trust_bundle_is_config_error() {
        let path = std::env::temp_dir().join(format!(
            "crowd-usermgmt-empty-bundle-{}.pem",
            std::process::id()
        ));
        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(b"no certificates here\n"))
            .unwrap();

        let tls = TlsVerify::TrustBundle(path.clone());
        let result = ReqwestTransport::new(&tls, &settings());
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
