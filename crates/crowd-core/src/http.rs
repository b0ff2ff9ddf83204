//! HTTP settings for the connection to a Crowd server.
//!
//! Every directory call is a single round trip; there is no retry policy here.

use crate::config::CrowdConfig;
use reqwest::ClientBuilder;
use std::time::Duration;

/// Default connect timeout (seconds).
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Idle pooled connections are closed after this many seconds.
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Timeouts, pooling and compression for the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Total time allowed for one request, including reading the body.
    pub request_timeout: Duration,
    /// Time allowed to establish the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Duration,
    /// Maximum idle pooled connections per host.
    pub pool_max_idle_per_host: usize,
    /// Accept gzip-compressed responses.
    pub gzip: bool,
}

impl HttpSettings {
    /// Settings for a connection described by `config`.
    #[must_use]
    pub const fn from_config(config: &CrowdConfig) -> Self {
        Self {
            request_timeout: config.timeout(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            gzip: true,
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout for pooled connections.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable gzip responses.
    #[must_use]
    pub const fn with_gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Connect timeout, never longer than the request timeout.
    #[must_use]
    pub fn effective_connect_timeout(&self) -> Duration {
        self.connect_timeout.min(self.request_timeout)
    }

    /// Apply these settings to a reqwest client builder.
    #[must_use]
    pub fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        builder
            .timeout(self.request_timeout)
            .connect_timeout(self.effective_connect_timeout())
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .gzip(self.gzip)
    }
}
