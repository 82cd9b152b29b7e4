//! Session configuration.

use std::time::Duration;

use super::retry::{BackoffPolicy, RetryConfig};
use crate::core::{ConfigError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BACKOFF, ENV_PREFIX};
use crate::transport::{ConnectionParameters, TransportKind};

/// Everything needed to build a session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Camera endpoint.
    pub params: ConnectionParameters,

    /// Retry budget and backoff.
    pub retry: RetryConfig,

    /// Per-attempt connect timeout, for transports that dial.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(ConnectionParameters::default())
    }
}

impl SessionConfig {
    /// Default configuration for `params`.
    pub fn new(params: ConnectionParameters) -> Self {
        Self {
            params,
            retry: RetryConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Start building a configuration from defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Check the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        self.retry.validate()
    }

    /// Read overrides from `R2CAM_*` environment variables.
    ///
    /// - `R2CAM_TRANSPORT`: transport kind (`h264`)
    /// - `R2CAM_HOST`, `R2CAM_PORT`: camera endpoint
    /// - `R2CAM_MAX_ATTEMPTS`: attempts per start
    /// - `R2CAM_BACKOFF_MS`: (initial) delay between attempts
    /// - `R2CAM_BACKOFF`: `fixed` or `exponential`
    /// - `R2CAM_CONNECT_TIMEOUT_MS`: per-attempt connect timeout
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading through `lookup` (keys include the prefix).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let defaults = Self::default();
        let mut builder = SessionConfigBuilder::new();

        if let Some(kind) = var("TRANSPORT") {
            builder = builder.transport(kind.parse()?);
        }
        if let Some(host) = var("HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = var("PORT") {
            let port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
            builder = builder.port(port);
        }
        if let Some(attempts) = var("MAX_ATTEMPTS") {
            let attempts = attempts
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAttempts)?;
            builder = builder.max_attempts(attempts);
        }

        let delay = match var("BACKOFF_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidBackoff(format!("bad delay {ms:?}")))?,
            ),
            None => defaults.retry.backoff.base_delay(1),
        };
        let policy = match var("BACKOFF").as_deref().map(str::trim) {
            None | Some("fixed") => BackoffPolicy::Fixed(delay),
            Some("exponential") => BackoffPolicy::exponential(delay, DEFAULT_MAX_BACKOFF.max(delay)),
            Some(other) => {
                return Err(ConfigError::InvalidBackoff(format!(
                    "unknown policy {other:?}"
                )));
            }
        };
        builder = builder.backoff(policy);

        if let Some(ms) = var("CONNECT_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBackoff(format!("bad connect timeout {ms:?}")))?;
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::new(ConnectionParameters::default()),
        }
    }

    /// Set the connection parameters.
    pub fn params(mut self, params: ConnectionParameters) -> Self {
        self.config.params = params;
        self
    }

    /// Set the transport kind.
    pub fn transport(mut self, kind: TransportKind) -> Self {
        let params = &self.config.params;
        self.config.params = ConnectionParameters::new(kind, params.host(), params.port());
        self
    }

    /// Set the camera host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let params = &self.config.params;
        self.config.params = ConnectionParameters::new(params.kind(), host, params.port());
        self
    }

    /// Set the camera port.
    pub fn port(mut self, port: u16) -> Self {
        let params = &self.config.params;
        self.config.params = ConnectionParameters::new(params.kind(), params.host(), port);
        self
    }

    /// Set the attempts per start.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set the backoff policy.
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.config.retry.backoff = policy;
        self
    }

    /// Set the per-attempt connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
