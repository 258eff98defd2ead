//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`ChannelClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use filenest_channel::ChannelClient;
//!
//! # fn example() -> filenest_channel::Result<()> {
//! let client = ChannelClient::builder()
//!     .url("ws://localhost:8000/ws")
//!     .base_delay(Duration::from_millis(500))
//!     .max_attempts(8)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::websocket::DEFAULT_CONNECT_TIMEOUT;
use crate::transport::{Transport, WebSocketTransport};

use super::core::ChannelClient;
use super::options::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when no URL is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8000/ws";

// ============================================================================
// ChannelClientBuilder
// ============================================================================

/// Builder for configuring a [`ChannelClient`].
///
/// Use [`ChannelClient::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ChannelClientBuilder {
    /// Endpoint URL.
    url: Option<String>,
    /// Backoff settings.
    policy: ReconnectPolicy,
    /// WebSocket handshake timeout.
    connect_timeout: Duration,
    /// Custom transport; replaces the WebSocket transport when set.
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ChannelClientBuilder {
    fn default() -> Self {
        Self {
            url: None,
            policy: ReconnectPolicy::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transport: None,
        }
    }
}

impl fmt::Debug for ChannelClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelClientBuilder")
            .field("url", &self.url)
            .field("policy", &self.policy)
            .field("connect_timeout", &self.connect_timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// ChannelClientBuilder Implementation
// ============================================================================

impl ChannelClientBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Replaces the whole reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the delay before the first reconnect attempt.
    #[inline]
    #[must_use]
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.policy.base_delay = base_delay;
        self
    }

    /// Sets how many reconnect attempts follow a drop.
    #[inline]
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Uses a custom transport instead of WebSocket.
    ///
    /// The URL and connect timeout are ignored when set.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::Config`] if the scheme is unsupported
    /// - [`Error::Config`] if the policy or timeout is invalid
    pub fn build(self) -> Result<ChannelClient> {
        self.validate_policy()?;

        let transport = match self.transport.clone() {
            Some(transport) => transport,
            None => {
                let url = self.validate_url()?;
                self.validate_timeout()?;
                Arc::new(WebSocketTransport::new(url).with_connect_timeout(self.connect_timeout))
            }
        };

        Ok(ChannelClient::from_shared(transport, self.policy))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChannelClientBuilder {
    /// Validates the endpoint URL.
    fn validate_url(&self) -> Result<Url> {
        let url = Url::parse(self.url.as_deref().unwrap_or(DEFAULT_URL))?;

        match url.scheme() {
            "ws" => Ok(url),
            "wss" if cfg!(feature = "tls") => Ok(url),
            "wss" => Err(Error::config(
                "wss:// endpoints need the `tls` feature.\n\
                 Enable it in Cargo.toml: filenest-channel = { features = [\"tls\"] }",
            )),
            other => Err(Error::config(format!(
                "Unsupported URL scheme '{other}'. Use ws:// or wss://"
            ))),
        }
    }

    /// Validates the reconnect policy.
    fn validate_policy(&self) -> Result<()> {
        if self.policy.max_attempts > 0 && self.policy.base_delay.is_zero() {
            return Err(Error::config(
                "Reconnect base delay must be positive when reconnection is enabled",
            ));
        }
        Ok(())
    }

    /// Validates the handshake timeout.
    fn validate_timeout(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::MockTransport;

    #[test]
    fn test_defaults() {
        let builder = ChannelClientBuilder::new();
        assert!(builder.url.is_none());
        assert_eq!(builder.policy, ReconnectPolicy::new());
        assert_eq!(builder.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(builder.transport.is_none());
    }

    #[test]
    fn test_default_url_is_valid() {
        let url = ChannelClientBuilder::new().validate_url().expect("default url");
        assert_eq!(url.as_str(), DEFAULT_URL);
    }

    #[test]
    fn test_policy_setters() {
        let builder = ChannelClientBuilder::new()
            .base_delay(Duration::from_millis(250))
            .max_attempts(2);

        assert_eq!(
            builder.policy,
            ReconnectPolicy::new()
                .with_base_delay(Duration::from_millis(250))
                .with_max_attempts(2)
        );
    }

    #[test]
    fn test_build_with_url() {
        let client = ChannelClientBuilder::new()
            .url("ws://127.0.0.1:9000/ws")
            .build()
            .expect("build");

        assert!(!client.is_connected());
        assert_eq!(client.policy(), ReconnectPolicy::new());
    }

    #[test]
    fn test_build_rejects_http_scheme() {
        let err = ChannelClientBuilder::new()
            .url("http://localhost:8000")
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_build_rejects_garbage_url() {
        let err = ChannelClientBuilder::new().url("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn test_wss_requires_tls_feature() {
        let err = ChannelClientBuilder::new()
            .url("wss://filenest.example/ws")
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("tls"));
    }

    #[test]
    fn test_build_rejects_zero_delay() {
        let err = ChannelClientBuilder::new()
            .base_delay(Duration::ZERO)
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_zero_delay_allowed_when_disabled() {
        let result = ChannelClientBuilder::new()
            .reconnect_policy(ReconnectPolicy::disabled().with_base_delay(Duration::ZERO))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let err = ChannelClientBuilder::new()
            .connect_timeout(Duration::ZERO)
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_custom_transport_skips_url_validation() {
        let result = ChannelClientBuilder::new()
            .url("http://ignored")
            .transport(MockTransport::default())
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ChannelClientBuilder::new().url("ws://a/ws");
        let cloned = builder.clone();
        assert_eq!(builder.url, cloned.url);
    }
}
