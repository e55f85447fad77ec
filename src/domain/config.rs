//! Configuration for the gateway and the store.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::{GatewayError, GatewayResult};

/// Environment variable holding the backend base URL.
pub const ENV_BACKEND_URL: &str = "CHAT_SYNC_BACKEND_URL";
/// Environment variable selecting the route layout (`proxy` or `backend`).
pub const ENV_ROUTES: &str = "CHAT_SYNC_ROUTES";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "CHAT_SYNC_TIMEOUT_SECS";

/// Title used when a conversation is created without one.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatSyncConfig {
    /// Backend connection settings.
    pub gateway: GatewayConfig,
    /// Store behaviour settings.
    pub store: StoreConfig,
}

impl ChatSyncConfig {
    /// Build a config from defaults overridden by environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparsable value or the
    /// result fails validation.
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            config.gateway.base_url = url;
        }

        if let Ok(routes) = std::env::var(ENV_ROUTES) {
            config.gateway.routes = routes.parse()?;
        }

        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                GatewayError::InvalidConfig(format!("{ENV_TIMEOUT_SECS} must be an integer"))
            })?;
            config.gateway.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range or invalid.
    pub fn validate(&self) -> GatewayResult<()> {
        self.gateway.validate()?;
        if self.store.default_title.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "store.default_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path layout exposed by the server the client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStyle {
    /// Front proxy: ids travel as query parameters
    /// (`/api/conversations?id=`, `/api/messages?conversationId=`).
    #[default]
    Proxy,
    /// Backend directly: ids travel as path segments
    /// (`/api/conversations/{id}`, `/api/messages/{id}`).
    Backend,
}

impl FromStr for RouteStyle {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(Self::Proxy),
            "backend" => Ok(Self::Backend),
            other => Err(GatewayError::InvalidConfig(format!(
                "unknown route style: {other}"
            ))),
        }
    }
}

/// Connection settings for the HTTP gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Route layout.
    pub routes: RouteStyle,
    /// Whole-request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            routes: RouteStyle::Proxy,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("chat-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GatewayConfig {
    /// Create a config pointing at `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the route layout.
    #[must_use]
    pub const fn with_routes(mut self, routes: RouteStyle) -> Self {
        self.routes = routes;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parse the base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is malformed or cannot carry paths.
    pub fn parsed_base_url(&self) -> GatewayResult<Url> {
        let url = Url::parse(&self.base_url)?;
        if url.cannot_be_a_base() {
            return Err(GatewayError::InvalidConfig(format!(
                "base_url cannot be a base: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Validate connection settings.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or a timeout is zero.
    pub fn validate(&self) -> GatewayResult<()> {
        self.parsed_base_url()?;
        if self.request_timeout.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "gateway.request_timeout must be > 0".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "gateway.connect_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store behaviour settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Title sent when `create_conversation` gets none.
    pub default_title: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
