//! Client configuration.
//!
//! Provides the endpoint, the reply policy and the [`ConfigStore`] the
//! client consults on every `start()`.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use c4d_connector::{ClientOptions, Endpoint, ReplyPolicy};
//!
//! let options = ClientOptions::new()
//!     .with_endpoint(Endpoint::new("127.0.0.1", 7788))
//!     .with_reply_policy(ReplyPolicy::new(20, Duration::from_secs(5)))
//!     .with_get_path_on_connect(true);
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default host address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default host port.
pub const DEFAULT_PORT: u16 = 7788;

/// Frames inspected before a query gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// Wall-clock bound on one query.
pub const DEFAULT_REPLY_DEADLINE: Duration = Duration::from_secs(10);

// ============================================================================
// Endpoint
// ============================================================================

/// Host address of the Cinema 4D code exchange server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the WebSocket URL for this endpoint.
    ///
    /// Format: `ws://{host}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    /// Validates the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host or port 0.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("Host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("Port must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ws_url())
    }
}

// ============================================================================
// ReplyPolicy
// ============================================================================

/// Bounds applied to every reply search.
///
/// A search stops at whichever comes first: `max_attempts` inspected
/// frames or `deadline` elapsed.
///
/// Attempts count every frame, including console output and pushes that
/// were buffered before the query started. A long backlog of unclaimed
/// frames can therefore use up the budget before the reply arrives;
/// raise `max_attempts` for chatty hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPolicy {
    /// Maximum number of frames inspected.
    pub max_attempts: usize,
    /// Maximum wall-clock time spent waiting.
    pub deadline: Duration,
}

impl ReplyPolicy {
    /// Creates a new policy.
    #[inline]
    #[must_use]
    pub const fn new(max_attempts: usize, deadline: Duration) -> Self {
        Self {
            max_attempts,
            deadline,
        }
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero budget.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("Reply attempts must be greater than zero"));
        }
        if self.deadline.is_zero() {
            return Err(Error::config("Reply deadline must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ReplyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_REPLY_DEADLINE)
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// Settings storage consulted by the client.
///
/// The endpoint and the get-path flag are read on every `start()`, so
/// changes take effect on the next reconnect.
pub trait ConfigStore: Send + Sync {
    /// Current endpoint.
    fn endpoint(&self) -> Endpoint;

    /// Whether `start()` should query the install path.
    fn call_get_path_on_connect(&self) -> bool;

    /// Persists the install path reported by the host.
    ///
    /// # Errors
    ///
    /// Implementation-defined storage failure.
    fn store_install_path(&self, path: &str) -> Result<()>;

    /// Last persisted install path, if any.
    fn install_path(&self) -> Option<String>;
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Plain option set, also usable as an in-memory [`ConfigStore`] seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Host endpoint.
    pub endpoint: Endpoint,
    /// Reply search bounds.
    pub reply_policy: ReplyPolicy,
    /// Query the install path right after connecting.
    pub get_path_on_connect: bool,
}

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the reply policy.
    #[inline]
    #[must_use]
    pub fn with_reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.reply_policy = policy;
        self
    }

    /// Enables or disables the install path query on connect.
    #[inline]
    #[must_use]
    pub fn with_get_path_on_connect(mut self, enabled: bool) -> Self {
        self.get_path_on_connect = enabled;
        self
    }

    /// Validates all options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        self.reply_policy.validate()
    }
}

// ============================================================================
// MemoryConfigStore
// ============================================================================

/// In-process [`ConfigStore`].
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    endpoint: Endpoint,
    get_path_on_connect: bool,
    install_path: Option<String>,
}

impl MemoryConfigStore {
    /// Creates a store seeded from options.
    #[must_use]
    pub fn new(options: &ClientOptions) -> Self {
        Self {
            state: Mutex::new(StoreState {
                endpoint: options.endpoint.clone(),
                get_path_on_connect: options.get_path_on_connect,
                install_path: None,
            }),
        }
    }

    /// Replaces the endpoint used by the next `start()`.
    pub fn set_endpoint(&self, endpoint: Endpoint) {
        self.state.lock().endpoint = endpoint;
    }

    /// Toggles the install path query on connect.
    pub fn set_get_path_on_connect(&self, enabled: bool) {
        self.state.lock().get_path_on_connect = enabled;
    }
}

impl ConfigStore for MemoryConfigStore {
    fn endpoint(&self) -> Endpoint {
        self.state.lock().endpoint.clone()
    }

    fn call_get_path_on_connect(&self) -> bool {
        self.state.lock().get_path_on_connect
    }

    fn store_install_path(&self, path: &str) -> Result<()> {
        self.state.lock().install_path = Some(path.to_string());
        Ok(())
    }

    fn install_path(&self) -> Option<String> {
        self.state.lock().install_path.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.ws_url(), "ws://127.0.0.1:7788");
        assert_eq!(endpoint.to_string(), "ws://127.0.0.1:7788");
    }

    #[test]
    fn test_default_policy() {
        let policy = ReplyPolicy::default();
        assert_eq!(policy.max_attempts, 20);
        assert_eq!(policy.deadline, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let options = ClientOptions::new().with_endpoint(Endpoint::new("localhost", 0));
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_policy() {
        let options =
            ClientOptions::new().with_reply_policy(ReplyPolicy::new(0, Duration::from_secs(1)));
        assert!(options.validate().is_err());

        let options = ClientOptions::new().with_reply_policy(ReplyPolicy::new(1, Duration::ZERO));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let options = ClientOptions::new().with_get_path_on_connect(true);
        let store = MemoryConfigStore::new(&options);

        assert!(store.call_get_path_on_connect());
        assert_eq!(store.install_path(), None);

        store.store_install_path("/Applications/Maxon Cinema 4D 2024").unwrap();
        assert_eq!(
            store.install_path().as_deref(),
            Some("/Applications/Maxon Cinema 4D 2024")
        );

        store.set_endpoint(Endpoint::new("10.0.0.2", 9000));
        assert_eq!(store.endpoint().ws_url(), "ws://10.0.0.2:9000");
    }
}
