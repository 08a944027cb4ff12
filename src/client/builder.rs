//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use c4d_connector::{Client, Endpoint, LocalWorkspace};
//!
//! let workspace = Arc::new(LocalWorkspace::default());
//! let client = Client::builder()
//!     .endpoint(Endpoint::new("127.0.0.1", 7788))
//!     .workspace(workspace)
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::config::{ClientOptions, ConfigStore, Endpoint, MemoryConfigStore, ReplyPolicy};
use crate::error::Result;
use crate::host::{ConsoleSink, ContentSink, LocalWorkspace, ScriptSource, TracingConsole};
use crate::paths::Platform;
use crate::transport::ConnectionState;

use super::core::{Client, ClientInner, EVENT_CAPACITY};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder. Collaborators that
/// are not set default to a [`LocalWorkspace`] for content and documents
/// and a [`TracingConsole`] for console output.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Endpoint, reply policy and get-path flag.
    options: ClientOptions,
    /// Settings store; seeded from `options` when absent.
    config: Option<Arc<dyn ConfigStore>>,
    /// Content sink.
    content: Option<Arc<dyn ContentSink>>,
    /// Console sink.
    console: Option<Arc<dyn ConsoleSink>>,
    /// Document reader.
    source: Option<Arc<dyn ScriptSource>>,
    /// Path convention override.
    platform: Option<Platform>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the endpoint used to seed the default store.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.options.endpoint = endpoint;
        self
    }

    /// Sets the reply search bounds.
    #[inline]
    #[must_use]
    pub fn reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.options.reply_policy = policy;
        self
    }

    /// Queries the install path right after every connect.
    #[inline]
    #[must_use]
    pub fn get_path_on_connect(mut self, enabled: bool) -> Self {
        self.options.get_path_on_connect = enabled;
        self
    }

    /// Uses an external settings store.
    ///
    /// The store's endpoint and get-path flag take precedence over the
    /// builder's options.
    #[inline]
    #[must_use]
    pub fn config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config = Some(store);
        self
    }

    /// Sets the sink for pushed script content.
    #[inline]
    #[must_use]
    pub fn content_sink(mut self, sink: Arc<dyn ContentSink>) -> Self {
        self.content = Some(sink);
        self
    }

    /// Sets the sink for host console output.
    #[inline]
    #[must_use]
    pub fn console_sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(sink);
        self
    }

    /// Sets the reader for saved documents.
    #[inline]
    #[must_use]
    pub fn script_source(mut self, source: Arc<dyn ScriptSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Uses one workspace as both content sink and script source.
    #[inline]
    #[must_use]
    pub fn workspace(mut self, workspace: Arc<LocalWorkspace>) -> Self {
        self.content = Some(Arc::clone(&workspace) as Arc<dyn ContentSink>);
        self.source = Some(workspace as Arc<dyn ScriptSource>);
        self
    }

    /// Overrides the path convention (defaults to the current platform).
    #[inline]
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for an invalid
    /// endpoint or reply policy.
    pub fn build(self) -> Result<Client> {
        self.options.validate()?;

        let platform = self.platform.unwrap_or_else(Platform::current);
        let config = self
            .config
            .unwrap_or_else(|| Arc::new(MemoryConfigStore::new(&self.options)));

        let (content, source) = match (self.content, self.source) {
            (Some(content), Some(source)) => (content, source),
            (content, source) => {
                let workspace = Arc::new(LocalWorkspace::new(platform));
                (
                    content.unwrap_or_else(|| Arc::clone(&workspace) as Arc<dyn ContentSink>),
                    source.unwrap_or_else(|| workspace as Arc<dyn ScriptSource>),
                )
            }
        };
        let console = self
            .console
            .unwrap_or_else(|| Arc::new(TracingConsole));

        let endpoint = config.endpoint();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Client::from_inner(ClientInner {
            config,
            policy: self.options.reply_policy,
            platform,
            content,
            console,
            source,
            connection: Mutex::new(None),
            endpoint: Mutex::new(endpoint),
            state: Arc::new(state),
            events,
            exchange: tokio::sync::Mutex::new(()),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let client = ClientBuilder::new().build().unwrap();
        assert_eq!(client.conn_string(), "ws://127.0.0.1:7788");
        assert_eq!(client.reply_policy(), ReplyPolicy::default());
        assert_eq!(client.platform(), Platform::current());
        assert!(!client.is_connected());
    }

    #[test]
    fn test_rejects_invalid_options() {
        let result = ClientBuilder::new()
            .reply_policy(ReplyPolicy::new(0, Duration::from_secs(1)))
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = ClientBuilder::new()
            .endpoint(Endpoint::new("", 7788))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_external_store_wins() {
        let store = Arc::new(MemoryConfigStore::default());
        store.set_endpoint(Endpoint::new("10.0.0.5", 9001));

        let client = ClientBuilder::new()
            .endpoint(Endpoint::new("127.0.0.1", 1234))
            .config_store(store)
            .platform(Platform::Windows)
            .build()
            .unwrap();

        assert_eq!(client.conn_string(), "ws://10.0.0.5:9001");
        assert_eq!(client.platform(), Platform::Windows);
    }
}
