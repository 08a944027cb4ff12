//! Client struct and connection lifecycle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, Endpoint, ReplyPolicy};
use crate::error::{Error, Result};
use crate::host::{ConsoleSink, ContentSink, ScriptSource};
use crate::paths::Platform;
use crate::transport::connection::{Observers, SharedState};
use crate::transport::{CloseRecord, Connection, ConnectionEvent, ConnectionState};

use super::builder::ClientBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the event stream; slow observers lag instead of blocking.
pub(crate) const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Settings read on every `start()`.
    pub config: Arc<dyn ConfigStore>,

    /// Reply search bounds.
    pub policy: ReplyPolicy,

    /// Path convention used when encoding script paths.
    pub platform: Platform,

    /// Receives pushed script content.
    pub content: Arc<dyn ContentSink>,

    /// Receives host console output.
    pub console: Arc<dyn ConsoleSink>,

    /// Reads saved documents.
    pub source: Arc<dyn ScriptSource>,

    /// Current transport, if one was ever opened.
    pub connection: Mutex<Option<Connection>>,

    /// Endpoint of the last `start()`.
    pub endpoint: Mutex<Endpoint>,

    /// Lifecycle state, also the close signal `stop()` waits on.
    pub state: SharedState,

    /// Event stream for passive observers.
    pub events: broadcast::Sender<ConnectionEvent>,

    /// Serializes send-then-match exchanges.
    pub exchange: tokio::sync::Mutex<()>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the Cinema 4D code exchange server.
///
/// Cloning yields another handle to the same client. Observers subscribe
/// once through [`Client::subscribe`] and keep receiving events across
/// reconnects.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("conn_string", &self.conn_string())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// WebSocket URL of the current (or last) endpoint.
    #[must_use]
    pub fn conn_string(&self) -> String {
        self.inner.endpoint.lock().ws_url()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Returns `true` iff a transport exists and is open.
    ///
    /// Turns `false` as soon as a close is under way.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
            && self
                .inner
                .connection
            .lock()
            .as_ref()
            .is_some_and(Connection::is_open)
    }

    /// Subscribes to lifecycle and push events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Reply search bounds.
    #[inline]
    #[must_use]
    pub fn reply_policy(&self) -> ReplyPolicy {
        self.inner.policy
    }

    /// Path convention used for script paths.
    #[inline]
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.inner.platform
    }

    /// Configuration store.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<dyn ConfigStore> {
        &self.inner.config
    }

    /// Number of callers blocked in [`Client::receive`].
    #[must_use]
    pub fn pending_receivers(&self) -> usize {
        self.connection().map_or(0, |c| c.pending_count())
    }

    /// Number of inbound frames nobody has claimed yet.
    #[must_use]
    pub fn buffered_frames(&self) -> usize {
        self.connection().map_or(0, |c| c.buffered_count())
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Opens a transport to the endpoint currently held by the store.
    ///
    /// The new transport starts with empty FIFOs and no close record, and
    /// the content and console observers are attached to it before the
    /// first frame is read.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] unless the client is disconnected or closed
    /// - [`Error::Config`] if the stored endpoint is invalid
    /// - [`Error::Connection`] if the handshake fails; a refused
    ///   connection reads "Failed to Connect to Cinema 4D, ..."
    pub async fn start(&self) -> Result<()> {
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            if state.can_start() {
                previous = Some(std::mem::replace(state, ConnectionState::Connecting));
            }
            previous.is_some()
        });
        let Some(previous) = previous else {
            debug!(state = ?self.state(), "Start rejected");
            return Err(Error::AlreadyConnected);
        };

        match self.open_transport().await {
            Ok(_) => info!(url = %self.conn_string(), "Client started"),
            Err(e) => {
                self.inner.state.send_replace(previous);
                let _ = self.inner.events.send(ConnectionEvent::Error(e.to_string()));
                return Err(e);
            }
        }

        if self.inner.config.call_get_path_on_connect() {
            let client = self.clone();
            tokio::spawn(async move { client.refresh_install_path().await });
        }

        Ok(())
    }

    async fn open_transport(&self) -> Result<Connection> {
        let endpoint = self.inner.config.endpoint();
        endpoint.validate()?;
        *self.inner.endpoint.lock() = endpoint.clone();

        debug!(host = %endpoint.host, port = endpoint.port, "Connecting to Cinema 4D");

        let observers = Observers {
            content: Arc::clone(&self.inner.content),
            console: Arc::clone(&self.inner.console),
            events: self.inner.events.clone(),
        };
        let slot = &self.inner.connection;
        Connection::connect(&endpoint, Arc::clone(&self.inner.state), observers, |connection| {
            *slot.lock() = Some(connection.clone());
        })
        .await
    }

    /// Queries the install path and persists it; failures are logged.
    async fn refresh_install_path(&self) {
        match self.get_install_path().await {
            Ok(Some(path)) => {
                if let Err(e) = self.inner.config.store_install_path(&path) {
                    warn!(error = %e, "Failed to persist install path");
                } else {
                    info!(%path, "Stored Cinema 4D install path");
                }
            }
            Ok(None) => warn!("Cinema 4D did not report its install path"),
            Err(e) => warn!(error = %e, "Install path query failed"),
        }
    }

    /// Closes the transport and waits for the close event.
    ///
    /// Returns immediately with the last close record when nothing is
    /// open. Concurrent callers all wait for the same close and only the
    /// first one sends the close frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] only if the state channel is gone.
    pub async fn stop(&self) -> Result<Option<CloseRecord>> {
        let mut state_rx = self.inner.state.subscribe();

        loop {
            let mut initiated = false;
            self.inner.state.send_if_modified(|state| {
                if state.is_open() {
                    *state = ConnectionState::Closing;
                    initiated = true;
                }
                initiated
            });

            let current = self.state();
            match current {
                ConnectionState::Disconnected => return Ok(None),
                ConnectionState::Closed(record) => return Ok(Some(record)),
                ConnectionState::Connecting => {
                    state_rx
                        .wait_for(|s| !matches!(s, ConnectionState::Connecting))
                        .await
                        .map_err(|_| Error::connection("Client state dropped"))?;
                }
                ConnectionState::Open | ConnectionState::Closing => {
                    if initiated && let Some(connection) = self.connection() {
                        debug!("Closing connection");
                        connection.shutdown();
                    }
                    let settled = state_rx
                        .wait_for(ConnectionState::is_settled)
                        .await
                        .map_err(|_| Error::connection("Client state dropped"))?
                        .clone();
                    info!(record = ?settled.close_record(), "Client stopped");
                    return Ok(settled.close_record().cloned());
                }
            }
        }
    }

    /// Closes the current transport, if any, and opens a new one.
    ///
    /// Picks up endpoint changes made in the store since the last
    /// `start()`. Safe to call whether or not the client is connected.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if another caller reconnected first
    /// - Any error of [`Client::start`]
    pub async fn restart(&self) -> Result<()> {
        let record = self.stop().await?;
        debug!(?record, "Restarting client");
        self.start().await
    }
}

// ============================================================================
// Client - Raw Frames
// ============================================================================

impl Client {
    /// Current transport handle.
    pub(crate) fn connection(&self) -> Option<Connection> {
        self.inner.connection.lock().clone()
    }

    /// Open transport, or the reason there is none.
    pub(crate) fn live_connection(&self) -> Result<Connection> {
        match self.connection() {
            Some(connection) if connection.is_open() => Ok(connection),
            Some(connection) => Err(Error::closed_or_not_connected(connection.close_record())),
            None => Err(Error::NotConnected),
        }
    }

    /// Writes one raw text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no transport was ever opened
    /// - [`Error::ConnectionClosed`] if the transport has closed
    pub async fn send(&self, frame: impl Into<String>) -> Result<()> {
        let connection = self.connection().ok_or(Error::NotConnected)?;
        connection.send(frame.into()).await
    }

    /// Returns the next inbound frame.
    ///
    /// Buffered frames are served first, even after the transport closed.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no transport was ever opened
    /// - [`Error::ConnectionClosed`] once the transport is closed and the
    ///   buffer is empty
    pub async fn receive(&self) -> Result<String> {
        let connection = self.connection().ok_or(Error::NotConnected)?;
        connection.receive().await
    }
}

// ============================================================================
// Tests
// ============================================================================
