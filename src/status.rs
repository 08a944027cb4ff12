//! Connection status indicator.
//!
//! [`StatusIndicator`] follows a client's event stream and keeps a
//! [`StatusSnapshot`] that a status bar can render.
//!
//! # Example
//!
//! ```ignore
//! let indicator = StatusIndicator::attach(&client);
//! client.start().await?;
//!
//! let status = indicator.snapshot();
//! println!("{} ({})", status.text, status.tooltip);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::Result;
use crate::transport::ConnectionEvent;

// ============================================================================
// Constants
// ============================================================================

/// Text shown while connected.
pub const CONNECTED_TEXT: &str = "C4D \u{2713}";

/// Text shown while disconnected.
pub const DISCONNECTED_TEXT: &str = "C4D X";

/// Tooltip shown while disconnected.
pub const DISCONNECTED_TOOLTIP: &str = "Not connected to any Cinema 4D instance";

// ============================================================================
// StatusSnapshot
// ============================================================================

/// What the status bar item should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Whether a transport is open.
    pub connected: bool,
    /// Item text.
    pub text: String,
    /// Item tooltip.
    pub tooltip: String,
}

impl StatusSnapshot {
    /// Connected state for `conn_string`.
    #[must_use]
    pub fn connected(conn_string: &str) -> Self {
        Self {
            connected: true,
            text: CONNECTED_TEXT.to_string(),
            tooltip: format!("Connected to: {conn_string}"),
        }
    }

    /// Disconnected state.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            text: DISCONNECTED_TEXT.to_string(),
            tooltip: DISCONNECTED_TOOLTIP.to_string(),
        }
    }

    /// Snapshot matching the client's current state.
    #[must_use]
    pub fn of(client: &Client) -> Self {
        if client.is_connected() {
            Self::connected(&client.conn_string())
        } else {
            Self::disconnected()
        }
    }

    /// Applies one event; content and console events leave it unchanged.
    pub fn on_event(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Open { url } => *self = Self::connected(url),
            ConnectionEvent::Close(_) | ConnectionEvent::Error(_) => *self = Self::disconnected(),
            ConnectionEvent::ContentUpdate(_) | ConnectionEvent::Console(_) => {}
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::disconnected()
    }
}

// ============================================================================
// StatusIndicator
// ============================================================================

/// Live status of one client.
///
/// The subscription survives reconnects; dropping the indicator stops it.
#[derive(Debug)]
pub struct StatusIndicator {
    client: Client,
    snapshot: Arc<Mutex<StatusSnapshot>>,
    task: JoinHandle<()>,
}

impl StatusIndicator {
    /// Subscribes to `client` and tracks its status.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn attach(client: &Client) -> Self {
        let mut events = client.subscribe();
        let snapshot = Arc::new(Mutex::new(StatusSnapshot::of(client)));

        let task = {
            let client = client.clone();
            let snapshot = Arc::clone(&snapshot);
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => snapshot.lock().on_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Status indicator lagged, resyncing");
                            *snapshot.lock() = StatusSnapshot::of(&client);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                debug!("Status indicator stopped");
            })
        };

        Self {
            client: client.clone(),
            snapshot,
            task,
        }
    }

    /// Current status.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.lock().clone()
    }

    /// Stops the client when connected, starts it otherwise.
    ///
    /// # Errors
    ///
    /// Errors of [`Client::start`] or [`Client::stop`].
    pub async fn toggle(&self) -> Result<()> {
        if self.snapshot().connected {
            self.client.stop().await.map(drop)
        } else {
            self.client.start().await
        }
    }
}

impl Drop for StatusIndicator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
