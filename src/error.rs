//! Error types for the Cinema 4D connector.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use c4d_connector::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.start().await?;
//!     client.execute_raw_script("print('hello')").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::AlreadyConnected`], [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::UnsupportedScheme`], [`Error::ProtocolTimeout`] |
//! | Tooling | [`Error::Debugger`], [`Error::Template`] |
//! | User | [`Error::Cancelled`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::CloseRecord;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options or stored settings are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the host refuses or resets the connection.
    #[error("Connection failed: {message}")]
    Connection {
        /// Human-readable diagnostic.
        message: String,
    },

    /// `start()` called while a transport is already live.
    #[error("Already connected")]
    AlreadyConnected,

    /// Operation attempted without a live transport.
    #[error("Not connected")]
    NotConnected,

    /// The transport closed; carries the terminal close event.
    #[error("Connection closed: {0}")]
    ConnectionClosed(CloseRecord),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Document or path scheme outside the accepted set.
    #[error("Unsupported file scheme: {scheme}, only {accepted} is supported")]
    UnsupportedScheme {
        /// The rejected scheme (or raw script path).
        scheme: String,
        /// Human-readable list of accepted schemes.
        accepted: String,
    },

    /// Reply budget exhausted for an operation that requires a reply.
    #[error("No reply to {operation} after {attempts} frames")]
    ProtocolTimeout {
        /// Operation that gave up.
        operation: String,
        /// Number of frames inspected.
        attempts: usize,
    },

    // ========================================================================
    // Tooling Errors
    // ========================================================================
    /// Debugger attach configuration could not be resolved.
    #[error("{message}")]
    Debugger {
        /// Description of the missing piece.
        message: String,
    },

    /// Script template lookup failed.
    #[error("{message}")]
    Template {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // User Errors
    // ========================================================================
    /// User-initiated cancellation. Never shown to the user.
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URI parse error.
    #[error("Invalid URI: {0}")]
    Url(#[from] url::ParseError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates the diagnostic for a refused connection.
    ///
    /// Local hosts only mention the port; remote hosts mention both.
    pub fn connection_refused(host: &str, port: u16) -> Self {
        let mut message = String::from("Failed to Connect to Cinema 4D");
        if host == "localhost" || host == "127.0.0.1" {
            message.push_str(&format!(", with port: {port}"));
        } else {
            message.push_str(&format!(", with IP: {host} and port: {port}"));
        }
        Self::Connection { message }
    }

    /// Creates an unsupported scheme error.
    #[inline]
    pub fn unsupported_scheme(scheme: impl Into<String>, accepted: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
            accepted: accepted.into(),
        }
    }

    /// Creates a protocol timeout error.
    #[inline]
    pub fn protocol_timeout(operation: impl Into<String>, attempts: usize) -> Self {
        Self::ProtocolTimeout {
            operation: operation.into(),
            attempts,
        }
    }

    /// Creates a debugger error.
    #[inline]
    pub fn debugger(message: impl Into<String>) -> Self {
        Self::Debugger {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[inline]
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Rejection used when the transport is gone.
    ///
    /// Prefers the last close record when one exists.
    #[inline]
    pub fn closed_or_not_connected(record: Option<CloseRecord>) -> Self {
        match record {
            Some(record) => Self::ConnectionClosed(record),
            None => Self::NotConnected,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a reply timeout.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ProtocolTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::AlreadyConnected
                | Self::NotConnected
                | Self::ConnectionClosed(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` for user-initiated cancellation.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the close record if this error was caused by a closed transport.
    #[inline]
    #[must_use]
    pub fn close_record(&self) -> Option<&CloseRecord> {
        match self {
            Self::ConnectionClosed(record) => Some(record),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
