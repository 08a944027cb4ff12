//! Connection state and close records.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the peer sent no status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code for a transport that died without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// CloseRecord
// ============================================================================

/// Terminal close event of a transport.
///
/// Every pending and later receive attempt is rejected with this record
/// until the next `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRecord {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseRecord {
    /// Creates a new close record.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close frame without a status code.
    #[inline]
    #[must_use]
    pub fn no_status() -> Self {
        Self::new(CLOSE_NO_STATUS, "")
    }

    /// Transport lost without a close handshake.
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Returns `true` for a normal closure.
    #[inline]
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}

impl fmt::Display for CloseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {} ({})", self.code, self.reason)
        }
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never started.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Transport open.
    Open,
    /// Close requested, waiting for the close event.
    Closing,
    /// Transport closed.
    Closed(CloseRecord),
}

impl ConnectionState {
    /// Returns `true` if `start()` may proceed from this state.
    #[inline]
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed(_))
    }

    /// Returns `true` if the transport is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once no transport is live.
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed(_))
    }

    /// Close record of a closed connection.
    #[inline]
    #[must_use]
    pub fn close_record(&self) -> Option<&CloseRecord> {
        match self {
            Self::Closed(record) => Some(record),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
