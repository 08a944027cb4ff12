//! WebSocket protocol message types.
//!
//! This module defines the message vocabulary exchanged between the
//! editor and the Cinema 4D code exchange server.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Command`] | Editor → Host | Queries and pushes |
//! | [`HostMessage`] | Host → Editor | Replies and unsolicited pushes |
//!
//! Frames are single JSON objects with an `action` field. Outbound tags
//! are prefixed `idea2c4d.`, inbound tags `c4d2ide.`. There is no request
//! id: replies are matched by action tag only.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound commands |
//! | `message` | Inbound messages and lenient parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command definitions.
pub mod command;

/// Inbound message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, INLINE_SCRIPT_PATH};
pub use message::{HostAction, HostMessage, ScriptContent};
