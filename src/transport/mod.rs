//! WebSocket transport layer.
//!
//! This module handles the single duplex connection between the editor
//! (Rust) and the Cinema 4D code exchange server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)   │                              │  Cinema 4D      │
//! │                  │         WebSocket            │                 │
//! │  Connection      │◄────────────────────────────►│  Code exchange  │
//! │  → DispatchQueue │   c4d_py_code_exchange       │  server         │
//! │  → Observers     │   ws://127.0.0.1:7788        │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Frame Routing
//!
//! Every inbound frame is shown to the passive observers (content
//! updates, console output) and then routed by the [`DispatchQueue`]:
//! to the oldest pending receiver, or into the buffer.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `dispatch` | Pending-receiver and buffered-frame FIFOs |
//! | `event` | Events broadcast to observers |
//! | `state` | Connection state and close records |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Inbound dispatch queue.
pub mod dispatch;

/// Observer events.
pub mod event;

/// Connection state and close records.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, SUBPROTOCOL};
pub use dispatch::{Claim, Delivery, DispatchQueue};
pub use event::ConnectionEvent;
pub use state::{CloseRecord, ConnectionState};
