//! Cinema 4D connector - async bridge between an editor and Cinema 4D.
//!
//! This library talks to the code exchange server embedded in a running
//! Cinema 4D over a single WebSocket, so scripts can be pushed to and
//! pulled from the host, executed there, and debugged.
//!
//! # Architecture
//!
//! The connector follows a client-server model:
//!
//! - **Local End (Rust)**: Sends commands, matches replies, observes pushes
//! - **Remote End (Cinema 4D)**: Runs scripts, answers queries, pushes
//!   script content and console output
//!
//! Key design principles:
//!
//! - One [`Client`] owns at most one live transport and its event loop
//! - Protocol uses prefixed action tags (`idea2c4d.*` out, `c4d2ide.*` in)
//! - No request ids: replies are matched FIFO by action tag, bounded by a
//!   [`ReplyPolicy`]
//! - Passive observers see every inbound frame without consuming it
//!
//! # Quick Start
//!
//! ```no_run
//! use c4d_connector::{Client, Result, ScriptDocument, ScriptUri};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder().build()?;
//!     client.start().await?;
//!
//!     let pid = client.get_pid().await?;
//!     println!("Cinema 4D pid: {pid:?}");
//!
//!     let doc = ScriptDocument::new(ScriptUri::untitled("Untitled-1"), "print('hi')");
//!     client.execute_in_host(&doc, false).await?;
//!
//!     client.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] lifecycle and typed operations |
//! | [`config`] | Endpoint, reply policy, configuration store |
//! | [`debug`] | Debugger attach configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | Editor collaborators and [`LocalWorkspace`] |
//! | [`paths`] | Script URIs and path normalization |
//! | [`protocol`] | WebSocket message types |
//! | [`status`] | Status indicator |
//! | [`templates`] | Script templates |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Cinema 4D client.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Client configuration and settings storage.
pub mod config;

/// Debugger attach configuration.
pub mod debug;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Editor-side collaborators.
pub mod host;

/// Script URIs and platform path normalization.
pub mod paths;

/// WebSocket protocol message types.
///
/// Defines the outbound command and inbound message vocabularies.
pub mod protocol;

/// Connection status indicator.
pub mod status;

/// Python script templates.
pub mod templates;

/// WebSocket transport layer.
///
/// Connection event loop, dispatch queue and close records.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder};

// Configuration types
pub use config::{ClientOptions, ConfigStore, Endpoint, MemoryConfigStore, ReplyPolicy};

// Debugging
pub use debug::AttachConfig;

// Error types
pub use error::{Error, Result};

// Collaborators
pub use host::{
    ConsoleSink, ContentOrigin, ContentSink, LocalWorkspace, Notifier, ScriptDocument,
    ScriptSource, TracingConsole, report_error,
};

// Paths
pub use paths::{ContentTarget, Platform, Scheme, ScriptUri, normalize_path};

// Protocol types
pub use protocol::{Command, HostMessage, ScriptContent};

// Status
pub use status::{StatusIndicator, StatusSnapshot};

// Templates
pub use templates::{
    BUNDLED_TEMPLATE_DIR, TemplateItem, list_templates, load_template, resolve_template_dir,
};

// Transport types
pub use transport::{CloseRecord, ConnectionEvent, ConnectionState};
