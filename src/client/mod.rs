//! Cinema 4D client.
//!
//! The [`Client`] owns at most one live transport and exposes the typed
//! request/reply operations built on top of it.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Client struct, `start`/`stop` lifecycle, raw `send`/`receive` |
//! | `builder` | Fluent configuration builder |
//! | `operations` | Typed script, pid and install path operations |
//!
//! # Example
//!
//! ```ignore
//! let client = Client::builder().build()?;
//! client.start().await?;
//!
//! if let Some(pid) = client.get_pid().await? {
//!     println!("Cinema 4D runs as {pid}");
//! }
//!
//! client.execute_raw_script("print('hello')").await?;
//! client.stop().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod core;
mod operations;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
