//! Lifecycle and push events broadcast to passive observers.

use crate::protocol::ScriptContent;

use super::CloseRecord;

/// Event published on the client's event stream.
///
/// Observers such as a status indicator subscribe once and keep their
/// subscription across reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Transport opened.
    Open {
        /// Connection string of the endpoint.
        url: String,
    },
    /// Transport closed.
    Close(CloseRecord),
    /// Connection attempt or transport failed.
    Error(String),
    /// Host pushed script content.
    ContentUpdate(ScriptContent),
    /// Host console output.
    Console(String),
}
