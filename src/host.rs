//! Editor-side collaborators.
//!
//! The client never touches the editor directly. It reads documents
//! through a [`ScriptSource`], hands pushed content to a [`ContentSink`],
//! appends console output to a [`ConsoleSink`], and surfaces errors
//! through [`report_error`].
//!
//! [`LocalWorkspace`] is a self-contained implementation: `c4dfs:`
//! scripts live in memory, `file:` scripts on disk.

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::paths::{ContentTarget, Platform, Scheme, ScriptUri};
use crate::protocol::ScriptContent;

// ============================================================================
// ScriptDocument
// ============================================================================

/// An editor document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDocument {
    /// Document URI.
    pub uri: ScriptUri,
    /// Current buffer text.
    pub text: String,
    /// Buffer differs from what is saved.
    pub is_dirty: bool,
}

impl ScriptDocument {
    /// Creates a clean document.
    #[inline]
    #[must_use]
    pub fn new(uri: ScriptUri, text: impl Into<String>) -> Self {
        Self {
            uri,
            text: text.into(),
            is_dirty: false,
        }
    }

    /// Marks the buffer as modified.
    #[inline]
    #[must_use]
    pub fn dirty(mut self) -> Self {
        self.is_dirty = true;
        self
    }

    /// Returns `true` for unsaved `untitled:` buffers.
    #[inline]
    #[must_use]
    pub fn is_untitled(&self) -> bool {
        self.uri.scheme() == &Scheme::Untitled
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Why content reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    /// Unsolicited push seen by the passive observer.
    Push,
    /// Reply to `load_in_script_manager` for an untitled buffer.
    ScriptManager,
}

/// Receives script content pushed by the host.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Writes the content to its target and opens it.
    async fn apply(&self, update: &ScriptContent, origin: ContentOrigin) -> Result<()>;

    /// Brings a document to the front.
    async fn focus(&self, uri: &ScriptUri) -> Result<()> {
        debug!(%uri, "Focus requested");
        Ok(())
    }
}

/// Reads saved document content.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// Returns the saved content of `uri`.
    async fn read(&self, uri: &ScriptUri) -> Result<String>;
}

/// Receives host console output.
pub trait ConsoleSink: Send + Sync {
    /// Appends a chunk of console text.
    fn append(&self, text: &str);
}

/// Shows error messages to the user.
pub trait Notifier: Send + Sync {
    /// Displays one message.
    fn show_error(&self, message: &str);
}

// ============================================================================
// Error Funnel
// ============================================================================

/// Shows `err` to the user unless it is a cancellation.
pub fn report_error(notifier: &dyn Notifier, err: &Error) {
    if err.is_cancelled() {
        debug!("Operation cancelled by user");
        return;
    }
    warn!(error = %err, "Reporting error");
    notifier.show_error(&err.to_string());
}

// ============================================================================
// TracingConsole
// ============================================================================

/// Console sink that forwards host output to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn append(&self, text: &str) {
        info!(target: "c4d_console", "{}", text.trim_end());
    }
}

// ============================================================================
// LocalWorkspace
// ============================================================================

/// In-process content sink and script source.
#[derive(Debug)]
pub struct LocalWorkspace {
    platform: Platform,
    virtual_scripts: Mutex<FxHashMap<String, String>>,
}

impl Default for LocalWorkspace {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl LocalWorkspace {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            virtual_scripts: Mutex::new(FxHashMap::default()),
        }
    }

    /// Content of a `c4dfs:` script, if known.
    #[must_use]
    pub fn virtual_script(&self, path: &str) -> Option<String> {
        self.virtual_scripts.lock().get(path).cloned()
    }

    /// Stores a `c4dfs:` script.
    pub fn put_virtual_script(&self, path: impl Into<String>, content: impl Into<String>) {
        self.virtual_scripts
            .lock()
            .insert(path.into(), content.into());
    }

    /// Number of `c4dfs:` scripts held.
    #[must_use]
    pub fn virtual_count(&self) -> usize {
        self.virtual_scripts.lock().len()
    }
}

#[async_trait]
impl ContentSink for LocalWorkspace {
    async fn apply(&self, update: &ScriptContent, origin: ContentOrigin) -> Result<()> {
        match update.target(self.platform)? {
            ContentTarget::Virtual(uri) => {
                self.put_virtual_script(uri.path(), update.value.as_str());
                debug!(%uri, ?origin, "Stored script manager content");
            }
            ContentTarget::File(path) => {
                tokio::fs::write(&path, update.value.as_bytes()).await?;
                debug!(path = %path.display(), ?origin, "Wrote script content to disk");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ScriptSource for LocalWorkspace {
    async fn read(&self, uri: &ScriptUri) -> Result<String> {
        match uri.scheme() {
            Scheme::Virtual => self.virtual_script(uri.path()).ok_or_else(|| {
                Error::Io(IoError::new(
                    ErrorKind::NotFound,
                    format!("No script at {uri}"),
                ))
            }),
            Scheme::File => {
                let path = uri
                    .fs_path(self.platform)
                    .ok_or_else(|| Error::unsupported_scheme(uri.scheme().as_str(), "file"))?;
                Ok(tokio::fs::read_to_string(path).await?)
            }
            other => Err(Error::unsupported_scheme(other.as_str(), "c4dfs or file")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
