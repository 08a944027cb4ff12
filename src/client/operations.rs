//! Typed request/reply operations.
//!
//! The host sends no correlation ids, so a query is answered by the
//! first inbound frame that parses to the expected reply. Unrelated
//! frames are discarded until the [`ReplyPolicy`](crate::ReplyPolicy)
//! runs out of attempts or time, which yields `None` rather than an
//! error.

// ============================================================================
// Imports
// ============================================================================

use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::host::{ContentOrigin, ScriptDocument};
use crate::paths::ScriptUri;
use crate::protocol::{Command, HostMessage};
use crate::transport::Connection;

use super::Client;

// ============================================================================
// Client - Queries
// ============================================================================

impl Client {
    /// Fetches the content of a script from the host.
    ///
    /// Returns `Ok(None)` when not connected or when no reply matched.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the connection drops mid-exchange.
    pub async fn get_script_content(&self, uri: &ScriptUri) -> Result<Option<String>> {
        if !self.is_connected() {
            debug!(%uri, "Not connected, skipping script content query");
            return Ok(None);
        }

        let command = Command::GetScriptContent {
            script_path: uri.query_path(self.platform()),
        };
        self.query(command, |message| match message {
            HostMessage::ScriptContent(content) => Some(content.value),
            _ => None,
        })
        .await
    }

    /// Fetches the process id of the host.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] / [`Error::ConnectionClosed`] without a transport
    pub async fn get_pid(&self) -> Result<Option<u32>> {
        self.query(Command::GetPid, |message| match message {
            HostMessage::ProcessId(pid) => Some(pid),
            _ => None,
        })
        .await
    }

    /// Fetches the installation directory of the host.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] / [`Error::ConnectionClosed`] without a transport
    pub async fn get_install_path(&self) -> Result<Option<String>> {
        self.query(Command::GetPath, |message| match message {
            HostMessage::InstallPath(path) => Some(path),
            _ => None,
        })
        .await
    }

    /// Sends `command` and waits for the first frame `matcher` accepts.
    async fn query<T>(
        &self,
        command: Command,
        matcher: impl Fn(HostMessage) -> Option<T>,
    ) -> Result<Option<T>> {
        let connection = self.live_connection()?;
        let operation = command.action();

        let _exchange = self.inner.exchange.lock().await;
        connection.send(command.to_frame()?).await?;

        let policy = self.inner.policy;
        let search = async {
            for attempt in 1..=policy.max_attempts {
                let frame = connection.receive().await?;
                if let Some(value) = HostMessage::parse(&frame).and_then(&matcher) {
                    debug!(operation, attempt, "Reply matched");
                    return Ok(Some(value));
                }
                trace!(operation, attempt, "Discarding non-matching frame");
            }
            Ok::<_, Error>(None)
        };

        let outcome = match timeout(policy.deadline, search).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(operation, deadline = ?policy.deadline, "Reply deadline elapsed");
                None
            }
        };

        if outcome.is_none() {
            warn!(operation, attempts = policy.max_attempts, "No matching reply");
        }
        Ok(outcome)
    }
}

// ============================================================================
// Client - Pushes
// ============================================================================

impl Client {
    /// Overwrites a script in the host.
    ///
    /// When `content` is `None` the saved content of `uri` is read from
    /// the script source.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] unless `uri` is `c4dfs` or `file`,
    ///   checked before anything else
    /// - [`Error::NotConnected`] / [`Error::ConnectionClosed`] without a transport
    pub async fn set_script_content(&self, uri: &ScriptUri, content: Option<String>) -> Result<()> {
        let script_path = uri.push_path(self.platform())?;
        let connection = self.live_connection()?;

        let value = match content {
            Some(value) => value,
            None => self.inner.source.read(uri).await?,
        };

        debug!(%script_path, len = value.len(), "Pushing script content");
        connection
            .send(Command::SetScriptContent { script_path, value }.to_frame()?)
            .await
    }

    /// Opens a document in the host's script manager.
    ///
    /// An untitled document gets a persistent location in the host, which
    /// answers with one or more content updates. Each one focuses the
    /// document and is applied to the content sink; the number forwarded
    /// is returned. Other documents return `0` right after the send.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] / [`Error::ConnectionClosed`] without a transport
    /// - [`Error::UnsupportedScheme`] outside `file`, `c4dfs`, `untitled`
    /// - [`Error::ProtocolTimeout`] if an untitled document got no update
    pub async fn load_in_script_manager(&self, doc: &ScriptDocument) -> Result<usize> {
        let connection = self.live_connection()?;
        let command = Command::LoadInScriptManager {
            script_path: doc.uri.document_path(self.platform())?,
            value: doc.text.clone(),
        };
        let operation = command.action();

        if !doc.is_untitled() {
            connection.send(command.to_frame()?).await?;
            return Ok(0);
        }

        let _exchange = self.inner.exchange.lock().await;
        connection.send(command.to_frame()?).await?;

        let forwarded = self.forward_script_updates(&connection, doc).await?;
        if forwarded == 0 {
            return Err(Error::protocol_timeout(operation, self.inner.policy.max_attempts));
        }
        debug!(uri = %doc.uri, forwarded, "Script manager assigned content");
        Ok(forwarded)
    }

    /// Forwards every content update seen within the reply budget.
    async fn forward_script_updates(
        &self,
        connection: &Connection,
        doc: &ScriptDocument,
    ) -> Result<usize> {
        let policy = self.inner.policy;
        let mut forwarded = 0;

        let search = async {
            for attempt in 1..=policy.max_attempts {
                let frame = connection.receive().await?;
                let Some(HostMessage::ScriptContent(update)) = HostMessage::parse(&frame) else {
                    trace!(attempt, "Discarding non-content frame");
                    continue;
                };
                self.inner.content.focus(&doc.uri).await?;
                self.inner
                    .content
                    .apply(&update, ContentOrigin::ScriptManager)
                    .await?;
                forwarded += 1;
            }
            Ok::<_, Error>(())
        };

        let outcome = timeout(policy.deadline, search).await;
        match outcome {
            Ok(Ok(())) | Err(_) => {}
            Ok(Err(e)) if forwarded == 0 => return Err(e),
            Ok(Err(e)) => warn!(error = %e, forwarded, "Update stream ended early"),
        }
        Ok(forwarded)
    }

    /// Runs a document in the host.
    ///
    /// Does nothing when not connected.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] outside `file`, `c4dfs`, `untitled`
    /// - transport errors from the send
    pub async fn execute_in_host(&self, doc: &ScriptDocument, debug: bool) -> Result<()> {
        let Ok(connection) = self.live_connection() else {
            debug!(uri = %doc.uri, "Not connected, skipping execute");
            return Ok(());
        };

        let command = Command::Execute {
            script_path: doc.uri.document_path(self.platform())?,
            value: doc.text.clone(),
            debug,
        };
        let in_debugger = debug;
        debug!(uri = %doc.uri, in_debugger, "Executing document");
        connection.send(command.to_frame()?).await
    }

    /// Runs an inline script body in the host.
    ///
    /// Does nothing when not connected.
    ///
    /// # Errors
    ///
    /// Transport errors from the send.
    pub async fn execute_raw_script(&self, script: &str) -> Result<()> {
        let Ok(connection) = self.live_connection() else {
            debug!("Not connected, skipping inline execute");
            return Ok(());
        };
        connection
            .send(Command::execute_inline(script).to_frame()?)
            .await
    }

    /// Asks the host for its workspace.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] / [`Error::ConnectionClosed`] without a transport
    pub async fn request_workspace(&self) -> Result<()> {
        let connection = self.live_connection()?;
        connection.send(Command::GetWorkspace.to_frame()?).await
    }
}

// ============================================================================
// Tests
// ============================================================================
