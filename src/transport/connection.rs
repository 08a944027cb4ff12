//! WebSocket connection and event loop.
//!
//! This module owns one live transport to the Cinema 4D code exchange
//! server, the dispatch queue of that transport, and the passive
//! observers that watch every inbound frame.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the host (routed through the dispatch queue)
//! - Passive observation of content updates and console output
//!
//! Content updates are applied by a second task, one per transport, in
//! the order the host pushed them.
//! - Outgoing frames from the client API
//! - The close handshake, and settling every pending receiver on close

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::host::{ConsoleSink, ContentOrigin, ContentSink};
use crate::protocol::{HostMessage, ScriptContent};

use super::dispatch::{Claim, Delivery, DispatchQueue};
use super::{CloseRecord, ConnectionEvent, ConnectionState};

// ============================================================================
// Constants
// ============================================================================

/// WebSocket sub-protocol spoken by the host.
pub const SUBPROTOCOL: &str = "c4d_py_code_exchange";

/// Time allowed for the host to answer our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Concrete WebSocket stream type.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Shared lifecycle state, owned by the client and updated by the loop.
pub(crate) type SharedState = Arc<watch::Sender<ConnectionState>>;

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write one text frame.
    Send {
        frame: String,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Start the close handshake.
    Shutdown,
}

// ============================================================================
// Observers
// ============================================================================

/// Passive subscribers attached to every transport the client opens.
///
/// They see each inbound frame but never take it away from the
/// dispatch queue.
#[derive(Clone)]
pub(crate) struct Observers {
    pub(crate) content: Arc<dyn ContentSink>,
    pub(crate) console: Arc<dyn ConsoleSink>,
    pub(crate) events: broadcast::Sender<ConnectionEvent>,
}

impl Observers {
    /// Inspects one inbound frame.
    ///
    /// Content updates are queued on `updates`; console output is
    /// forwarded inline.
    fn observe(&self, frame: &str, updates: &mpsc::UnboundedSender<ScriptContent>) {
        match HostMessage::parse(frame) {
            Some(HostMessage::ScriptContent(update)) => {
                debug!(script_path = %update.script_path, "Content update pushed by host");
                let _ = self
                    .events
                    .send(ConnectionEvent::ContentUpdate(update.clone()));
                let _ = updates.send(update);
            }
            Some(HostMessage::Console(text)) => {
                self.console.append(&text);
                let _ = self.events.send(ConnectionEvent::Console(text));
            }
            _ => {}
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One live WebSocket transport to the host.
///
/// Cloning yields another handle to the same transport.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Dispatch queue (shared with event loop).
    queue: Arc<Mutex<DispatchQueue>>,
    /// Set once a close has been requested.
    closing: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a transport to `endpoint` and spawns its event loop.
    ///
    /// `on_open` receives the new handle first. Only then is the shared
    /// state set to [`ConnectionState::Open`] and [`ConnectionEvent::Open`]
    /// published, all before the first frame can be read. Anyone who
    /// observes `Open` can therefore reach the handle.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] with a "Failed to Connect" diagnostic if
    ///   the host refused the connection
    /// - [`Error::Connection`] for any other handshake failure
    pub(crate) async fn connect(
        endpoint: &Endpoint,
        state: SharedState,
        observers: Observers,
        on_open: impl FnOnce(&Self),
    ) -> Result<Self> {
        let url = endpoint.ws_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::connection(format!("Invalid endpoint {url}: {e}")))?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Self::classify_connect_error(endpoint, e))?;

        info!(%url, "WebSocket connection established");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Mutex::new(DispatchQueue::new()));
        let connection = Self {
            command_tx,
            queue: Arc::clone(&queue),
            closing: Arc::new(AtomicBool::new(false)),
        };

        on_open(&connection);
        state.send_replace(ConnectionState::Open);
        let _ = observers.events.send(ConnectionEvent::Open { url });

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_content_applier(
            Arc::clone(&observers.content),
            updates_rx,
        ));
        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            updates_tx,
            queue,
            state,
            observers,
        ));

        Ok(connection)
    }

    /// Maps a handshake failure to a user-facing error.
    fn classify_connect_error(endpoint: &Endpoint, err: WsError) -> Error {
        match err {
            WsError::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                warn!(host = %endpoint.host, port = endpoint.port, "Connection refused");
                Error::connection_refused(&endpoint.host, endpoint.port)
            }
            other => {
                warn!(error = %other, "WebSocket handshake failed");
                Error::connection(other.to_string())
            }
        }
    }

    /// Returns `true` until the transport closes or a close is requested.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closing.load(Ordering::Acquire) && self.queue.lock().is_open()
    }

    /// Close record, once the transport has closed.
    #[must_use]
    pub fn close_record(&self) -> Option<CloseRecord> {
        self.queue.lock().close_record().cloned()
    }

    /// Number of callers waiting for a frame.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.lock().pending_len()
    }

    /// Number of frames nobody has claimed yet.
    #[inline]
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.queue.lock().buffered_len()
    }

    /// Writes one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the transport has closed
    /// - [`Error::WebSocket`] if the write fails
    pub async fn send(&self, frame: String) -> Result<()> {
        if let Some(record) = self.close_record() {
            return Err(Error::ConnectionClosed(record));
        }

        let (ack, ack_rx) = oneshot::channel();
        self.command_tx
            .send(ConnectionCommand::Send { frame, ack })
            .map_err(|_| Error::closed_or_not_connected(self.close_record()))?;

        ack_rx.await?
    }

    /// Returns the next inbound frame.
    ///
    /// Buffered frames are served first. Otherwise the caller waits for
    /// the next frame, or is rejected when the transport closes.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the transport is or becomes closed
    pub async fn receive(&self) -> Result<String> {
        let claim = self.queue.lock().claim();
        match claim {
            Claim::Ready(frame) => Ok(frame),
            Claim::Rejected(e) => Err(e),
            Claim::Wait(rx) => rx.await?,
        }
    }

    /// Asks the event loop to close the transport.
    ///
    /// Completion is observable through the shared state.
    pub fn shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        updates: mpsc::UnboundedSender<ScriptContent>,
        queue: Arc<Mutex<DispatchQueue>>,
        state: SharedState,
        observers: Observers,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut close_deadline: Option<Instant> = None;

        let record = loop {
            tokio::select! {
                // Incoming frames from the host
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_frame(text.as_str().to_owned(), &queue, &observers, &updates);
                        }

                        Some(Ok(Message::Binary(data))) => {
                            let text = String::from_utf8_lossy(&data).into_owned();
                            Self::handle_incoming_frame(text, &queue, &observers, &updates);
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let record = frame
                                .map(|cf| CloseRecord::new(cf.code.into(), cf.reason.as_str()))
                                .unwrap_or_else(CloseRecord::no_status);
                            debug!(code = record.code, "WebSocket closed by remote");
                            break record;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            let _ = observers.events.send(ConnectionEvent::Error(e.to_string()));
                            break CloseRecord::abnormal(e.to_string());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break CloseRecord::abnormal("stream ended");
                        }

                        // Ignore Ping, Pong, raw frames
                        _ => {}
                    }
                }

                // Commands from the client API
                command = command_rx.recv(), if close_deadline.is_none() => {
                    match command {
                        Some(ConnectionCommand::Send { frame, ack }) => {
                            trace!(len = frame.len(), "Sending frame");
                            let result = ws_write
                                .send(Message::Text(frame.into()))
                                .await
                                .map_err(Error::from);
                            let _ = ack.send(result);
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: Utf8Bytes::from_static(""),
                            };
                            if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                                warn!(error = %e, "Failed to send close frame");
                                break CloseRecord::abnormal(e.to_string());
                            }
                            close_deadline = Some(Instant::now() + CLOSE_GRACE);
                        }

                        None => {
                            debug!("Command channel closed");
                            break CloseRecord::abnormal("client dropped");
                        }
                    }
                }

                // Host never answered the close frame
                _ = async {
                    match close_deadline {
                        Some(deadline) => sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                }, if close_deadline.is_some() => {
                    warn!("Close handshake timed out");
                    break CloseRecord::abnormal("close handshake timed out");
                }
            }
        };

        // Flush a queued close reply and release the socket.
        let _ = timeout(CLOSE_GRACE, ws_write.close()).await;

        Self::finish(record, &mut command_rx, &queue, &state, &observers);
    }

    /// Handles one inbound frame: observers first, then routing.
    fn handle_incoming_frame(
        frame: String,
        queue: &Arc<Mutex<DispatchQueue>>,
        observers: &Observers,
        updates: &mpsc::UnboundedSender<ScriptContent>,
    ) {
        observers.observe(&frame, updates);

        let delivery = queue.lock().deliver(frame);
        match delivery {
            Delivery::Resolved => trace!("Frame handed to pending receiver"),
            Delivery::Buffered => trace!("Frame buffered"),
        }
    }

    /// Applies pushed content one update at a time, in arrival order.
    ///
    /// Ends once the event loop is gone and the backlog is written.
    async fn run_content_applier(
        sink: Arc<dyn ContentSink>,
        mut updates: mpsc::UnboundedReceiver<ScriptContent>,
    ) {
        while let Some(update) = updates.recv().await {
            if let Err(e) = sink.apply(&update, ContentOrigin::Push).await {
                warn!(error = %e, script_path = %update.script_path, "Failed to apply content update");
            }
        }
        trace!("Content applier finished");
    }

    /// Settles everything that still waits on this transport.
    fn finish(
        record: CloseRecord,
        command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
        queue: &Arc<Mutex<DispatchQueue>>,
        state: &SharedState,
        observers: &Observers,
    ) {
        let rejected = queue.lock().close(record.clone());

        command_rx.close();
        while let Ok(command) = command_rx.try_recv() {
            if let ConnectionCommand::Send { ack, .. } = command {
                let _ = ack.send(Err(Error::ConnectionClosed(record.clone())));
            }
        }

        state.send_replace(ConnectionState::Closed(record.clone()));
        let _ = observers.events.send(ConnectionEvent::Close(record.clone()));

        info!(code = record.code, rejected, "Connection closed");
    }
}

// ============================================================================
// Tests
// ============================================================================
