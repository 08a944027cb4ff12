//! Test doubles: a loopback Cinema 4D host and recording collaborators.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing_subscriber::EnvFilter;

use crate::config::Endpoint;
use crate::error::Result;
use crate::host::{ConsoleSink, ContentOrigin, ContentSink, Notifier};
use crate::paths::ScriptUri;
use crate::protocol::ScriptContent;
use crate::transport::SUBPROTOCOL;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for anything a test waits on.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Logging
// ============================================================================

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// MockHost
// ============================================================================

enum HostCommand {
    Push(String),
    Close(u16, String),
}

/// Loopback WebSocket server accepting a single client.
pub(crate) struct MockHost {
    port: u16,
    frames_rx: mpsc::UnboundedReceiver<String>,
    commands_tx: mpsc::UnboundedSender<HostCommand>,
    task: JoinHandle<()>,
}

impl MockHost {
    /// Binds to a random localhost port and waits for one client.
    pub(crate) async fn bind() -> Self {
        init_tracing();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind mock host");
        let port = listener.local_addr().expect("local addr").port();

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::serve(listener, frames_tx, commands_rx));

        Self {
            port,
            frames_rx,
            commands_tx,
            task,
        }
    }

    async fn serve(
        listener: TcpListener,
        frames_tx: mpsc::UnboundedSender<String>,
        mut commands_rx: mpsc::UnboundedReceiver<HostCommand>,
    ) {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };

        let callback = |_request: &Request, mut response: Response| {
            response
                .headers_mut()
                .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
            Ok(response)
        };
        let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
            return;
        };

        let mut commands_open = true;
        loop {
            tokio::select! {
                message = ws.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = frames_tx.send(text.as_str().to_owned());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                },
                command = commands_rx.recv(), if commands_open => match command {
                    Some(HostCommand::Push(frame)) => {
                        let _ = ws.send(Message::Text(frame.into())).await;
                    }
                    Some(HostCommand::Close(code, reason)) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        let _ = ws.send(Message::Close(Some(frame))).await;
                    }
                    None => commands_open = false,
                },
            }
        }
    }

    /// Port the mock host listens on.
    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Endpoint pointing at this host.
    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.port)
    }

    /// Sends a raw text frame to the client.
    pub(crate) fn push(&self, frame: impl Into<String>) {
        let _ = self.commands_tx.send(HostCommand::Push(frame.into()));
    }

    /// Sends a JSON frame to the client.
    pub(crate) fn push_json(&self, value: Value) {
        self.push(value.to_string());
    }

    /// Starts a close handshake from the host side.
    pub(crate) fn close(&self, code: u16, reason: &str) {
        let _ = self
            .commands_tx
            .send(HostCommand::Close(code, reason.to_string()));
    }

    /// Next frame written by the client, parsed as JSON.
    pub(crate) async fn next_frame(&mut self) -> Value {
        let frame = timeout(TEST_TIMEOUT, self.frames_rx.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("mock host stopped");
        serde_json::from_str(&frame).expect("client frame is JSON")
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Returns a localhost port with nothing listening on it.
pub(crate) async fn refused_port() -> u16 {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = TcpListener::bind(addr).await.expect("bind probe");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

/// Polls `condition` until it holds, failing the test after a timeout.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(TEST_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// ============================================================================
// Recording Collaborators
// ============================================================================

/// Content sink that remembers every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    applied: Mutex<Vec<(ScriptContent, ContentOrigin)>>,
    focused: Mutex<Vec<ScriptUri>>,
}

impl RecordingSink {
    pub(crate) fn applied_from(&self, origin: ContentOrigin) -> Vec<ScriptContent> {
        self.applied
            .lock()
            .iter()
            .filter(|(_, o)| *o == origin)
            .map(|(update, _)| update.clone())
            .collect()
    }

    pub(crate) fn focused(&self) -> Vec<ScriptUri> {
        self.focused.lock().clone()
    }
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn apply(&self, update: &ScriptContent, origin: ContentOrigin) -> Result<()> {
        self.applied.lock().push((update.clone(), origin));
        Ok(())
    }

    async fn focus(&self, uri: &ScriptUri) -> Result<()> {
        self.focused.lock().push(uri.clone());
        Ok(())
    }
}

/// Console sink that remembers every chunk.
#[derive(Debug, Default)]
pub(crate) struct RecordingConsole {
    lines: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ConsoleSink for RecordingConsole {
    fn append(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Notifier that remembers every message.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
