//! Peer Transports
//!
//! A [`Transport`] carries [`PeerMessage`]s to the other peer. Sending never
//! blocks the simulation: frames are queued to a writer task. Incoming frames
//! are decoded by a reader task and written into the [`Inbox`] handed out at
//! construction.
//!
//! - [`LoopbackTransport`]: in-process channel pair (tests, demo)
//! - [`WsTransport`]: WebSocket link (replica connects, authority accepts)

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tracing::{debug, info, instrument, warn};

use crate::network::inbox::Inbox;
use crate::network::protocol::{Encoding, PeerMessage, ProtocolError, WireFrame};

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `close()` was called on this end.
    #[error("Transport closed")]
    Closed,

    /// The other end is gone.
    #[error("Peer disconnected")]
    Disconnected,

    /// Outgoing message could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(#[from] ProtocolError),

    /// WebSocket handshake or stream failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Socket failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Health of the link as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Frames are flowing.
    Connected,
    /// The peer stopped answering or a send failed; play continues locally.
    Degraded,
    /// Closed by this end.
    Closed,
}

/// Outgoing half of a peer link.
pub trait Transport: Send {
    /// Queue a message for the peer.
    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError>;

    /// Current link health.
    fn status(&self) -> LinkStatus;

    /// Shut the link down. Further sends fail with [`TransportError::Closed`].
    fn close(&mut self);
}

/// Link status shared with the background tasks.
#[derive(Debug, Clone)]
struct StatusCell(Arc<Mutex<LinkStatus>>);

impl StatusCell {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(LinkStatus::Connected)))
    }

    fn get(&self) -> LinkStatus {
        match self.0.lock() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Connected -> Degraded. A closed link stays closed.
    fn degrade(&self) {
        if let Ok(mut status) = self.0.lock() {
            if *status == LinkStatus::Connected {
                *status = LinkStatus::Degraded;
            }
        }
    }

    fn set_closed(&self) {
        if let Ok(mut status) = self.0.lock() {
            *status = LinkStatus::Closed;
        }
    }
}

/// Shared send path: status check, encode, hand the frame to the writer.
fn queue_frame(
    outgoing: Option<&mpsc::UnboundedSender<WireFrame>>,
    status: &StatusCell,
    encoding: Encoding,
    message: &PeerMessage,
) -> Result<(), TransportError> {
    let Some(outgoing) = outgoing else {
        return Err(TransportError::Closed);
    };
    if status.get() == LinkStatus::Closed {
        return Err(TransportError::Closed);
    }
    let frame = message.encode(encoding)?;
    outgoing.send(frame).map_err(|_| {
        status.degrade();
        TransportError::Disconnected
    })
}

// =============================================================================
// LOOPBACK
// =============================================================================

/// One end of an in-process link.
#[derive(Debug)]
pub struct LoopbackTransport {
    outgoing: Option<mpsc::UnboundedSender<WireFrame>>,
    encoding: Encoding,
    status: StatusCell,
    inbox: Inbox,
    reader: JoinHandle<()>,
}

impl LoopbackTransport {
    /// Create two connected ends. Must be called inside a tokio runtime.
    ///
    /// Frames still go through the codec so both encodings are exercised.
    pub fn pair(encoding: Encoding) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::end(a_tx, b_rx, encoding), Self::end(b_tx, a_rx, encoding))
    }

    fn end(
        outgoing: mpsc::UnboundedSender<WireFrame>,
        mut incoming: mpsc::UnboundedReceiver<WireFrame>,
        encoding: Encoding,
    ) -> Self {
        let inbox = Inbox::new();
        let status = StatusCell::new();

        let reader_inbox = inbox.clone();
        let reader_status = status.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = incoming.recv().await {
                reader_inbox.deliver_frame(&frame);
            }
            debug!("Loopback peer hung up");
            reader_status.degrade();
        });

        Self {
            outgoing: Some(outgoing),
            encoding,
            status,
            inbox,
            reader,
        }
    }

    /// Where this end's incoming messages land.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError> {
        queue_frame(self.outgoing.as_ref(), &self.status, self.encoding, message)
    }

    fn status(&self) -> LinkStatus {
        self.status.get()
    }

    fn close(&mut self) {
        self.status.set_closed();
        self.outgoing = None;
        self.reader.abort();
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// =============================================================================
// WEBSOCKET
// =============================================================================

/// WebSocket link to the other peer.
#[derive(Debug)]
pub struct WsTransport {
    outgoing: Option<mpsc::UnboundedSender<WireFrame>>,
    encoding: Encoding,
    status: StatusCell,
    inbox: Inbox,
    reader: JoinHandle<()>,
}

impl WsTransport {
    /// Connect to an authority (replica side).
    #[instrument]
    pub async fn connect(url: &str, encoding: Encoding) -> Result<Self, TransportError> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Connected to authority at {}", url);
        Ok(Self::spawn(ws_stream, encoding))
    }

    /// Accept one replica on `listener` (authority side).
    #[instrument(skip(listener))]
    pub async fn accept(listener: &TcpListener, encoding: Encoding) -> Result<Self, TransportError> {
        let (stream, addr) = listener.accept().await?;
        let ws_stream = accept_async(stream).await?;
        info!("Replica connected from {}", addr);
        Ok(Self::spawn(ws_stream, encoding))
    }

    fn spawn<S>(ws_stream: WebSocketStream<S>, encoding: Encoding) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WireFrame>();
        let inbox = Inbox::new();
        let status = StatusCell::new();

        let writer_status = status.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let msg = match frame {
                    WireFrame::Text(text) => Message::Text(text),
                    WireFrame::Binary(bytes) => Message::Binary(bytes),
                };
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("WebSocket send failed: {}", e);
                    writer_status.degrade();
                    return;
                }
            }
            let _ = ws_sender.close().await;
        });

        let reader_inbox = inbox.clone();
        let reader_status = status.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        reader_inbox.deliver_frame(&WireFrame::Text(text));
                    }
                    Ok(Message::Binary(data)) => {
                        reader_inbox.deliver_frame(&WireFrame::Binary(data));
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Peer closed the link");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            reader_status.degrade();
        });

        Self {
            outgoing: Some(out_tx),
            encoding,
            status,
            inbox,
            reader,
        }
    }

    /// Where this end's incoming messages land.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }
}

impl Transport for WsTransport {
    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError> {
        queue_frame(self.outgoing.as_ref(), &self.status, self.encoding, message)
    }

    fn status(&self) -> LinkStatus {
        self.status.get()
    }

    fn close(&mut self) {
        self.status.set_closed();
        // Dropping the sender lets the writer flush and send a Close frame.
        self.outgoing = None;
        self.reader.abort();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        // The writer ends on its own once `outgoing` drops.
        self.reader.abort();
    }
}
