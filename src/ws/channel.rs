//! WebSocket channel to the game server
//!
//! One persistent connection per session. A reader task forwards inbound
//! text frames to the session; a writer task drains outbound frames into the
//! socket. There is no reconnect: once either side stops, the channel is
//! closed for good and sends are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::protocol::{encode_outbound, OutboundMsg};

/// How long teardown waits for the close frame to flush
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);
/// Frames allowed to wait for the writer; beyond this, sends are dropped
pub const OUTBOUND_BUFFER: usize = 256;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closing,
    Closed,
}

/// Why a send did not go out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The channel is not in the open state
    ChannelNotOpen,
    /// The message failed shape validation
    Invalid,
    /// The writer is behind and the outbound buffer is full
    QueueFull,
}

/// Result of a fire-and-forget send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped(DropReason),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Anything the session can push outbound messages into
pub trait OutboundSink {
    fn send(&self, msg: &OutboundMsg) -> SendOutcome;
}

/// Frames delivered from the reader task
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A text payload, expected to be a full snapshot
    Text(String),
    /// The connection is gone; no more frames will follow
    Closed,
}

/// Send counters
#[derive(Debug, Default)]
pub struct ChannelStats {
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Live WebSocket connection
pub struct NetworkChannel {
    state: Arc<RwLock<ChannelState>>,
    stats: Arc<ChannelStats>,
    outbound_tx: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl NetworkChannel {
    /// Open the connection and start the reader/writer tasks
    pub async fn connect(
        url: &str,
        inbound_tx: mpsc::Sender<InboundFrame>,
    ) -> Result<Self, ChannelError> {
        let (socket, _response) = connect_async(url).await?;
        info!(url = %url, "WebSocket connection established");

        let (mut ws_sink, mut ws_stream) = socket.split();
        let state = Arc::new(RwLock::new(ChannelState::Open));
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

        // Writer task: outbound queue -> WebSocket
        let writer_state = state.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = ws_sink.send(msg).await {
                    debug!(error = %e, "WebSocket send failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            *writer_state.write() = ChannelState::Closed;
        });

        // Reader task: WebSocket -> session
        let reader_state = state.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = ws_stream.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(InboundFrame::Text(text)).await.is_err() {
                            debug!("Inbound receiver dropped");
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        warn!("Received binary message, ignoring");
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                    Ok(Message::Close(frame)) => {
                        info!(?frame, "Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            *reader_state.write() = ChannelState::Closed;
            let _ = inbound_tx.send(InboundFrame::Closed).await;
        });

        Ok(Self::from_parts(state, outbound_tx, reader, writer))
    }

    fn from_parts(
        state: Arc<RwLock<ChannelState>>,
        outbound_tx: mpsc::Sender<Message>,
        reader: JoinHandle<()>,
        writer: JoinHandle<()>,
    ) -> Self {
        Self {
            state,
            stats: Arc::new(ChannelStats::default()),
            outbound_tx,
            reader,
            writer,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Send a close frame and stop both tasks
    pub async fn close(mut self) {
        {
            let mut state = self.state.write();
            if *state == ChannelState::Open {
                *state = ChannelState::Closing;
            }
        }
        let flush = async {
            if self.outbound_tx.send(Message::Close(None)).await.is_ok() {
                let _ = (&mut self.writer).await;
            }
        };
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, flush).await.is_err() {
            debug!("Close frame did not flush in time");
        }
        *self.state.write() = ChannelState::Closed;
        info!(
            sent = self.stats.sent(),
            dropped = self.stats.dropped(),
            "WebSocket connection closed"
        );
    }
}

impl OutboundSink for NetworkChannel {
    fn send(&self, msg: &OutboundMsg) -> SendOutcome {
        if self.state() != ChannelState::Open {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return SendOutcome::Dropped(DropReason::ChannelNotOpen);
        }

        let text = match encode_outbound(msg) {
            Ok(text) => text,
            Err(e) => {
                warn!(kind = msg.kind(), error = %e, "Refusing to send invalid message");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                return SendOutcome::Dropped(DropReason::Invalid);
            }
        };

        match self.outbound_tx.try_send(Message::Text(text)) {
            Ok(()) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Sent
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Dropped(DropReason::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Dropped(DropReason::ChannelNotOpen)
            }
        }
    }
}

impl Drop for NetworkChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("WebSocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}
