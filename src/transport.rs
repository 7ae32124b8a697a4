// file: src/transport.rs
// description: socket seam between the reconnecting client and the network
// reference: https://docs.rs/tokio-tungstenite/latest/tokio_tungstenite/

use crate::error::AlarmFeedError;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// What a live connection reports back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    OpenFailed(String),
    Frame(String),
    Closed,
    Error(String),
}

pub(crate) type TransportEventSender = mpsc::UnboundedSender<(u64, TransportEvent)>;

/// Channel a transport uses to report events for one connection attempt.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: u64,
    tx: TransportEventSender,
}

impl TransportSink {
    pub(crate) fn new(generation: u64, tx: TransportEventSender) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the client is gone.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Owner side of one connection attempt. Closing (or dropping) it asks the
/// transport to shut the socket down without reporting further events.
#[derive(Debug)]
pub struct TransportHandle {
    close: Option<oneshot::Sender<()>>,
}

impl TransportHandle {
    pub fn new(close: oneshot::Sender<()>) -> Self {
        Self { close: Some(close) }
    }

    pub fn close(mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
    }
}

/// Opens connections to the configured endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Starts an attempt and returns immediately; progress arrives on `sink`.
    fn open(&self, url: &Url, sink: TransportSink) -> TransportHandle;
}

/// Production transport over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &Url, sink: TransportSink) -> TransportHandle {
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(run_connection(
            url.clone(),
            self.connect_timeout,
            sink,
            close_rx,
        ));
        TransportHandle::new(close_tx)
    }
}

async fn run_connection(
    url: Url,
    connect_timeout: Duration,
    sink: TransportSink,
    mut close_rx: oneshot::Receiver<()>,
) {
    let connect = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));

    let ws_stream = tokio::select! {
        _ = &mut close_rx => {
            debug!(generation = sink.generation(), "Connection attempt abandoned");
            return;
        }
        result = connect => match result {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                error!("Failed to connect to WebSocket: {}", e);
                sink.send(TransportEvent::OpenFailed(AlarmFeedError::WebSocketError(e).to_string()));
                return;
            }
            Err(_) => {
                error!("Connection to {} timed out after {:?}", url, connect_timeout);
                sink.send(TransportEvent::OpenFailed(AlarmFeedError::Timeout.to_string()));
                return;
            }
        }
    };

    info!("WebSocket connection established to {}", url);
    if !sink.send(TransportEvent::Opened) {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                debug!(generation = sink.generation(), "Closing WebSocket on request");
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("Close frame not delivered: {}", e);
                }
                break;
            }
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    trace!("Received text message: {}", text.as_str());
                    if !sink.send(TransportEvent::Frame(text.as_str().to_owned())) {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!("Ignoring binary message of {} bytes", data.len());
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    trace!("Heartbeat frame");
                }
                Some(Ok(Message::Frame(_))) => {
                    debug!("Received raw frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!("Received close frame: {:?}", frame);
                    sink.send(TransportEvent::Closed);
                    break;
                }
                Some(Err(e)) => {
                    error!("WebSocket stream error: {}", e);
                    sink.send(TransportEvent::Error(AlarmFeedError::WebSocketError(e).to_string()));
                    break;
                }
                None => {
                    info!("WebSocket stream ended");
                    sink.send(TransportEvent::Closed);
                    break;
                }
            }
        }
    }
}
