use crate::capability::SignalingSink;
use crate::signaling::LinkEvent;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use huddle_core::{Error, Result, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One WebSocket connection to the relay. Frames are written by a sender
/// task and read by a receiver task that turns them into [`LinkEvent`]s.
/// There is no reconnect: once closed, the link stays closed.
#[derive(Debug)]
pub struct SignalingLink {
    url: String,
    tx: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
}

impl SignalingLink {
    pub async fn connect(
        url: &str,
        timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LinkEvent>)> {
        info!("Connecting to signaling server: {}", url);

        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                Error::SignalingUnavailable("Signaling server connection timed out".to_string())
            })?
            .map_err(|e| {
                Error::SignalingUnavailable(format!("Failed to connect to {}: {}", url, e))
            })?;

        info!("Connected to signaling server");

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::sender_task(write, rx, open.clone()));
        tokio::spawn(Self::receiver_task(read, event_tx, open.clone()));

        Ok((
            Self {
                url: url.to_string(),
                tx,
                open,
            },
            event_rx,
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends a close frame and stops accepting messages. Safe to repeat.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("Closing signaling link to {}", self.url);
            let _ = self.tx.send(Message::Close(None));
        }
    }

    async fn sender_task(
        mut write: SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<Message>,
        open: Arc<AtomicBool>,
    ) {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));

            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
            if closing {
                break;
            }
        }

        open.store(false, Ordering::SeqCst);
        debug!("Sender task terminated");
    }

    async fn receiver_task(
        mut read: SplitStream<WsStream>,
        event_tx: mpsc::UnboundedSender<LinkEvent>,
        open: Arc<AtomicBool>,
    ) {
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    let _ = event_tx.send(Self::decode(text.as_str()));
                }
                Ok(Message::Binary(data)) => {
                    let event = match std::str::from_utf8(&data) {
                        Ok(text) => Self::decode(text),
                        Err(_) => LinkEvent::Invalid(String::from_utf8_lossy(&data).into_owned()),
                    };
                    let _ = event_tx.send(event);
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    let _ = event_tx.send(LinkEvent::Failed(e.to_string()));
                    break;
                }
                _ => {}
            }
        }

        open.store(false, Ordering::SeqCst);
        let _ = event_tx.send(LinkEvent::Closed);
        debug!("Receiver task terminated");
    }

    fn decode(text: &str) -> LinkEvent {
        debug!("Received signaling message: {}", text);

        match serde_json::from_str::<SignalMessage>(text) {
            Ok(msg) => LinkEvent::Message(msg),
            Err(e) => {
                warn!("Failed to parse signaling message: {}", e);
                LinkEvent::Invalid(text.to_string())
            }
        }
    }
}

impl SignalingSink for SignalingLink {
    fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(Error::SignalingUnavailable(
                "Signaling channel is closed".to_string(),
            ));
        }

        let json = msg
            .to_json()
            .map_err(|e| Error::InvalidMessage(format!("Failed to encode {}: {}", msg.kind(), e)))?;

        self.tx
            .send(Message::text(json))
            .map_err(|_| Error::SignalingUnavailable("Signaling channel is closed".to_string()))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

impl Drop for SignalingLink {
    fn drop(&mut self) {
        self.close();
    }
}
