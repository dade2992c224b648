use anyhow::{Context, Result, anyhow, bail};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::SIGNAL_TIMEOUT_MS;

/// Raw WebSocket participant that speaks the relay's JSON protocol.
pub struct TestClient {
    pub name: String,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str, name: &str) -> Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect {} to {}", name, url))?;

        Ok(Self {
            name: name.to_string(),
            socket,
        })
    }

    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_raw(&value.to_string()).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.socket
            .send(Message::text(text))
            .await
            .with_context(|| format!("[{}] Failed to send text frame", self.name))
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.socket
            .send(Message::binary(data))
            .await
            .with_context(|| format!("[{}] Failed to send binary frame", self.name))
    }

    /// Next text frame parsed as JSON, skipping control frames.
    pub async fn recv_json(&mut self) -> Result<Value> {
        let wait = Duration::from_millis(SIGNAL_TIMEOUT_MS);

        loop {
            let frame = timeout(wait, self.socket.next())
                .await
                .map_err(|_| anyhow!("[{}] Timed out waiting for a message", self.name))?
                .ok_or_else(|| anyhow!("[{}] Connection closed", self.name))??;

            match frame {
                Message::Text(text) => {
                    tracing::debug!("[{}] Received {}", self.name, text.as_str());
                    return serde_json::from_str(text.as_str())
                        .context("Relay sent invalid JSON");
                }
                Message::Close(_) => bail!("[{}] Connection closed", self.name),
                _ => continue,
            }
        }
    }

    /// Fails if any text frame arrives within `ms`.
    pub async fn expect_silence(&mut self, ms: u64) -> Result<()> {
        match timeout(Duration::from_millis(ms), self.socket.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => {
                bail!("[{}] Unexpected message: {}", self.name, text.as_str())
            }
            Ok(_) => Ok(()),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket
            .close(None)
            .await
            .with_context(|| format!("[{}] Failed to close", self.name))
    }
}
