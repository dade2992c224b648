use crate::error::ServerError;
use crate::room::{RegistryCommand, RegistrySnapshot, RoomRegistry};
use crate::signaling::{ChannelId, PeerChannel, RelayKind};
use huddle_core::{PeerId, RoomId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 256;

/// Owns the registry. Every join, relay and leave is applied here one at a
/// time, so a broadcast never interleaves with a membership change.
pub struct RoomRouter {
    registry: RoomRegistry,
    command_rx: mpsc::Receiver<RegistryCommand>,
}

impl RoomRouter {
    pub fn new(command_rx: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Room router started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!("Command channel closed. Room router stopped.");
    }

    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Join {
                room_id,
                peer_id,
                channel,
            } => {
                self.registry.join(room_id, peer_id, channel);
            }

            RegistryCommand::Relay {
                kind,
                room_id,
                target_peer_id,
                raw,
            } => {
                let outcome = self.registry.relay(kind, &room_id, &target_peer_id, raw);
                debug!(
                    "Relay {} -> {} in {}: {:?}",
                    kind.as_str(),
                    target_peer_id,
                    room_id,
                    outcome
                );
            }

            RegistryCommand::Leave { channel_id } => {
                let removed = self.registry.leave(channel_id);
                debug!("Connection {} left {} memberships", channel_id, removed.len());
            }

            RegistryCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
    }
}

/// Cloneable handle to a running [`RoomRouter`].
#[derive(Clone)]
pub struct RouterHandle {
    command_tx: mpsc::Sender<RegistryCommand>,
}

impl RouterHandle {
    /// Starts a router task on the current runtime.
    pub fn spawn() -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(RoomRouter::new(command_rx).run());
        Self { command_tx }
    }

    pub async fn join(
        &self,
        room_id: RoomId,
        peer_id: PeerId,
        channel: PeerChannel,
    ) -> Result<(), ServerError> {
        self.send(RegistryCommand::Join {
            room_id,
            peer_id,
            channel,
        })
        .await
    }

    pub async fn relay(
        &self,
        kind: RelayKind,
        room_id: RoomId,
        target_peer_id: PeerId,
        raw: String,
    ) -> Result<(), ServerError> {
        self.send(RegistryCommand::Relay {
            kind,
            room_id,
            target_peer_id,
            raw,
        })
        .await
    }

    pub async fn leave(&self, channel_id: ChannelId) -> Result<(), ServerError> {
        self.send(RegistryCommand::Leave { channel_id }).await
    }

    pub async fn snapshot(&self) -> Result<RegistrySnapshot, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| ServerError::RouterUnavailable)
    }

    async fn send(&self, cmd: RegistryCommand) -> Result<(), ServerError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| ServerError::RouterUnavailable)
    }
}
