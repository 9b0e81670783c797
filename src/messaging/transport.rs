//! Message Transport
//!
//! The broadcast path serializes a message and multicasts it on the discovery
//! group; every active member's listener hands it over for local execution.
//! The targeted path resolves each target against the member registry and
//! delivers over direct channels, so members outside the target set never
//! observe the message.
//!
//! Both paths return once the payload is handed to the transport. Execution
//! reports travel back as ack packets (multicast for broadcast, on the channel
//! for targeted) and land in the sender's execution-status slot; a lost packet
//! leaves the slot empty forever, by contract.

use super::channel::ChannelManager;
use super::protocol::{read_frame, write_frame, MessageEnvelope, WirePacket};
use super::registry::MessageHandlerRegistry;
use super::types::{ClusterMessage, PendingAcks};
use crate::error::ClusterError;
use crate::membership::registry::MemberRegistry;
use crate::membership::types::{ClusterMember, MemberId};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct MessageTransport {
    local: MemberId,
    /// The shared multicast socket; broadcast sends and broadcast acks go out
    /// here. Receiving is the discovery listener's job.
    socket: Arc<UdpSocket>,
    group_addr: SocketAddr,
    registry: Arc<MemberRegistry>,
    handlers: Arc<MessageHandlerRegistry>,
    pending: Arc<PendingAcks>,
    channels: ChannelManager,
    /// Bound in `new` so the advertised identity carries a real port; the
    /// accept loop takes it when the transport starts.
    listener: Mutex<Option<TcpListener>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MessageTransport {
    /// Takes the pre-bound direct-channel listener (bound during cluster
    /// construction so the advertised identity carries the real port).
    pub(crate) fn new(
        local: MemberId,
        listener: TcpListener,
        socket: Arc<UdpSocket>,
        group_addr: SocketAddr,
        registry: Arc<MemberRegistry>,
        handlers: Arc<MessageHandlerRegistry>,
    ) -> Arc<Self> {
        let pending = PendingAcks::new();
        Arc::new(Self {
            local,
            socket,
            group_addr,
            registry,
            handlers,
            channels: ChannelManager::new(pending.clone()),
            pending,
            listener: Mutex::new(Some(listener)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Starts the accept loop for inbound direct channels and the dispatch
    /// loop for message/ack packets arriving on the multicast group. Runs as a
    /// coordinated activity, so the transport becomes usable exactly when the
    /// membership view stabilizes.
    pub(crate) fn start(self: &Arc<Self>, inbound: mpsc::UnboundedReceiver<WirePacket>) {
        let listener = match self.listener.lock().unwrap().take() {
            Some(listener) => listener,
            None => {
                tracing::debug!("Message transport already started");
                return;
            }
        };

        let mut tasks = self.tasks.lock().unwrap();

        let acceptor = self.clone();
        tasks.push(tokio::spawn(async move {
            acceptor.accept_loop(listener).await;
        }));

        let dispatcher = self.clone();
        tasks.push(tokio::spawn(async move {
            dispatcher.dispatch_loop(inbound).await;
        }));

        tracing::info!("Message transport listening on {}", self.local);
    }

    /// Broadcast form: one datagram to the whole group. Returns as soon as the
    /// datagram is handed to the socket; never waits for remote execution.
    pub async fn send(&self, message: &ClusterMessage) -> Result<(), ClusterError> {
        let envelope = self.envelope(message)?;
        let encoded = bincode::serialize(&WirePacket::Message(envelope))
            .map_err(|e| ClusterError::MessageFailed(format!("serialization failed: {}", e)))?;

        self.socket
            .send_to(&encoded, self.group_addr)
            .await
            .map_err(|e| ClusterError::MessageFailed(format!("multicast send failed: {}", e)))?;

        tracing::debug!("Broadcast message {:?} on {}", message.id(), self.group_addr);
        Ok(())
    }

    /// Targeted form: one framed copy per resolved member over its direct
    /// channel. The whole target set is resolved against the registry before
    /// anything is transmitted; an empty or unresolvable set fails without a
    /// packet leaving this node.
    pub async fn send_to(
        &self,
        message: &ClusterMessage,
        targets: &[ClusterMember],
    ) -> Result<(), ClusterError> {
        if targets.is_empty() {
            return Err(ClusterError::MessageFailed("target set is empty".to_string()));
        }

        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            match self.registry.get(&target.id) {
                Some(member) => resolved.push(member),
                None => {
                    return Err(ClusterError::MessageFailed(format!(
                        "target {} is not a cluster member",
                        target.id
                    )));
                }
            }
        }

        let envelope = self.envelope(message)?;
        for member in resolved {
            self.channels
                .send(&member, WirePacket::Message(envelope.clone()))
                .await?;
            tracing::debug!("Sent message {:?} to {}", message.id(), member.id);
        }
        Ok(())
    }

    /// Prepares a message for (re)transmission: encodes the payload as JSON
    /// text for the wire, clears any execution status left over from a
    /// previous send of the same object, and registers the fresh slot for
    /// inbound acks.
    fn envelope(&self, message: &ClusterMessage) -> Result<MessageEnvelope, ClusterError> {
        let payload = serde_json::to_string(message.payload())
            .map_err(|e| ClusterError::MessageFailed(format!("payload encoding failed: {}", e)))?;

        let status = message.status_handle();
        status.clear();
        self.pending.track(message.id().clone(), &status);

        Ok(MessageEnvelope {
            id: message.id().clone(),
            sender: self.local.clone(),
            handler: message.handler().to_string(),
            payload,
        })
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted direct channel from {}", peer);
                    let transport = self.clone();
                    tokio::spawn(async move {
                        transport.serve_channel(stream, peer).await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept direct channel: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Receive loop for one inbound direct channel: executes message frames
    /// sequentially and reports each result on the same channel.
    async fn serve_channel(self: Arc<Self>, mut stream: TcpStream, peer: SocketAddr) {
        loop {
            match read_frame(&mut stream).await {
                Ok(WirePacket::Message(envelope)) => {
                    if let Some(ack) = self.execute(envelope).await {
                        if let Err(e) = write_frame(&mut stream, &ack).await {
                            tracing::warn!("Cannot report execution to {}: {}", peer, e);
                            break;
                        }
                    }
                }
                Ok(WirePacket::Ack {
                    message_id, result, ..
                }) => {
                    self.pending.complete(&message_id, &result);
                }
                Ok(other) => {
                    tracing::debug!("Unexpected {:?} on direct channel from {}", other, peer);
                }
                Err(_) => {
                    tracing::debug!("Direct channel from {} closed", peer);
                    break;
                }
            }
        }
    }

    /// Packets that arrived on the multicast group (forwarded by the discovery
    /// listener): execute broadcast messages and route broadcast acks.
    async fn dispatch_loop(self: Arc<Self>, mut inbound: mpsc::UnboundedReceiver<WirePacket>) {
        while let Some(packet) = inbound.recv().await {
            match packet {
                WirePacket::Message(envelope) => {
                    if let Some(ack) = self.execute(envelope).await {
                        // The execution report goes back over the group; only
                        // the sender tracks the message id, everyone else
                        // ignores it.
                        match bincode::serialize(&ack) {
                            Ok(encoded) => {
                                if let Err(e) =
                                    self.socket.send_to(&encoded, self.group_addr).await
                                {
                                    tracing::warn!("Cannot report execution: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to serialize ack: {}", e);
                            }
                        }
                    }
                }
                WirePacket::Ack {
                    message_id,
                    executed_by,
                    result,
                } => {
                    if executed_by != self.local {
                        self.pending.complete(&message_id, &result);
                    }
                }
                other => {
                    tracing::debug!("Discovery packet {:?} reached the transport", other);
                }
            }
        }
    }

    /// Executes one inbound envelope and builds the ack. Own broadcast packets
    /// (multicast loopback) and unknown handlers produce no ack; to the sender
    /// the latter looks like a lost packet, which matches the best-effort
    /// contract.
    async fn execute(&self, envelope: MessageEnvelope) -> Option<WirePacket> {
        if envelope.sender == self.local {
            return None;
        }

        let payload: serde_json::Value = match serde_json::from_str(&envelope.payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    "Undecodable payload in message {:?} from {}: {}",
                    envelope.id,
                    envelope.sender,
                    e
                );
                return None;
            }
        };

        match self.handlers.execute(&envelope.handler, payload).await {
            Ok(result) => match serde_json::to_string(&result) {
                Ok(result) => Some(WirePacket::Ack {
                    message_id: envelope.id,
                    executed_by: self.local.clone(),
                    result,
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to encode execution result for {:?}: {}",
                        envelope.id,
                        e
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Execution of message {:?} from {} failed: {}",
                    envelope.id,
                    envelope.sender,
                    e
                );
                None
            }
        }
    }

    pub(crate) fn abort_tasks(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}
