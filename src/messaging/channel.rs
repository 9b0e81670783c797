//! Point-to-point channels for targeted messages.
//!
//! A channel to a member is opened on first use and cached for reuse. Each
//! channel gets exactly two tasks: a writer draining an mpsc queue onto the
//! TCP stream, and a reader routing ack frames back to the sender's pending
//! table. No two channels share a lock.

use super::protocol::{read_frame, write_frame, WirePacket};
use super::types::PendingAcks;
use crate::error::ClusterError;
use crate::membership::types::{ClusterMember, MemberId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

pub(crate) struct ChannelManager {
    channels: DashMap<MemberId, mpsc::UnboundedSender<WirePacket>>,
    pending: Arc<PendingAcks>,
}

impl ChannelManager {
    pub(crate) fn new(pending: Arc<PendingAcks>) -> Self {
        Self {
            channels: DashMap::new(),
            pending,
        }
    }

    /// Queues a packet on the channel to `member`, opening the channel first
    /// if none exists or the previous one died. Returns once the packet is
    /// handed to the channel writer; remote execution is not awaited.
    pub(crate) async fn send(
        &self,
        member: &ClusterMember,
        packet: WirePacket,
    ) -> Result<(), ClusterError> {
        if let Some(entry) = self.channels.get(&member.id) {
            if !entry.value().is_closed() {
                return entry.value().send(packet).map_err(|_| {
                    ClusterError::MessageFailed(format!("channel to {} closed", member.id))
                });
            }
        }
        // Stale or missing channel: establish a fresh one.
        self.channels.remove(&member.id);

        let tx = self.open_channel(member).await?;
        let result = tx.send(packet).map_err(|_| {
            ClusterError::MessageFailed(format!("channel to {} closed", member.id))
        });
        self.channels.insert(member.id.clone(), tx);
        result
    }

    async fn open_channel(
        &self,
        member: &ClusterMember,
    ) -> Result<mpsc::UnboundedSender<WirePacket>, ClusterError> {
        let stream = TcpStream::connect((member.host(), member.port()))
            .await
            .map_err(|e| {
                ClusterError::MessageFailed(format!("cannot open channel to {}: {}", member.id, e))
            })?;
        tracing::debug!("Opened direct channel to {}", member.id);

        let (mut read_half, mut write_half) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WirePacket>();

        let writer_peer = member.id.clone();
        tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                if let Err(e) = write_frame(&mut write_half, &packet).await {
                    tracing::warn!("Direct channel to {} broke: {}", writer_peer, e);
                    break;
                }
            }
        });

        let pending = self.pending.clone();
        let reader_peer = member.id.clone();
        tokio::spawn(async move {
            loop {
                match read_frame(&mut read_half).await {
                    Ok(WirePacket::Ack {
                        message_id, result, ..
                    }) => {
                        pending.complete(&message_id, &result);
                    }
                    Ok(other) => {
                        tracing::debug!(
                            "Unexpected {:?} on outbound channel from {}",
                            other,
                            reader_peer
                        );
                    }
                    Err(_) => {
                        tracing::debug!("Direct channel from {} closed", reader_peer);
                        break;
                    }
                }
            }
        });

        Ok(tx)
    }
}
