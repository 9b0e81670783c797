//! Wire protocol shared by discovery and messaging.
//!
//! Every datagram on the multicast group and every frame on a direct channel
//! is a bincode-encoded [`WirePacket`]. The enum discriminant is what keeps
//! announcement traffic and application traffic apart on the shared group
//! port.

use crate::membership::types::{MemberId, MemberStatus};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are treated as corrupt input on a direct channel.
const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Unique identifier of one application message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// An application message as it travels between members.
///
/// The payload crosses the wire as JSON text, not as a `serde_json::Value`:
/// bincode is not self-describing and cannot decode the dynamically-typed
/// `Value`. Receivers parse it back at the handler boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub id: MessageId,
    /// Identity of the sending member; receivers skip their own broadcast
    /// packets (multicast loopback) by comparing against this.
    pub sender: MemberId,
    /// Name of the registered handler to invoke on arrival.
    pub handler: String,
    /// JSON-encoded handler payload.
    pub payload: String,
}

/// Everything that goes on the wire.
///
/// - `Announce`/`Leave`: membership discovery traffic.
/// - `Message`: an application message (broadcast or targeted).
/// - `Ack`: execution report, routed back to the sender's copy of the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WirePacket {
    Announce {
        member: MemberId,
        status: MemberStatus,
    },

    Leave {
        member: MemberId,
    },

    Message(MessageEnvelope),

    Ack {
        message_id: MessageId,
        executed_by: MemberId,
        /// JSON-encoded completion value, same wire rule as the payload.
        result: String,
    },
}

/// Writes one length-prefixed packet frame to a direct channel.
pub(crate) async fn write_frame<W>(writer: &mut W, packet: &WirePacket) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = bincode::serialize(packet)?;
    writer.write_all(&(encoded.len() as u32).to_be_bytes()).await?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed packet frame from a direct channel. Errors mean
/// the channel is unusable (peer closed it or sent garbage).
pub(crate) async fn read_frame<R>(reader: &mut R) -> anyhow::Result<WirePacket>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        anyhow::bail!("frame of {} bytes exceeds limit", len);
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(bincode::deserialize(&payload)?)
}
