use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Instant;

/// Identity of a cluster member: the address and port of its direct-channel
/// listener. Two announcements with the same `(host, port)` pair refer to the
/// same member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId {
    pub host: IpAddr,
    pub port: u16,
}

impl MemberId {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lifecycle state of a cluster member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemberStatus {
    /// First announcement observed; the member has not yet finished its own
    /// discovery window.
    Joining,
    /// The member announced itself after completing initialization.
    Active,
    /// The member announced a graceful departure.
    Leaving,
    /// No announcement heard for the liveness timeout. Evicted shortly after.
    Unreachable,
}

/// A single entry in the member registry.
///
/// `last_seen` is local bookkeeping for failure detection and is never put on
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub id: MemberId,
    pub status: MemberStatus,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl ClusterMember {
    pub fn new(id: MemberId, status: MemberStatus) -> Self {
        Self {
            id,
            status,
            last_seen: Some(Instant::now()),
        }
    }

    pub fn host(&self) -> IpAddr {
        self.id.host
    }

    pub fn port(&self) -> u16 {
        self.id.port
    }
}
