use crate::error::ClusterError;
use crate::membership::types::MemberId;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Discovery window used when `timeout_millis` is 0. A zero timeout means
/// "use the scheme default", never "wait forever".
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(2);

/// Top-level, immutable cluster configuration.
///
/// `local` is the identity this node advertises to its peers: the address and
/// port of its direct-channel listener. Port 0 asks the OS for a free port;
/// the actual port is advertised after binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfiguration {
    pub local: MemberId,
    pub scheme: MembershipScheme,
}

impl ClusterConfiguration {
    pub fn new(local: MemberId, scheme: MembershipScheme) -> Self {
        Self { local, scheme }
    }
}

/// The strategy by which nodes discover and agree on cluster composition.
///
/// Variants are selected by the external loader's `scheme` discriminator.
/// Only `Multicast` is supported; `WellKnownAddress` is carried through so a
/// loader can represent it, but initialization rejects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MembershipScheme {
    Multicast(MulticastConfig),
    WellKnownAddress { members: Vec<SocketAddr> },
}

impl MembershipScheme {
    /// The discriminator string used by configuration loaders.
    pub fn name(&self) -> &'static str {
        match self {
            MembershipScheme::Multicast(_) => "multicast",
            MembershipScheme::WellKnownAddress { .. } => "wka",
        }
    }
}

/// Parameters of the multicast membership scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastConfig {
    /// Multicast group address (IPv4 or IPv6) announcements and broadcast
    /// messages are exchanged on.
    pub group: IpAddr,
    /// UDP port of the multicast group.
    pub port: u16,
    /// Length of the initial discovery window in milliseconds. 0 selects
    /// [`DEFAULT_DISCOVERY_WINDOW`].
    pub timeout_millis: u32,
    /// Multicast hop count (IP_MULTICAST_TTL).
    pub ttl: u8,
    /// Interface the group is joined on. `None` lets the OS pick; tests and
    /// single-host deployments set the loopback address here.
    pub interface: Option<Ipv4Addr>,
}

impl MulticastConfig {
    pub fn new(group: IpAddr, port: u16, timeout_millis: u32, ttl: u8) -> Self {
        Self {
            group,
            port,
            timeout_millis,
            ttl,
            interface: None,
        }
    }

    /// The bounded time interval during which initial peer announcements are
    /// collected before the membership view is declared stable.
    pub fn discovery_window(&self) -> Duration {
        if self.timeout_millis == 0 {
            DEFAULT_DISCOVERY_WINDOW
        } else {
            Duration::from_millis(self.timeout_millis as u64)
        }
    }

    /// Socket address of the multicast group.
    pub fn group_addr(&self) -> SocketAddr {
        SocketAddr::new(self.group, self.port)
    }

    /// Rejects configurations that cannot possibly form a group. Runs before
    /// any network resource is acquired.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.group.is_multicast() {
            return Err(ClusterError::Configuration(format!(
                "{} is not a multicast group address",
                self.group
            )));
        }
        Ok(())
    }
}
