//! Multicast Discovery Engine
//!
//! Joins the configured multicast group and runs three background duties for
//! the life of the node:
//!
//! 1. **Announcer**: multicasts this node's identity at a fixed interval
//!    (always faster than the liveness timeout).
//! 2. **Listener**: upserts every received announcement into the member
//!    registry, removes members on leave packets, and forwards application
//!    message/ack packets to the transport.
//! 3. **Reaper**: periodically sweeps the registry for silent members.
//!
//! `initialize` is the one deliberately blocking call: it awaits the
//! configured discovery window so callers do not proceed until the initial
//! membership view has settled. Everything after that is background work.

use super::registry::MemberRegistry;
use super::types::{MemberId, MemberStatus};
use crate::config::types::MulticastConfig;
use crate::error::ClusterError;
use crate::messaging::protocol::WirePacket;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Interval between identity announcements. Six missed announcements mark a
/// member unreachable, twelve evict it.
const ANNOUNCE_INTERVAL: Duration = Duration::from_millis(500);
const REAPER_INTERVAL: Duration = Duration::from_secs(1);
const UNREACHABLE_AFTER: Duration = Duration::from_secs(3);
const EVICT_AFTER: Duration = Duration::from_secs(6);

/// Binds the shared multicast socket: reusable address (so several nodes on
/// one host can share the group port), group join on the configured
/// interface, hop count, and loopback enabled so co-hosted nodes hear each
/// other.
pub(crate) fn bind_group_socket(config: &MulticastConfig) -> Result<std::net::UdpSocket, ClusterError> {
    let init_err =
        |what: &str, e: std::io::Error| ClusterError::Initialization(format!("{}: {}", what, e));

    match config.group {
        IpAddr::V4(group) => {
            let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
                .map_err(|e| init_err("cannot create UDP socket", e))?;
            socket
                .set_reuse_address(true)
                .map_err(|e| init_err("cannot set SO_REUSEADDR", e))?;
            let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.port).into();
            socket
                .bind(&bind_addr.into())
                .map_err(|e| init_err(&format!("cannot bind {}", bind_addr), e))?;

            let interface = config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
            socket
                .join_multicast_v4(&group, &interface)
                .map_err(|e| init_err(&format!("cannot join group {}", group), e))?;
            socket
                .set_multicast_if_v4(&interface)
                .map_err(|e| init_err("cannot select multicast interface", e))?;
            socket
                .set_multicast_ttl_v4(config.ttl as u32)
                .map_err(|e| init_err("cannot set multicast TTL", e))?;
            socket
                .set_multicast_loop_v4(true)
                .map_err(|e| init_err("cannot enable multicast loopback", e))?;
            socket
                .set_nonblocking(true)
                .map_err(|e| init_err("cannot set nonblocking", e))?;
            Ok(socket.into())
        }
        IpAddr::V6(group) => {
            let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))
                .map_err(|e| init_err("cannot create UDP socket", e))?;
            socket
                .set_reuse_address(true)
                .map_err(|e| init_err("cannot set SO_REUSEADDR", e))?;
            let bind_addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();
            socket
                .bind(&bind_addr.into())
                .map_err(|e| init_err(&format!("cannot bind {}", bind_addr), e))?;
            socket
                .join_multicast_v6(&group, 0)
                .map_err(|e| init_err(&format!("cannot join group {}", group), e))?;
            socket
                .set_multicast_hops_v6(config.ttl as u32)
                .map_err(|e| init_err("cannot set multicast hop count", e))?;
            socket
                .set_multicast_loop_v6(true)
                .map_err(|e| init_err("cannot enable multicast loopback", e))?;
            socket
                .set_nonblocking(true)
                .map_err(|e| init_err("cannot set nonblocking", e))?;
            Ok(socket.into())
        }
    }
}

pub struct MulticastDiscovery {
    config: MulticastConfig,
    local: MemberId,
    registry: Arc<MemberRegistry>,
    socket: Arc<UdpSocket>,
    /// Flips once the discovery window has elapsed; announcements advertise
    /// `Joining` before and `Active` after.
    stable: AtomicBool,
    inbound: mpsc::UnboundedSender<WirePacket>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MulticastDiscovery {
    pub(crate) fn new(
        config: MulticastConfig,
        local: MemberId,
        registry: Arc<MemberRegistry>,
        socket: Arc<UdpSocket>,
        inbound: mpsc::UnboundedSender<WirePacket>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            local,
            registry,
            socket,
            stable: AtomicBool::new(false),
            inbound,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// The scheme parameters this engine runs with, exactly as configured.
    pub fn config(&self) -> &MulticastConfig {
        &self.config
    }

    /// Starts the background duties, then blocks for the discovery window.
    /// When this returns, the initial membership view is stable. The listener,
    /// announcer, and reaper keep running until shutdown.
    pub(crate) async fn initialize(self: &Arc<Self>) -> Result<(), ClusterError> {
        let mut tasks = self.tasks.lock().unwrap();

        let listener = self.clone();
        tasks.push(tokio::spawn(async move {
            listener.listen_loop().await;
        }));

        let announcer = self.clone();
        tasks.push(tokio::spawn(async move {
            announcer.announce_loop().await;
        }));

        let reaper = self.clone();
        tasks.push(tokio::spawn(async move {
            reaper.reap_loop().await;
        }));
        drop(tasks);

        let window = self.config.discovery_window();
        tracing::info!(
            "Collecting announcements on {} for {:?}",
            self.config.group_addr(),
            window
        );
        tokio::time::sleep(window).await;

        self.stable.store(true, Ordering::SeqCst);
        tracing::info!(
            "Membership view stable: {} remote member(s)",
            self.registry.count()
        );
        Ok(())
    }

    async fn listen_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<WirePacket>(&buf[..len]) {
                    Ok(packet) => self.handle_packet(packet, src),
                    Err(e) => {
                        tracing::warn!("Undecodable packet from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive on multicast socket: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    fn handle_packet(&self, packet: WirePacket, src: SocketAddr) {
        match packet {
            WirePacket::Announce { member, status } => {
                tracing::trace!("Announcement from {} (via {})", member, src);
                self.registry.observe(member, status);
            }
            WirePacket::Leave { member } => {
                self.registry.remove(&member);
            }
            // Application traffic shares the group socket; hand it to the
            // message transport.
            msg @ (WirePacket::Message(_) | WirePacket::Ack { .. }) => {
                if self.inbound.send(msg).is_err() {
                    tracing::warn!("Message transport is gone; dropping inbound packet");
                }
            }
        }
    }

    async fn announce_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(ANNOUNCE_INTERVAL);

        loop {
            interval.tick().await;

            let status = if self.stable.load(Ordering::SeqCst) {
                MemberStatus::Active
            } else {
                MemberStatus::Joining
            };
            let packet = WirePacket::Announce {
                member: self.local.clone(),
                status,
            };

            match bincode::serialize(&packet) {
                Ok(encoded) => {
                    if let Err(e) = self.socket.send_to(&encoded, self.config.group_addr()).await {
                        tracing::warn!("Failed to announce on {}: {}", self.config.group_addr(), e);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize announcement: {}", e);
                }
            }
        }
    }

    async fn reap_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);

        loop {
            interval.tick().await;
            self.registry.sweep(UNREACHABLE_AFTER, EVICT_AFTER);
        }
    }

    /// Multicasts a graceful-departure packet so peers drop this node without
    /// waiting for the liveness timeout. Best-effort, like all group traffic.
    pub(crate) async fn announce_leave(&self) {
        let packet = WirePacket::Leave {
            member: self.local.clone(),
        };
        if let Ok(encoded) = bincode::serialize(&packet) {
            if let Err(e) = self.socket.send_to(&encoded, self.config.group_addr()).await {
                tracing::warn!("Failed to announce departure: {}", e);
            }
        }
    }

    pub(crate) fn abort_tasks(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}
