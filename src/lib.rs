//! Multicast Cluster Library
//!
//! This library crate implements dynamic cluster formation over UDP multicast:
//! nodes on a multicast-capable network discover each other automatically,
//! agree on a membership view, run one-time coordination work as the view
//! stabilizes, and exchange application messages with best-effort delivery.
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`config`**: The immutable cluster configuration model. Holds the chosen
//!   membership scheme (multicast group, port, discovery timeout, TTL) as a
//!   tagged union. Produced by an external loader; the core only reads it.
//! - **`membership`**: The cluster coordination layer. A multicast discovery
//!   engine announces this node and listens for peer announcements, keeping the
//!   member registry (the single source of truth for "who is in the group")
//!   up to date with joins, departures, and liveness-based eviction.
//! - **`coordination`**: A one-shot barrier that runs registered activities
//!   exactly once, in registration order, at the instant the initial membership
//!   view becomes stable.
//! - **`messaging`**: The message transport. Broadcasts application messages on
//!   the multicast group or delivers them to chosen members over lazily opened
//!   direct channels, and reports remote execution status back to the sender.
//! - **`cluster`**: The facade tying everything together behind an explicit,
//!   passed-down context object (no global state).

pub mod cluster;
pub mod config;
pub mod coordination;
pub mod error;
pub mod membership;
pub mod messaging;
