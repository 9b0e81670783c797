//! Membership & Discovery Module
//!
//! Maintains the agreed-upon set of cluster members and keeps it current via
//! UDP multicast discovery. Nodes use this module to find each other without a
//! central registry, detect failures, and observe departures.
//!
//! ## Core Mechanisms
//! - **Announcements**: Every node periodically multicasts its identity on the
//!   configured group. Hearing an announcement upserts the sender into the
//!   member registry and refreshes its liveness timestamp.
//! - **Discovery Window**: Initialization blocks for a bounded window while
//!   initial announcements are collected, after which the view is declared
//!   stable. The listener and announcer keep running for the life of the node.
//! - **Failure Detection**: Members silent for several announce intervals
//!   transition to `Unreachable` and are eventually evicted. Best-effort by
//!   design; multicast gives no delivery guarantee.

pub mod discovery;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
