//! Error taxonomy for cluster initialization and messaging.
//!
//! Packet loss on the multicast transport is deliberately *not* represented
//! here. Best-effort delivery means a dropped message is the silent absence of
//! an execution-status transition, which callers detect with their own bounded
//! waits (see `ClusterMessage::await_executed`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// Malformed or unsupported membership scheme configuration. Detected
    /// before any network resource is acquired; fatal to initialization.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Socket bind/join failure or any unrecoverable setup fault during the
    /// discovery window. Initialization aborts entirely; no partial membership
    /// view is left usable.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Immediate local send failure (serialization, empty or unresolvable
    /// target set, transport unavailable). Says nothing about whether remote
    /// execution ever happens.
    #[error("Message failed: {0}")]
    MessageFailed(String),
}
