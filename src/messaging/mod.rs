//! Messaging Module
//!
//! Delivers application messages to the whole group or to a chosen subset of
//! members, with deliberately best-effort semantics: a send returns once the
//! payload is handed to the transport, and a dropped packet is silent, never
//! an error. Callers bound their own waits with
//! [`ClusterMessage::await_executed`](types::ClusterMessage::await_executed).
//!
//! ## Submodules
//! - **`protocol`**: The shared wire format. Announcements and application
//!   messages travel on the same multicast group, distinguished by the packet
//!   discriminant; direct channels carry length-prefixed frames of the same
//!   packets.
//! - **`types`**: `ClusterMessage` and its caller-observable execution status.
//! - **`registry`**: Maps handler names to the Rust code executed when a
//!   message arrives.
//! - **`channel`**: Lazily opened, cached point-to-point channels for targeted
//!   messages. One writer and one reader per channel, no shared lock.
//! - **`transport`**: The broadcast/targeted send paths, inbound execution,
//!   and ack reporting.

pub mod channel;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod types;

#[cfg(test)]
mod tests;
