//! Cluster Configuration Model
//!
//! Immutable description of the membership scheme this node runs with. The
//! configuration is produced by an external loader (file parsing is out of
//! scope here) and handed to the cluster once at startup; the core only reads
//! it for the lifetime of the process.
//!
//! The membership scheme is a tagged union selected by an explicit
//! discriminator. Only the multicast variant is implemented; other variants
//! are rejected during initialization.

pub mod types;

#[cfg(test)]
mod tests;

pub use types::{ClusterConfiguration, MembershipScheme, MulticastConfig, DEFAULT_DISCOVERY_WINDOW};
