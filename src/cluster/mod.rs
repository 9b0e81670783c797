//! Cluster Facade
//!
//! Wires the subsystems together behind one object: configuration in, a
//! discovered membership view, a fired coordination barrier, and a usable
//! message transport out. State that used to be ambient in systems like this
//! (a global registry/config holder) lives in an explicit [`ClusterContext`]
//! that is passed down instead.
//!
//! ## Initialization Flow
//! 1. `Cluster::new` validates the scheme, binds the multicast socket and the
//!    direct-channel listener, and registers the transport's startup as the
//!    first coordinated activity. Nothing network-visible happens yet.
//! 2. `initialize` starts discovery, blocks for the discovery window, fires
//!    the barrier once, and returns. Discovery keeps maintaining the view in
//!    the background for the life of the node.

pub mod node;


pub use node::{Cluster, ClusterContext};
