//! Coordination Barrier Module
//!
//! A registry of activities that must run exactly once, synchronized to the
//! moment the initial membership view becomes stable. Dependent subsystems
//! register setup work here (the message transport registers its own listener
//! startup) instead of racing initialization order.
//!
//! ## Semantics
//! - Activities run strictly in registration order on a single task; there is
//!   no concurrency between activities.
//! - Each activity transitions `Pending -> Executing -> Complete` at most once.
//! - Firing the barrier a second time is a no-op.
//! - Activities registered after the barrier has fired are accepted but never
//!   executed: a late joiner is skipped, forever `Pending`.

pub mod barrier;


pub use barrier::{ActivityHandle, ActivityState, CoordinationBarrier};
