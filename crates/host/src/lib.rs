//! Simulated worker hosts.
//!
//! Each [`Host`] owns a priority queue and a single execution slot, and
//! runs an independent execution loop on the tokio runtime. The loop is
//! timer-driven: a running task is a `sleep_until` to its completion
//! deadline, interrupted only by a preemption signal.

pub mod host;
pub mod queue;

pub use host::{Host, HostId};
pub use queue::TaskQueue;
