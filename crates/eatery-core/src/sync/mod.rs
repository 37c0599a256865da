//! Offline write handling.
//!
//! Writes made while disconnected are parked in `OfflineQueues` and pushed
//! to the gateway on the next offline-to-online transition reported by
//! `Connectivity`. Delivery is at-most-once: a drain empties the queues
//! whether or not each forwarded write succeeded.

pub mod connectivity;
pub mod queue;

pub use connectivity::Connectivity;
pub use queue::{DrainReport, OfflineQueue, OfflineQueues, SyncReport};
