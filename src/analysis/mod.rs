//! Analysis modules.
//!
//! The aggregator computes citizen counts; the refresh tracker and run
//! slot keep repeated runs from overlapping or overwriting each other.

pub mod aggregator;
pub mod refresh;

pub use aggregator::Aggregator;
pub use refresh::{RefreshTracker, RunSlot, RunTicket};
