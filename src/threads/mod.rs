//! Thread management for the multi-threaded localization daemon.
//!
//! Three main threads plus the UDP receiver and TCP accept loops:
//! - `EstimationThread`: filter state machine driven by incoming scans
//! - `CorrectionThread`: fixed-rate map->odom transform publication
//! - `PublisherThread`: streams estimate, population and diagnostics

mod correction_thread;
mod estimation_thread;
mod publisher_thread;

pub use correction_thread::{CorrectionThread, CorrectionThreadConfig};
pub use estimation_thread::{EstimationThread, EstimationThreadConfig};
pub use publisher_thread::{PublisherThread, PublisherThreadConfig};
