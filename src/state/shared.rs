//! Thread-safe shared state for the localization daemon.
//!
//! Shared between:
//! - Estimation Thread: primary writer (estimate, population snapshot, stats)
//! - Publisher Thread: reads for streaming to clients

use std::sync::{Arc, RwLock};

use crate::core::types::{LaserScan, Pose2D, Timestamped};
use crate::localization::Particle;

/// Filter operating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// No population yet, waiting for data.
    #[default]
    Uninitialized,
    /// Tracking with a live population.
    Tracking,
    /// Population collapsed, recovering on the next scan.
    Recovering,
}

/// Running statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterStats {
    /// Completed update cycles.
    pub update_cycles: u64,
    /// Scans dropped because their odometry was no longer available.
    pub scans_dropped: u64,
    /// Scans rejected as malformed.
    pub scans_rejected: u64,
    /// Current particle count.
    pub particle_count: usize,
    /// Timestamp of the last completed update (microseconds).
    pub last_update_us: u64,
}

/// State shared between the daemon threads.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Latest pose estimate in the map frame.
    pub estimate: Option<Timestamped<Pose2D>>,

    /// Snapshot of the particle population for visualization.
    pub cloud: Vec<Particle>,

    /// Last scan the filter accepted, republished for visualization.
    pub last_scan: Option<Timestamped<LaserScan>>,

    /// Current filter operating state.
    pub filter_state: FilterState,

    /// Running statistics.
    pub stats: FilterStats,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Thread-safe handle to shared state.
pub type SharedStateHandle = Arc<RwLock<SharedState>>;

/// Create a new shared state handle with default values.
pub fn create_shared_state() -> SharedStateHandle {
    Arc::new(RwLock::new(SharedState::new()))
}
