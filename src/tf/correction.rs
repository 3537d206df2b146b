//! Map to odometry frame correction.
//!
//! The filter estimates the robot's pose in the map frame while
//! odometry drifts in its own frame. The correction transform
//! reconciles the two: composing it with the current odometry pose
//! yields the map-frame pose.

use std::sync::{Arc, RwLock};

use crate::core::types::Pose2D;

/// A computed map->odom correction, stamped with its source scan time.
#[derive(Debug, Clone, Copy)]
pub struct Correction {
    /// Transform taking odometry-frame poses into the map frame.
    pub transform: Pose2D,
    /// Timestamp of the scan the correction was computed from.
    pub timestamp_us: u64,
}

/// Compute the map->odom correction from a map-frame estimate and the
/// odometry pose at the same instant.
pub fn map_to_odom(map_pose: &Pose2D, odom_pose: &Pose2D) -> Pose2D {
    map_pose.compose(&odom_pose.inverse())
}

/// Shared slot holding the last computed correction.
///
/// Written by the estimation loop, read by the correction publisher.
#[derive(Debug, Clone, Default)]
pub struct CorrectionSlot {
    inner: Arc<RwLock<Option<Correction>>>,
}

impl CorrectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored correction.
    pub fn store(&self, correction: Correction) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(correction);
        }
    }

    /// Latest correction, if any estimate has been produced yet.
    pub fn latest(&self) -> Option<Correction> {
        self.inner.read().ok().and_then(|slot| *slot)
    }
}
