//! Range scan types.
//!
//! [`LaserScan`] is the raw sensor reading: evenly spaced beams in the
//! sensor frame with per-beam range. [`PolarScan`] is the filtered
//! robot-frame form the filter consumes: parallel `(range, bearing)`
//! arrays with invalid beams already removed.

use serde::{Deserialize, Serialize};

use crate::core::types::Point2D;

/// Raw LiDAR scan in polar coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserScan {
    /// Angle of the first beam (radians).
    pub angle_min: f64,
    /// Angular step between beams (radians).
    pub angle_increment: f64,
    /// Minimum valid range (meters).
    pub range_min: f64,
    /// Maximum valid range (meters).
    pub range_max: f64,
    /// Per-beam range readings (meters).
    pub ranges: Vec<f64>,
}

impl LaserScan {
    /// Create a new scan.
    pub fn new(
        angle_min: f64,
        angle_increment: f64,
        range_min: f64,
        range_max: f64,
        ranges: Vec<f64>,
    ) -> Self {
        Self {
            angle_min,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of beams (including invalid ones).
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the scan has no beams at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Convert to robot-frame polar samples, dropping invalid beams.
    ///
    /// A beam is invalid when its range is non-finite, below `range_min`,
    /// or above `range_max`.
    pub fn to_polar(&self) -> PolarScan {
        let mut ranges = Vec::with_capacity(self.ranges.len());
        let mut bearings = Vec::with_capacity(self.ranges.len());

        for (i, &r) in self.ranges.iter().enumerate() {
            if !r.is_finite() || r < self.range_min || r > self.range_max {
                continue;
            }
            ranges.push(r);
            bearings.push(self.angle_min + i as f64 * self.angle_increment);
        }

        PolarScan { ranges, bearings }
    }
}

/// Valid scan samples in the robot frame: parallel range/bearing arrays.
#[derive(Debug, Clone, Default)]
pub struct PolarScan {
    /// Range per sample (meters).
    pub ranges: Vec<f64>,
    /// Bearing per sample (radians, robot frame).
    pub bearings: Vec<f64>,
}

impl PolarScan {
    /// Create from parallel range/bearing arrays.
    ///
    /// Both arrays must have the same length.
    pub fn new(ranges: Vec<f64>, bearings: Vec<f64>) -> Self {
        debug_assert_eq!(ranges.len(), bearings.len());
        Self { ranges, bearings }
    }

    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the scan carries no valid samples.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Convert to Cartesian points in the robot frame.
    ///
    /// `offset_x` is the lidar mounting offset: a fixed translation along
    /// the robot's x axis applied after the polar-to-Cartesian conversion.
    pub fn to_points(&self, offset_x: f64) -> Vec<Point2D> {
        self.ranges
            .iter()
            .zip(self.bearings.iter())
            .map(|(&r, &b)| Point2D::new(r * b.cos() + offset_x, r * b.sin()))
            .collect()
    }
}
