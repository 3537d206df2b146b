//! JSON message types for the transport boundary.
//!
//! Inbound sensor traffic arrives as one JSON object per UDP datagram.
//! Outbound streaming uses newline-delimited JSON over TCP.

use serde::{Deserialize, Serialize};

use crate::core::types::{LaserScan, Pose2D, Timestamped};
use crate::localization::Particle;
use crate::state::FilterStats;
use crate::tf::Correction;

/// Inbound sensor and command messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorMessage {
    /// Odometry pose sample.
    Odometry {
        timestamp_us: u64,
        x: f64,
        y: f64,
        theta: f64,
    },
    /// Raw lidar scan.
    Scan {
        timestamp_us: u64,
        angle_min: f64,
        angle_increment: f64,
        range_min: f64,
        range_max: f64,
        ranges: Vec<f64>,
    },
    /// External pose-reset request.
    SetPose {
        timestamp_us: u64,
        x: f64,
        y: f64,
        theta: f64,
    },
}

impl SensorMessage {
    /// Extract an odometry sample, if this is one.
    pub fn as_odometry(&self) -> Option<Timestamped<Pose2D>> {
        match *self {
            SensorMessage::Odometry {
                timestamp_us,
                x,
                y,
                theta,
            } => Some(Timestamped::new(Pose2D::new(x, y, theta), timestamp_us)),
            _ => None,
        }
    }

    /// Extract a scan, if this is one.
    pub fn as_scan(&self) -> Option<Timestamped<LaserScan>> {
        match self {
            SensorMessage::Scan {
                timestamp_us,
                angle_min,
                angle_increment,
                range_min,
                range_max,
                ranges,
            } => Some(Timestamped::new(
                LaserScan::new(
                    *angle_min,
                    *angle_increment,
                    *range_min,
                    *range_max,
                    ranges.clone(),
                ),
                *timestamp_us,
            )),
            _ => None,
        }
    }
}

/// Outbound streaming messages for visualization clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Latest pose estimate in the map frame.
    PoseEstimate {
        timestamp_us: u64,
        x: f64,
        y: f64,
        theta: f64,
    },
    /// Particle population snapshot: [x, y, theta, weight] per particle.
    ParticleCloud {
        timestamp_us: u64,
        particles: Vec<[f64; 4]>,
    },
    /// Last accepted scan, republished for visualization.
    Scan {
        timestamp_us: u64,
        angle_min: f64,
        angle_increment: f64,
        range_min: f64,
        range_max: f64,
        ranges: Vec<f64>,
    },
    /// Map->odom correction transform.
    MapToOdom {
        timestamp_us: u64,
        x: f64,
        y: f64,
        theta: f64,
    },
    /// Filter diagnostics.
    Status {
        timestamp_us: u64,
        update_cycles: u64,
        scans_dropped: u64,
        scans_rejected: u64,
        particle_count: usize,
    },
}

impl StreamMessage {
    pub fn pose_estimate(estimate: &Timestamped<Pose2D>) -> Self {
        StreamMessage::PoseEstimate {
            timestamp_us: estimate.timestamp_us,
            x: estimate.data.x,
            y: estimate.data.y,
            theta: estimate.data.theta,
        }
    }

    pub fn particle_cloud(particles: &[Particle], timestamp_us: u64) -> Self {
        StreamMessage::ParticleCloud {
            timestamp_us,
            particles: particles
                .iter()
                .map(|p| [p.pose.x, p.pose.y, p.pose.theta, p.weight])
                .collect(),
        }
    }

    pub fn scan(scan: &Timestamped<LaserScan>) -> Self {
        StreamMessage::Scan {
            timestamp_us: scan.timestamp_us,
            angle_min: scan.data.angle_min,
            angle_increment: scan.data.angle_increment,
            range_min: scan.data.range_min,
            range_max: scan.data.range_max,
            ranges: scan.data.ranges.clone(),
        }
    }

    pub fn map_to_odom(correction: &Correction, publish_timestamp_us: u64) -> Self {
        StreamMessage::MapToOdom {
            timestamp_us: publish_timestamp_us,
            x: correction.transform.x,
            y: correction.transform.y,
            theta: correction.transform.theta,
        }
    }

    pub fn status(stats: &FilterStats, timestamp_us: u64) -> Self {
        StreamMessage::Status {
            timestamp_us,
            update_cycles: stats.update_cycles,
            scans_dropped: stats.scans_dropped,
            scans_rejected: stats.scans_rejected,
            particle_count: stats.particle_count,
        }
    }
}
