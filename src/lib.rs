//! DhruvaMCL - Monte Carlo Localization daemon for mobile robots.
//!
//! Estimates a robot's pose on a known occupancy map by maintaining a
//! weighted population of pose hypotheses, updated from odometry and
//! lidar range scans.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               threads/ + state/                     │  ← Daemon shell
//! │    (estimation, correction, publisher, channels)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Transport
//! │      (UDP sensor input, TCP stream output)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              localization/ + tf/                    │  ← Core algorithms
//! │   (filter, motion, sensor, resampler, correction)   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                 core/ + map/                        │  ← Foundation
//! │         (types, math, occupancy field)              │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod io;
pub mod localization;
pub mod map;
pub mod state;
pub mod tf;
pub mod threads;

pub use crate::core::types::{LaserScan, Point2D, PolarScan, Pose2D, Timestamped};
pub use crate::localization::{CycleOutcome, FilterConfig, MclFilter, Particle, ParticleCloud};
pub use crate::map::OccupancyField;
