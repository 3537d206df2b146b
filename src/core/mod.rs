//! Foundation layer: math helpers and shared data types.
//!
//! This layer has no dependencies on the rest of the crate.

pub mod math;
pub mod types;

pub use types::{LaserScan, Point2D, PolarScan, Pose2D, Timestamped};
