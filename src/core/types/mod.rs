//! Core data types shared across the crate.

pub mod pose;
pub mod scan;
pub mod timestamped;

pub use pose::{Point2D, Pose2D};
pub use scan::{LaserScan, PolarScan};
pub use timestamped::{now_us, Timestamped};
