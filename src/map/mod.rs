//! Static map layer.

pub mod occupancy_field;

pub use occupancy_field::{MapError, OccupancyField};
