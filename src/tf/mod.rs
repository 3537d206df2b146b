//! Coordinate-frame bookkeeping: odometry history and map->odom
//! correction.

pub mod correction;
pub mod odom_history;

pub use correction::{map_to_odom, Correction, CorrectionSlot};
pub use odom_history::{OdomHistory, PoseLookup};
