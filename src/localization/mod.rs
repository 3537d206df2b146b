//! Monte Carlo Localization.
//!
//! Particle representation, motion propagation, correlation-based
//! sensor weighting, weighted resampling and the filter controller
//! tying them together.

pub mod estimator;
pub mod filter;
pub mod motion_model;
pub mod particle;
pub mod resampler;
pub mod sensor_model;

pub use filter::{CycleOutcome, FilterConfig, MclFilter};
pub use motion_model::{MotionModel, MotionModelConfig, OdomDelta};
pub use particle::{Particle, ParticleCloud};
pub use resampler::{Resampler, ResamplerConfig};
pub use sensor_model::{CorrelationModel, SensorModelConfig};
