//! Pose extraction from the particle population.
//!
//! Mode-seeking: the estimate is the maximum-weight particle, not the
//! weighted mean. Under multimodal beliefs the mean can land between
//! modes in impossible space; the mode cannot.

use crate::core::types::Pose2D;

use super::particle::ParticleCloud;

/// Normalize the population and return the maximum-weight pose.
///
/// Ties are broken by first occurrence in iteration order. Returns
/// `None` for an empty population.
pub fn estimate_pose(cloud: &mut ParticleCloud) -> Option<Pose2D> {
    cloud.normalize();
    cloud.best().map(|p| p.pose)
}
