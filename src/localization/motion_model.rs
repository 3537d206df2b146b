//! Odometry-driven motion model.
//!
//! Propagates every particle by the robot's incremental displacement
//! since the previous filter update, plus Gaussian process noise.
//! Particles that land outside free space are discarded; the population
//! may shrink below the target count until the next resample.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::core::math::normalize_angle;
use crate::core::types::Pose2D;
use crate::map::OccupancyField;

use super::particle::Particle;

/// Incremental displacement in the robot's local frame.
#[derive(Debug, Clone, Copy)]
pub struct OdomDelta {
    /// Forward displacement (meters).
    pub dx: f64,
    /// Lateral displacement (meters).
    pub dy: f64,
    /// Heading change (radians).
    pub dtheta: f64,
}

impl OdomDelta {
    /// Displacement between two odometry snapshots, expressed in the
    /// heading frame of the previous snapshot.
    pub fn between(prev: &Pose2D, curr: &Pose2D) -> Self {
        let dx_odom = curr.x - prev.x;
        let dy_odom = curr.y - prev.y;
        let (sin_t, cos_t) = prev.theta.sin_cos();

        Self {
            dx: cos_t * dx_odom + sin_t * dy_odom,
            dy: -sin_t * dx_odom + cos_t * dy_odom,
            dtheta: normalize_angle(curr.theta - prev.theta),
        }
    }
}

/// Configuration for the motion model.
#[derive(Debug, Clone, Copy)]
pub struct MotionModelConfig {
    /// Process noise on x and y per update (meters).
    pub sigma_xy: f64,
    /// Process noise on heading per update (radians).
    pub sigma_theta: f64,
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        Self {
            sigma_xy: 0.1,
            sigma_theta: 0.1,
        }
    }
}

/// Gaussian-noise motion model with free-space rejection.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionModelConfig,
}

impl MotionModel {
    pub fn new(config: MotionModelConfig) -> Self {
        Self { config }
    }

    /// Propagate the population by one odometry delta.
    ///
    /// The local displacement is rotated into each particle's own
    /// heading before being applied. Survivors are collected into a new
    /// vector; particles whose updated position is not on a free map
    /// cell are dropped.
    pub fn propagate<R: Rng>(
        &self,
        particles: &[Particle],
        delta: &OdomDelta,
        map: &OccupancyField,
        rng: &mut R,
    ) -> Vec<Particle> {
        let mut survivors = Vec::with_capacity(particles.len());

        for p in particles {
            let (sin_t, cos_t) = p.pose.theta.sin_cos();
            let noise_x: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy;
            let noise_y: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy;
            let noise_t: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_theta;

            let x = p.pose.x + delta.dx * cos_t - delta.dy * sin_t + noise_x;
            let y = p.pose.y + delta.dx * sin_t + delta.dy * cos_t + noise_y;
            let theta = normalize_angle(p.pose.theta + delta.dtheta + noise_t);

            if map.is_free(x, y) {
                survivors.push(Particle::with_weight(Pose2D { x, y, theta }, p.weight));
            }
        }

        survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::f64::consts::FRAC_PI_2;

    fn open_map() -> OccupancyField {
        // 20x20 free cells at 0.5m, origin at (-5, -5)
        OccupancyField::from_cells(20, 20, 0.5, -5.0, -5.0, vec![0u8; 400]).unwrap()
    }

    fn zero_noise() -> MotionModel {
        MotionModel::new(MotionModelConfig {
            sigma_xy: 0.0,
            sigma_theta: 0.0,
        })
    }

    #[test]
    fn test_delta_in_previous_heading_frame() {
        // Robot facing +y moves one meter forward in odometry frame
        let prev = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let curr = Pose2D::new(0.0, 1.0, FRAC_PI_2);
        let delta = OdomDelta::between(&prev, &curr);

        assert_relative_eq!(delta.dx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(delta.dy, 0.0, epsilon = 1e-12);
        assert_relative_eq!(delta.dtheta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_heading_wraps() {
        let prev = Pose2D::new(0.0, 0.0, 3.0);
        let curr = Pose2D::new(0.0, 0.0, -3.0);
        let delta = OdomDelta::between(&prev, &curr);

        // Short way around, not -6.0
        assert_relative_eq!(delta.dtheta, 2.0 * std::f64::consts::PI - 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_noise_determinism() {
        let map = open_map();
        let mut rng = SmallRng::seed_from_u64(42);
        let particles = vec![Particle::new(Pose2D::identity())];
        let delta = OdomDelta {
            dx: 1.0,
            dy: 0.0,
            dtheta: 0.0,
        };

        let moved = zero_noise().propagate(&particles, &delta, &map, &mut rng);

        assert_eq!(moved.len(), 1);
        assert_relative_eq!(moved[0].pose.x, 1.0);
        assert_relative_eq!(moved[0].pose.y, 0.0);
        assert_relative_eq!(moved[0].pose.theta, 0.0);
    }

    #[test]
    fn test_displacement_rotated_into_particle_heading() {
        let map = open_map();
        let mut rng = SmallRng::seed_from_u64(42);
        // Particle facing +y; forward delta should move it along +y
        let particles = vec![Particle::new(Pose2D::new(0.0, 0.0, FRAC_PI_2))];
        let delta = OdomDelta {
            dx: 1.0,
            dy: 0.0,
            dtheta: 0.0,
        };

        let moved = zero_noise().propagate(&particles, &delta, &map, &mut rng);

        assert_relative_eq!(moved[0].pose.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(moved[0].pose.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_occupied_cell_discards_particle() {
        // Single-row map: free, occupied
        let map = OccupancyField::from_cells(2, 1, 1.0, 0.0, 0.0, vec![0u8, 1u8]).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let particles = vec![Particle::new(Pose2D::new(0.5, 0.5, 0.0))];
        let delta = OdomDelta {
            dx: 1.0,
            dy: 0.0,
            dtheta: 0.0,
        };

        let moved = zero_noise().propagate(&particles, &delta, &map, &mut rng);
        assert!(moved.is_empty());
    }

    #[test]
    fn test_off_map_discards_particle() {
        let map = open_map();
        let mut rng = SmallRng::seed_from_u64(42);
        let particles = vec![Particle::new(Pose2D::new(4.5, 0.0, 0.0))];
        let delta = OdomDelta {
            dx: 2.0,
            dy: 0.0,
            dtheta: 0.0,
        };

        let moved = zero_noise().propagate(&particles, &delta, &map, &mut rng);
        assert!(moved.is_empty());
    }

    #[test]
    fn test_weight_carried_through() {
        let map = open_map();
        let mut rng = SmallRng::seed_from_u64(42);
        let particles = vec![Particle::with_weight(Pose2D::identity(), 0.7)];
        let delta = OdomDelta {
            dx: 0.0,
            dy: 0.0,
            dtheta: 0.1,
        };

        let moved = zero_noise().propagate(&particles, &delta, &map, &mut rng);
        assert_relative_eq!(moved[0].weight, 0.7);
    }
}
