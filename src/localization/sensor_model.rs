//! Correlation sensor model.
//!
//! Scores each particle by transforming the scan endpoints into the map
//! frame at that particle's pose and counting how many land close to a
//! mapped obstacle. The score is a raw correlation count, not a
//! normalized probability; normalization happens at the population
//! level afterwards.

use crate::core::types::{Point2D, PolarScan};
use crate::map::OccupancyField;

use super::particle::Particle;

/// Configuration for the correlation model.
#[derive(Debug, Clone, Copy)]
pub struct SensorModelConfig {
    /// A scan endpoint closer than this to an obstacle counts as a hit (meters).
    pub close_obstacle_dist: f64,
    /// Lidar mounting offset along the robot's x axis (meters).
    pub lidar_offset_x: f64,
}

impl Default for SensorModelConfig {
    fn default() -> Self {
        Self {
            close_obstacle_dist: 0.01,
            lidar_offset_x: -0.084,
        }
    }
}

/// Obstacle-correlation sensor model.
#[derive(Debug, Clone)]
pub struct CorrelationModel {
    config: SensorModelConfig,
}

impl CorrelationModel {
    pub fn new(config: SensorModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SensorModelConfig {
        &self.config
    }

    /// Reweigh the population against a scan.
    ///
    /// Every particle's weight is reset and set to the number of scan
    /// endpoints whose nearest-obstacle distance falls below the
    /// closeness threshold. Previous weights never carry over.
    pub fn weigh(&self, particles: &mut [Particle], scan: &PolarScan, map: &OccupancyField) {
        // Robot-frame endpoints are pose-independent, compute them once
        let local_points = scan.to_points(self.config.lidar_offset_x);

        for p in particles.iter_mut() {
            p.weight = 0.0;

            let (sin_t, cos_t) = p.pose.theta.sin_cos();
            let mut hits = 0usize;

            for lp in &local_points {
                let world = Point2D::new(
                    p.pose.x + lp.x * cos_t - lp.y * sin_t,
                    p.pose.y + lp.x * sin_t + lp.y * cos_t,
                );
                if map.nearest_obstacle_distance(&world) < self.config.close_obstacle_dist {
                    hits += 1;
                }
            }

            p.weight = hits as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pose2D;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// 30x30 map at 0.1m covering [-1, 2) with obstacles at world
    /// (1.0, 0.0) and (0.0, 1.0).
    fn two_obstacle_map() -> OccupancyField {
        let width = 30;
        let height = 30;
        let mut cells = vec![0u8; width * height];
        // (1.0, 0.0) -> cell (20, 10); (0.0, 1.0) -> cell (10, 20)
        cells[10 * width + 20] = 1;
        cells[20 * width + 10] = 1;
        OccupancyField::from_cells(width, height, 0.1, -1.0, -1.0, cells).unwrap()
    }

    fn model() -> CorrelationModel {
        CorrelationModel::new(SensorModelConfig {
            close_obstacle_dist: 0.08,
            lidar_offset_x: 0.0,
        })
    }

    #[test]
    fn test_matching_pose_scores_highest() {
        let map = two_obstacle_map();
        // Obstacle seen 1m dead ahead
        let scan = PolarScan::new(vec![1.0], vec![0.0]);

        let mut particles = vec![
            Particle::new(Pose2D::new(0.0, 0.0, 0.0)),
            Particle::new(Pose2D::new(0.55, 0.0, 0.0)),
            Particle::new(Pose2D::new(0.0, 0.55, 0.0)),
            Particle::new(Pose2D::new(0.0, 0.0, FRAC_PI_2)),
        ];
        model().weigh(&mut particles, &scan, &map);

        // Particle at origin facing +x projects the endpoint onto the
        // obstacle at (1, 0); the one facing +y onto the obstacle at (0, 1).
        assert_relative_eq!(particles[0].weight, 1.0);
        assert_relative_eq!(particles[1].weight, 0.0);
        assert_relative_eq!(particles[2].weight, 0.0);
        assert_relative_eq!(particles[3].weight, 1.0);
    }

    #[test]
    fn test_weight_reset_each_call() {
        let map = two_obstacle_map();
        let scan = PolarScan::new(vec![1.0], vec![0.0]);

        let mut particles = vec![Particle::with_weight(Pose2D::new(0.4, -0.4, 0.0), 99.0)];
        model().weigh(&mut particles, &scan, &map);

        // No hit from here; old weight must not survive
        assert_relative_eq!(particles[0].weight, 0.0);
    }

    #[test]
    fn test_empty_scan_zeroes_all_weights() {
        let map = two_obstacle_map();
        let scan = PolarScan::default();

        let mut particles = vec![Particle::with_weight(Pose2D::identity(), 5.0)];
        model().weigh(&mut particles, &scan, &map);

        assert_relative_eq!(particles[0].weight, 0.0);
    }

    #[test]
    fn test_mounting_offset_shifts_endpoints() {
        let map = two_obstacle_map();
        let offset_model = CorrelationModel::new(SensorModelConfig {
            close_obstacle_dist: 0.08,
            lidar_offset_x: -0.1,
        });
        // Range 1.1 plus -0.1 offset puts the endpoint back at x = 1.0
        let scan = PolarScan::new(vec![1.1], vec![0.0]);

        let mut particles = vec![Particle::new(Pose2D::identity())];
        offset_model.weigh(&mut particles, &scan, &map);

        assert_relative_eq!(particles[0].weight, 1.0);
    }
}
