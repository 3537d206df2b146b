//! Filter controller: the MCL state machine.
//!
//! Owns the particle population, the adaptive particle-count schedule
//! and the update-gating thresholds, and drives one filter cycle per
//! delivered scan. All randomness flows through a single seeded RNG so
//! runs are reproducible when a nonzero seed is configured.

use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::math::{angle_diff, normalize_angle};
use crate::core::types::{PolarScan, Pose2D, Timestamped};
use crate::map::{MapError, OccupancyField};

use super::estimator::estimate_pose;
use super::motion_model::{MotionModel, MotionModelConfig, OdomDelta};
use super::particle::{Particle, ParticleCloud};
use super::resampler::{Resampler, ResamplerConfig};
use super::sensor_model::{CorrelationModel, SensorModelConfig};

/// Configuration for the filter controller.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Particle count at initialization.
    pub initial_particles: usize,

    /// Floor for the decayed particle count.
    pub min_particles: usize,

    /// Multiplicative decay applied to the particle count once per
    /// completed update cycle (< 1).
    pub decay_rate: f64,

    /// Linear movement threshold per axis before an update runs (meters).
    pub d_thresh: f64,

    /// Angular movement threshold before an update runs (radians).
    pub a_thresh: f64,

    /// Position spread for initialization (meters).
    pub sigma_xy_init: f64,

    /// Heading spread for pose-reset initialization (radians).
    pub sigma_theta_init: f64,

    /// Motion model noise.
    pub motion: MotionModelConfig,

    /// Sensor model parameters.
    pub sensor: SensorModelConfig,

    /// Resampling jitter.
    pub resample: ResamplerConfig,

    /// Random seed for deterministic behavior (0 for entropy).
    pub seed: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            initial_particles: 300,
            min_particles: 50,
            decay_rate: 0.98,
            d_thresh: 0.02,
            a_thresh: std::f64::consts::PI / 6.0,
            sigma_xy_init: 0.4,
            sigma_theta_init: 0.3,
            motion: MotionModelConfig::default(),
            sensor: SensorModelConfig::default(),
            resample: ResamplerConfig::default(),
            seed: 0,
        }
    }
}

/// What a call to [`MclFilter::handle_scan`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Scan had no valid samples; all state left untouched.
    Rejected,
    /// First odometry snapshot recorded, no filtering yet.
    AwaitingOdometry,
    /// Population was empty and has been re-initialized.
    Reinitialized,
    /// Full update cycle ran and produced a fresh estimate.
    Updated,
    /// Movement below thresholds; previous estimate still stands.
    Idle,
    /// Motion update discarded every particle; recovery on next scan.
    Collapsed,
}

/// Monte Carlo Localization filter.
pub struct MclFilter {
    config: FilterConfig,
    map: Arc<OccupancyField>,
    motion_model: MotionModel,
    sensor_model: CorrelationModel,
    resampler: Resampler,
    cloud: ParticleCloud,
    /// Current target population size (decays over time).
    target_count: usize,
    /// Odometry pose at the last filter update.
    last_odom: Option<Pose2D>,
    /// Latest pose estimate in the map frame.
    estimate: Option<Timestamped<Pose2D>>,
    rng: SmallRng,
}

impl MclFilter {
    /// Create a new filter with an empty population.
    ///
    /// The population is initialized lazily on the first scan after an
    /// odometry snapshot exists, or immediately via [`Self::reset_to`].
    pub fn new(config: FilterConfig, map: Arc<OccupancyField>) -> Result<Self, MapError> {
        if map.free_cell_count() == 0 {
            return Err(MapError::NoFreeSpace);
        }

        let rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };

        Ok(Self {
            motion_model: MotionModel::new(config.motion),
            sensor_model: CorrelationModel::new(config.sensor),
            resampler: Resampler::new(config.resample),
            cloud: ParticleCloud::new(),
            target_count: config.initial_particles.max(1),
            last_odom: None,
            estimate: None,
            rng,
            config,
            map,
        })
    }

    /// Latest pose estimate, if any cycle has produced one.
    pub fn estimate(&self) -> Option<&Timestamped<Pose2D>> {
        self.estimate.as_ref()
    }

    /// Current particle population.
    pub fn cloud(&self) -> &ParticleCloud {
        &self.cloud
    }

    /// Current target population size.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Run one filter cycle against a scan and its matching odometry pose.
    pub fn handle_scan(
        &mut self,
        scan: &PolarScan,
        odom_pose: Pose2D,
        timestamp_us: u64,
    ) -> CycleOutcome {
        if scan.is_empty() {
            warn!("rejecting scan with no valid samples");
            return CycleOutcome::Rejected;
        }

        let prev_odom = match self.last_odom {
            Some(p) => p,
            None => {
                debug!("recorded first odometry snapshot");
                self.last_odom = Some(odom_pose);
                return CycleOutcome::AwaitingOdometry;
            }
        };

        if self.cloud.is_empty() {
            self.initialize_free_space();
            self.last_odom = Some(odom_pose);
            info!(
                "re-initialized {} particles across free space",
                self.cloud.len()
            );
            return CycleOutcome::Reinitialized;
        }

        if !self.moved_beyond_thresholds(&prev_odom, &odom_pose) {
            return CycleOutcome::Idle;
        }

        // Full cycle: propagate, weigh, estimate, decay, resample
        let delta = OdomDelta::between(&prev_odom, &odom_pose);
        let survivors = self
            .motion_model
            .propagate(self.cloud.particles(), &delta, &self.map, &mut self.rng);
        self.last_odom = Some(odom_pose);

        if survivors.is_empty() {
            warn!("population collapsed during motion update");
            self.cloud.clear();
            return CycleOutcome::Collapsed;
        }
        self.cloud.replace(survivors);

        self.sensor_model
            .weigh(self.cloud.particles_mut(), scan, &self.map);

        if let Some(pose) = estimate_pose(&mut self.cloud) {
            self.estimate = Some(Timestamped::new(pose, timestamp_us));
        }

        self.target_count = ((self.target_count as f64 * self.config.decay_rate).floor()
            as usize)
            .max(self.config.min_particles)
            .max(1);

        let resampled =
            self.resampler
                .resample(self.cloud.particles(), self.target_count, &mut self.rng);
        self.cloud.replace(resampled);

        debug!(
            "update cycle complete, {} particles remain",
            self.cloud.len()
        );
        CycleOutcome::Updated
    }

    /// Unconditionally re-initialize the population around a supplied pose.
    ///
    /// The current population is discarded regardless of state. The next
    /// scan records a fresh odometry snapshot before filtering resumes.
    pub fn reset_to(&mut self, pose: Pose2D, timestamp_us: u64) {
        info!(
            "pose reset to ({:.3}, {:.3}, {:.3})",
            pose.x, pose.y, pose.theta
        );
        let weight = 1.0 / self.target_count as f64;
        let mut particles = Vec::with_capacity(self.target_count);
        for _ in 0..self.target_count {
            let nx: f64 = self.rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy_init;
            let ny: f64 = self.rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy_init;
            let nt: f64 =
                self.rng.sample::<f64, _>(StandardNormal) * self.config.sigma_theta_init;
            particles.push(Particle::with_weight(
                Pose2D {
                    x: pose.x + nx,
                    y: pose.y + ny,
                    theta: normalize_angle(pose.theta + nt),
                },
                weight,
            ));
        }
        self.cloud.replace(particles);
        self.estimate = Some(Timestamped::new(pose, timestamp_us));
        self.last_odom = None;
    }

    /// Kidnap recovery: spread the population over the map's free space.
    fn initialize_free_space(&mut self) {
        let weight = 1.0 / self.target_count as f64;
        let mut particles = Vec::with_capacity(self.target_count);
        for _ in 0..self.target_count {
            // Cannot fail: free_cell_count was checked at construction
            if let Ok(base) = self.map.sample_free_pose(&mut self.rng) {
                let nx: f64 =
                    self.rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy_init;
                let ny: f64 =
                    self.rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy_init;
                particles.push(Particle::with_weight(
                    Pose2D {
                        x: base.x + nx,
                        y: base.y + ny,
                        theta: base.theta,
                    },
                    weight,
                ));
            }
        }
        self.cloud.replace(particles);
    }

    fn moved_beyond_thresholds(&self, prev: &Pose2D, curr: &Pose2D) -> bool {
        (curr.x - prev.x).abs() > self.config.d_thresh
            || (curr.y - prev.y).abs() > self.config.d_thresh
            || angle_diff(curr.theta, prev.theta).abs() > self.config.a_thresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 40x40 open map at 0.1m covering [-2, 2) with an obstacle wall
    /// along the top edge.
    fn test_map() -> Arc<OccupancyField> {
        let width = 40;
        let height = 40;
        let mut cells = vec![0u8; width * height];
        for cx in 0..width {
            cells[(height - 1) * width + cx] = 1;
        }
        Arc::new(OccupancyField::from_cells(width, height, 0.1, -2.0, -2.0, cells).unwrap())
    }

    fn quiet_config() -> FilterConfig {
        FilterConfig {
            initial_particles: 40,
            min_particles: 10,
            sigma_xy_init: 0.0,
            sigma_theta_init: 0.0,
            motion: MotionModelConfig {
                sigma_xy: 0.0,
                sigma_theta: 0.0,
            },
            sensor: SensorModelConfig {
                close_obstacle_dist: 0.08,
                lidar_offset_x: 0.0,
            },
            resample: ResamplerConfig {
                sigma_xy: 0.0,
                sigma_theta: 0.0,
            },
            seed: 42,
            ..Default::default()
        }
    }

    fn simple_scan() -> PolarScan {
        PolarScan::new(vec![1.0], vec![0.0])
    }

    #[test]
    fn test_first_scan_records_snapshot_only() {
        let mut filter = MclFilter::new(quiet_config(), test_map()).unwrap();
        let outcome = filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);

        assert_eq!(outcome, CycleOutcome::AwaitingOdometry);
        assert!(filter.cloud().is_empty());
        assert!(filter.estimate().is_none());
    }

    #[test]
    fn test_empty_scan_rejected_without_side_effects() {
        let mut filter = MclFilter::new(quiet_config(), test_map()).unwrap();
        let outcome = filter.handle_scan(&PolarScan::default(), Pose2D::identity(), 1_000);

        assert_eq!(outcome, CycleOutcome::Rejected);
        assert!(filter.cloud().is_empty());
        // Not even the odometry snapshot should be recorded
        let outcome = filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);
        assert_eq!(outcome, CycleOutcome::AwaitingOdometry);
    }

    #[test]
    fn test_kidnap_recovery_fills_free_space() {
        let mut filter = MclFilter::new(quiet_config(), test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        let outcome = filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);

        assert_eq!(outcome, CycleOutcome::Reinitialized);
        assert_eq!(filter.cloud().len(), filter.target_count());
        for p in filter.cloud().particles() {
            assert!(filter.map.is_free(p.pose.x, p.pose.y));
        }
    }

    #[test]
    fn test_gating_is_strict() {
        let config = quiet_config();
        let d = config.d_thresh;
        let mut filter = MclFilter::new(config, test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);

        // Exactly at the threshold: no update
        let outcome = filter.handle_scan(&simple_scan(), Pose2D::new(d, 0.0, 0.0), 3_000);
        assert_eq!(outcome, CycleOutcome::Idle);

        // Just past it: update
        let outcome =
            filter.handle_scan(&simple_scan(), Pose2D::new(d + 1e-6, 0.0, 0.0), 4_000);
        assert_eq!(outcome, CycleOutcome::Updated);
    }

    #[test]
    fn test_angular_gating() {
        let config = quiet_config();
        let a = config.a_thresh;
        let mut filter = MclFilter::new(config, test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);

        let outcome =
            filter.handle_scan(&simple_scan(), Pose2D::new(0.0, 0.0, a + 1e-6), 3_000);
        assert_eq!(outcome, CycleOutcome::Updated);
    }

    #[test]
    fn test_update_produces_estimate_and_decays_count() {
        let mut filter = MclFilter::new(quiet_config(), test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);
        let before = filter.target_count();

        let outcome = filter.handle_scan(&simple_scan(), Pose2D::new(0.1, 0.0, 0.0), 3_000);

        assert_eq!(outcome, CycleOutcome::Updated);
        assert!(filter.estimate().is_some());
        assert_eq!(filter.estimate().unwrap().timestamp_us, 3_000);
        assert_eq!(filter.target_count(), (before as f64 * 0.98).floor() as usize);
        assert_eq!(filter.cloud().len(), filter.target_count());
    }

    #[test]
    fn test_decay_floors_at_minimum() {
        let mut config = quiet_config();
        config.initial_particles = 12;
        config.min_particles = 10;
        let mut filter = MclFilter::new(config, test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 0);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1);

        let mut odom_x = 0.0;
        for i in 0..50 {
            odom_x += 0.1;
            filter.handle_scan(&simple_scan(), Pose2D::new(odom_x % 1.0, 0.0, 0.0), i + 2);
        }
        assert_eq!(filter.target_count(), 10);
    }

    #[test]
    fn test_collapse_then_recovery() {
        // Tiny map: one free cell next to a wall; marching odometry far
        // off-map kills every particle
        let cells = vec![0u8, 1u8];
        let map = Arc::new(OccupancyField::from_cells(2, 1, 1.0, 0.0, 0.0, cells).unwrap());
        let mut filter = MclFilter::new(quiet_config(), map).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);
        assert!(!filter.cloud().is_empty());

        let outcome = filter.handle_scan(&simple_scan(), Pose2D::new(10.0, 0.0, 0.0), 3_000);
        assert_eq!(outcome, CycleOutcome::Collapsed);
        assert!(filter.cloud().is_empty());

        let outcome = filter.handle_scan(&simple_scan(), Pose2D::new(10.0, 0.0, 0.0), 4_000);
        assert_eq!(outcome, CycleOutcome::Reinitialized);
        assert_eq!(filter.cloud().len(), filter.target_count());
    }

    #[test]
    fn test_reset_to_discards_population_unconditionally() {
        let mut filter = MclFilter::new(quiet_config(), test_map()).unwrap();
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 1_000);
        filter.handle_scan(&simple_scan(), Pose2D::identity(), 2_000);

        let target = Pose2D::new(0.5, -0.5, 1.0);
        filter.reset_to(target, 5_000);

        assert_eq!(filter.cloud().len(), filter.target_count());
        for p in filter.cloud().particles() {
            // Zero init sigma: every particle sits exactly on the reset pose
            assert_relative_eq!(p.pose.x, 0.5);
            assert_relative_eq!(p.pose.y, -0.5);
            assert_relative_eq!(p.pose.theta, 1.0);
        }
        let est = filter.estimate().unwrap();
        assert_relative_eq!(est.data.x, 0.5);
        assert_eq!(est.timestamp_us, 5_000);
    }

    #[test]
    fn test_best_particle_matches_obstacle_geometry() {
        // Four known hypotheses, obstacle seen 1m straight ahead. Only
        // the pose facing the top wall from 1m away projects the
        // endpoint onto an obstacle.
        let map = test_map();
        let mut filter = MclFilter::new(quiet_config(), Arc::clone(&map)).unwrap();

        let mut particles = vec![
            Particle::new(Pose2D::new(0.0, 0.0, 0.0)),
            Particle::new(Pose2D::new(1.0, 0.0, 0.0)),
            Particle::new(Pose2D::new(0.0, 1.0, 0.0)),
            // Wall top edge is at y = 1.9; from (0, 0.95) facing +y the
            // endpoint lands at (0, 1.95), inside the wall cells
            Particle::new(Pose2D::new(0.0, 0.95, std::f64::consts::FRAC_PI_2)),
        ];
        filter
            .sensor_model
            .weigh(&mut particles, &simple_scan(), &map);

        let mut cloud = ParticleCloud::from_particles(particles);
        let pose = estimate_pose(&mut cloud).unwrap();
        assert_relative_eq!(pose.y, 0.95);
        assert_relative_eq!(pose.theta, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_filter_rejects_map_without_free_space() {
        let map = Arc::new(OccupancyField::from_cells(1, 1, 1.0, 0.0, 0.0, vec![1u8]).unwrap());
        assert!(matches!(
            MclFilter::new(quiet_config(), map),
            Err(MapError::NoFreeSpace)
        ));
    }
}
