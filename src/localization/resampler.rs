//! Weighted resampling with replacement.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::core::math::normalize_angle;
use crate::core::types::Pose2D;

use super::particle::Particle;

/// Configuration for resampling jitter.
#[derive(Debug, Clone, Copy)]
pub struct ResamplerConfig {
    /// Jitter on x and y per drawn particle (meters).
    pub sigma_xy: f64,
    /// Jitter on heading per drawn particle (radians).
    pub sigma_theta: f64,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            sigma_xy: 0.07,
            sigma_theta: 0.3,
        }
    }
}

/// Categorical resampler using cumulative-distribution inversion.
#[derive(Debug, Clone)]
pub struct Resampler {
    config: ResamplerConfig,
}

impl Resampler {
    pub fn new(config: ResamplerConfig) -> Self {
        Self { config }
    }

    /// Draw `target` particles with replacement, proportional to weight.
    ///
    /// Weights need not be normalized. Zero-weight particles are never
    /// selected unless all weights are zero, in which case selection is
    /// uniform. Every drawn particle is a fresh copy with independent
    /// Gaussian jitter and weight 1/target.
    pub fn resample<R: Rng>(
        &self,
        particles: &[Particle],
        target: usize,
        rng: &mut R,
    ) -> Vec<Particle> {
        if particles.is_empty() || target == 0 {
            return Vec::new();
        }

        let total: f64 = particles.iter().map(|p| p.weight).sum();
        let uniform_fallback = total <= 0.0;
        let new_weight = 1.0 / target as f64;
        let mut drawn = Vec::with_capacity(target);

        for _ in 0..target {
            let source = if uniform_fallback {
                &particles[rng.gen_range(0..particles.len())]
            } else {
                let u = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut selected = particles.len() - 1;
                for (i, p) in particles.iter().enumerate() {
                    cumulative += p.weight;
                    if u < cumulative {
                        selected = i;
                        break;
                    }
                }
                &particles[selected]
            };

            let noise_x: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy;
            let noise_y: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_xy;
            let noise_t: f64 = rng.sample::<f64, _>(StandardNormal) * self.config.sigma_theta;

            drawn.push(Particle::with_weight(
                Pose2D {
                    x: source.pose.x + noise_x,
                    y: source.pose.y + noise_y,
                    theta: normalize_angle(source.pose.theta + noise_t),
                },
                new_weight,
            ));
        }

        drawn
    }
}
