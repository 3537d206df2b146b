//! Particle and particle population types.

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;

/// A single particle representing a possible robot pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Particle {
    /// Hypothesized robot pose.
    pub pose: Pose2D,
    /// Importance weight (unnormalized until [`ParticleCloud::normalize`]).
    pub weight: f64,
}

impl Particle {
    /// Create a new particle with unit weight.
    pub fn new(pose: Pose2D) -> Self {
        Self { pose, weight: 1.0 }
    }

    /// Create a new particle with specified weight.
    pub fn with_weight(pose: Pose2D, weight: f64) -> Self {
        Self { pose, weight }
    }
}

/// Ordered particle population.
///
/// Replaced wholesale on initialize and resample, never diffed.
#[derive(Debug, Clone, Default)]
pub struct ParticleCloud {
    particles: Vec<Particle>,
}

impl ParticleCloud {
    /// Create an empty population.
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
        }
    }

    /// Take ownership of an existing particle set.
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Replace the population wholesale.
    pub fn replace(&mut self, particles: Vec<Particle>) {
        self.particles = particles;
    }

    /// Discard all particles.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Total (possibly unnormalized) weight.
    pub fn total_weight(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }

    /// Normalize weights to sum to 1.
    ///
    /// If the total weight is zero, every particle falls back to the
    /// uniform weight 1/N instead. Idempotent on an already-normalized
    /// population.
    pub fn normalize(&mut self) {
        if self.particles.is_empty() {
            return;
        }
        let total = self.total_weight();
        if total > 0.0 {
            for p in self.particles.iter_mut() {
                p.weight /= total;
            }
        } else {
            let uniform = 1.0 / self.particles.len() as f64;
            for p in self.particles.iter_mut() {
                p.weight = uniform;
            }
        }
    }

    /// The maximum-weight particle, ties broken by first occurrence.
    pub fn best(&self) -> Option<&Particle> {
        let mut best: Option<&Particle> = None;
        for p in &self.particles {
            match best {
                Some(b) if p.weight <= b.weight => {}
                _ => best = Some(p),
            }
        }
        best
    }
}
