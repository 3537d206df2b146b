//! Time-indexed odometry history.
//!
//! Buffers recent odometry poses so the estimation loop can resolve
//! the robot's odometry pose at a scan's timestamp, interpolating
//! between the two surrounding samples.

use std::collections::VecDeque;

use crate::core::types::{Pose2D, Timestamped};

/// Result of a timestamped pose lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseLookup {
    /// Pose resolved (interpolated when between samples).
    Found(Pose2D),
    /// Timestamp is newer than the latest sample; retry later.
    NotYetAvailable,
    /// Timestamp predates the retained history; will never resolve.
    TooOld,
}

/// Ring buffer of odometry samples ordered by timestamp.
#[derive(Debug)]
pub struct OdomHistory {
    samples: VecDeque<Timestamped<Pose2D>>,
    /// Retention window in microseconds.
    retention_us: u64,
}

impl OdomHistory {
    pub fn new(retention_us: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            retention_us,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Latest buffered sample.
    pub fn latest(&self) -> Option<&Timestamped<Pose2D>> {
        self.samples.back()
    }

    /// Append a sample and evict anything older than the retention window.
    ///
    /// Out-of-order samples (timestamp not after the latest) are ignored.
    pub fn push(&mut self, sample: Timestamped<Pose2D>) {
        if let Some(last) = self.samples.back() {
            if sample.timestamp_us <= last.timestamp_us {
                return;
            }
        }
        let cutoff = sample.timestamp_us.saturating_sub(self.retention_us);
        self.samples.push_back(sample);

        while let Some(front) = self.samples.front() {
            if front.timestamp_us < cutoff && self.samples.len() > 2 {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Resolve the odometry pose at a timestamp.
    pub fn pose_at(&self, timestamp_us: u64) -> PoseLookup {
        let (oldest, newest) = match (self.samples.front(), self.samples.back()) {
            (Some(o), Some(n)) => (o, n),
            _ => return PoseLookup::NotYetAvailable,
        };

        if timestamp_us < oldest.timestamp_us {
            return PoseLookup::TooOld;
        }
        if timestamp_us > newest.timestamp_us {
            return PoseLookup::NotYetAvailable;
        }

        // Find the bracketing pair
        for pair in 0..self.samples.len().saturating_sub(1) {
            let start = &self.samples[pair];
            let end = &self.samples[pair + 1];
            if timestamp_us >= start.timestamp_us && timestamp_us <= end.timestamp_us {
                if let Some(pose) = Pose2D::interpolate(start, end, timestamp_us) {
                    return PoseLookup::Found(pose);
                }
            }
        }

        // Single-sample history with an exact timestamp match
        if timestamp_us == newest.timestamp_us {
            return PoseLookup::Found(newest.data);
        }
        PoseLookup::NotYetAvailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn history_with(samples: &[(u64, f64)]) -> OdomHistory {
        let mut h = OdomHistory::new(10_000_000);
        for &(t, x) in samples {
            h.push(Timestamped::new(Pose2D::new(x, 0.0, 0.0), t));
        }
        h
    }

    #[test]
    fn test_lookup_interpolates_between_samples() {
        let h = history_with(&[(1_000, 0.0), (2_000, 1.0)]);
        match h.pose_at(1_500) {
            PoseLookup::Found(pose) => assert_relative_eq!(pose.x, 0.5, epsilon = 1e-9),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_exact_sample() {
        let h = history_with(&[(1_000, 0.0), (2_000, 1.0)]);
        match h.pose_at(2_000) {
            PoseLookup::Found(pose) => assert_relative_eq!(pose.x, 1.0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_future_defers() {
        let h = history_with(&[(1_000, 0.0)]);
        assert_eq!(h.pose_at(5_000), PoseLookup::NotYetAvailable);
    }

    #[test]
    fn test_lookup_before_history_is_too_old() {
        let h = history_with(&[(1_000, 0.0), (2_000, 1.0)]);
        assert_eq!(h.pose_at(500), PoseLookup::TooOld);
    }

    #[test]
    fn test_empty_history_defers() {
        let h = OdomHistory::new(1_000_000);
        assert_eq!(h.pose_at(1_000), PoseLookup::NotYetAvailable);
    }

    #[test]
    fn test_out_of_order_samples_ignored() {
        let mut h = history_with(&[(1_000, 0.0), (2_000, 1.0)]);
        h.push(Timestamped::new(Pose2D::new(9.0, 0.0, 0.0), 1_500));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_retention_evicts_old_samples() {
        let mut h = OdomHistory::new(1_000);
        for t in [1_000u64, 1_500, 2_000, 3_500] {
            h.push(Timestamped::new(Pose2D::identity(), t));
        }
        // 1_000 and 1_500 fall outside the 1ms window ending at 3_500
        assert_eq!(h.pose_at(1_200), PoseLookup::TooOld);
        assert!(matches!(h.pose_at(3_000), PoseLookup::Found(_)));
    }
}
