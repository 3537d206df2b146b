//! Inter-thread channels.
//!
//! Scans travel through a bounded channel of depth 1: the receiver
//! thread uses `try_send` and drops the new scan when the slot is still
//! occupied, so at most one scan is ever in flight. Odometry and
//! commands use deeper channels since every sample matters.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::core::types::{LaserScan, Pose2D, Timestamped};

/// Commands delivered to the estimation thread.
#[derive(Debug, Clone)]
pub enum FilterCommand {
    /// Re-initialize the population around this pose.
    SetPose(Timestamped<Pose2D>),
}

pub type ScanSender = Sender<Timestamped<LaserScan>>;
pub type ScanReceiver = Receiver<Timestamped<LaserScan>>;

pub type OdomSender = Sender<Timestamped<Pose2D>>;
pub type OdomReceiver = Receiver<Timestamped<Pose2D>>;

pub type CommandSender = Sender<FilterCommand>;
pub type CommandReceiver = Receiver<FilterCommand>;

/// Depth-1 scan hand-off channel.
pub fn create_scan_channel() -> (ScanSender, ScanReceiver) {
    bounded(1)
}

/// Odometry sample channel.
pub fn create_odom_channel() -> (OdomSender, OdomReceiver) {
    bounded(256)
}

/// Command channel.
pub fn create_command_channel() -> (CommandSender, CommandReceiver) {
    bounded(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_channel_drops_second_in_flight() {
        let (tx, rx) = create_scan_channel();
        let scan = LaserScan::new(0.0, 0.1, 0.1, 8.0, vec![1.0]);

        assert!(tx.try_send(Timestamped::new(scan.clone(), 1)).is_ok());
        assert!(tx.try_send(Timestamped::new(scan.clone(), 2)).is_err());

        let received = rx.try_recv().unwrap();
        assert_eq!(received.timestamp_us, 1);

        assert!(tx.try_send(Timestamped::new(scan, 3)).is_ok());
    }

    #[test]
    fn test_command_channel_round_trip() {
        let (tx, rx) = create_command_channel();
        tx.send(FilterCommand::SetPose(Timestamped::new(
            Pose2D::new(1.0, 2.0, 0.5),
            42,
        )))
        .unwrap();

        match rx.try_recv().unwrap() {
            FilterCommand::SetPose(pose) => {
                assert_eq!(pose.timestamp_us, 42);
            }
        }
    }
}
