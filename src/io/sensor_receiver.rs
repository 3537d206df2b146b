//! UDP receiver for sensor data.
//!
//! Receives odometry, scan and pose-reset messages as JSON datagrams
//! and distributes them to the estimation thread via crossbeam channels.
//! Scans go through a depth-1 channel: if the estimation loop has not
//! consumed the previous scan yet, the new one is dropped.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::TrySendError;
use thiserror::Error;

use crate::io::messages::SensorMessage;
use crate::state::{
    create_command_channel, create_odom_channel, create_scan_channel, CommandReceiver,
    CommandSender, FilterCommand, OdomReceiver, OdomSender, ScanReceiver, ScanSender,
};

/// Receiver errors.
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Configuration for the UDP receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to bind the UDP socket (e.g., "0.0.0.0:5600").
    pub bind_addr: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5600".to_string(),
        }
    }
}

/// Maximum UDP datagram size.
const MAX_DATAGRAM_SIZE: usize = 65536;

/// UDP receiver for sensor data.
pub struct SensorReceiver {
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    odom_tx: OdomSender,
    scan_tx: ScanSender,
    command_tx: CommandSender,
}

impl SensorReceiver {
    /// Create a new UDP receiver.
    ///
    /// Returns the receiver plus the channels the estimation thread
    /// consumes.
    pub fn new(
        config: ReceiverConfig,
        running: Arc<AtomicBool>,
    ) -> Result<(Self, OdomReceiver, ScanReceiver, CommandReceiver)> {
        let socket = UdpSocket::bind(&config.bind_addr)?;

        // Short read timeout so shutdown is noticed promptly
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        let (odom_tx, odom_rx) = create_odom_channel();
        let (scan_tx, scan_rx) = create_scan_channel();
        let (command_tx, command_rx) = create_command_channel();

        log::info!("sensor receiver bound to {}", config.bind_addr);

        Ok((
            Self {
                socket,
                running,
                odom_tx,
                scan_tx,
                command_tx,
            },
            odom_rx,
            scan_rx,
            command_rx,
        ))
    }

    /// Run the receiver loop (blocking).
    pub fn run(self) {
        log::info!("sensor receiver started");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        while self.running.load(Ordering::Relaxed) {
            let (len, _src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            match serde_json::from_slice::<SensorMessage>(&buffer[..len]) {
                Ok(msg) => self.dispatch(msg),
                Err(e) => {
                    log::warn!("dropping malformed datagram ({} bytes): {}", len, e);
                }
            }
        }

        log::info!("sensor receiver stopped");
    }

    fn dispatch(&self, msg: SensorMessage) {
        match msg {
            SensorMessage::Odometry { .. } => {
                if let Some(odom) = msg.as_odometry() {
                    if self.odom_tx.try_send(odom).is_err() {
                        log::warn!("odometry channel full, dropping sample");
                    }
                }
            }
            SensorMessage::Scan { .. } => {
                if let Some(scan) = msg.as_scan() {
                    match self.scan_tx.try_send(scan) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            // Previous scan still in flight, drop the new one
                            log::debug!("scan slot occupied, dropping scan");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            log::error!("scan channel disconnected");
                        }
                    }
                }
            }
            SensorMessage::SetPose {
                timestamp_us,
                x,
                y,
                theta,
            } => {
                let pose = crate::core::types::Pose2D::new(x, y, theta);
                let cmd = FilterCommand::SetPose(crate::core::types::Timestamped::new(
                    pose,
                    timestamp_us,
                ));
                if self.command_tx.try_send(cmd).is_err() {
                    log::warn!("command channel full, dropping pose reset");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_binds_and_dispatches() {
        let running = Arc::new(AtomicBool::new(true));
        let config = ReceiverConfig {
            bind_addr: "127.0.0.1:0".to_string(),
        };
        let (receiver, odom_rx, scan_rx, _command_rx) =
            SensorReceiver::new(config, Arc::clone(&running)).unwrap();

        receiver.dispatch(SensorMessage::Odometry {
            timestamp_us: 1,
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        });
        assert_eq!(odom_rx.try_recv().unwrap().timestamp_us, 1);

        // Two scans back to back: second is dropped
        for t in [10u64, 11] {
            receiver.dispatch(SensorMessage::Scan {
                timestamp_us: t,
                angle_min: 0.0,
                angle_increment: 0.1,
                range_min: 0.1,
                range_max: 8.0,
                ranges: vec![1.0],
            });
        }
        assert_eq!(scan_rx.try_recv().unwrap().timestamp_us, 10);
        assert!(scan_rx.try_recv().is_err());
    }
}
