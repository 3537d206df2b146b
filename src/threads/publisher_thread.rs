//! Publisher Thread - streams filter state to visualization clients.
//!
//! Periodically snapshots shared state and publishes the pose estimate,
//! the particle population, the last accepted scan and diagnostics. The
//! population is
//! republished even when no update cycle ran, so clients always see the
//! current belief alongside the previous estimate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::types::now_us;
use crate::io::{StreamMessage, StreamPublisher};
use crate::state::SharedStateHandle;

/// Configuration for the publisher thread.
#[derive(Debug, Clone)]
pub struct PublisherThreadConfig {
    /// Publish period (milliseconds).
    pub publish_period_ms: u64,
}

impl Default for PublisherThreadConfig {
    fn default() -> Self {
        Self {
            publish_period_ms: 100,
        }
    }
}

/// Publisher thread handle.
pub struct PublisherThread {
    handle: JoinHandle<()>,
}

impl PublisherThread {
    /// Spawn the publisher thread.
    pub fn spawn(
        config: PublisherThreadConfig,
        shared_state: SharedStateHandle,
        publisher: StreamPublisher,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("publisher".into())
            .spawn(move || run_loop(config, shared_state, publisher, running))
            .expect("Failed to spawn publisher thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop(
    config: PublisherThreadConfig,
    shared_state: SharedStateHandle,
    publisher: StreamPublisher,
    running: Arc<AtomicBool>,
) {
    log::info!("publisher thread started");

    let period = Duration::from_millis(config.publish_period_ms);

    while running.load(Ordering::Relaxed) {
        if publisher.client_count() > 0 {
            let (estimate, cloud, last_scan, stats) = match shared_state.read() {
                Ok(state) => (
                    state.estimate.clone(),
                    state.cloud.clone(),
                    state.last_scan.clone(),
                    state.stats,
                ),
                Err(_) => {
                    thread::sleep(period);
                    continue;
                }
            };

            let now = now_us();

            if let Some(ref est) = estimate {
                if let Err(e) = publisher.publish(&StreamMessage::pose_estimate(est)) {
                    log::warn!("failed to publish estimate: {}", e);
                }
            }
            if !cloud.is_empty() {
                if let Err(e) = publisher.publish(&StreamMessage::particle_cloud(&cloud, now)) {
                    log::warn!("failed to publish particle cloud: {}", e);
                }
            }
            if let Some(ref scan) = last_scan {
                if let Err(e) = publisher.publish(&StreamMessage::scan(scan)) {
                    log::warn!("failed to publish scan: {}", e);
                }
            }
            if let Err(e) = publisher.publish(&StreamMessage::status(&stats, now)) {
                log::warn!("failed to publish status: {}", e);
            }
        }

        thread::sleep(period);
    }

    log::info!("publisher thread stopped");
}
