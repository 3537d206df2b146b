//! Correction Thread - periodic map->odom transform publication.
//!
//! Runs on a fixed period independent of scan cadence and republishes
//! the last computed correction stamped slightly into the future, so
//! consumers interpolating over the transform never run out of valid
//! data between estimation cycles. Publishes nothing until the first
//! estimate exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::types::now_us;
use crate::io::{StreamMessage, StreamPublisher};
use crate::tf::CorrectionSlot;

/// Configuration for the correction thread.
#[derive(Debug, Clone)]
pub struct CorrectionThreadConfig {
    /// Publish period (milliseconds).
    pub publish_period_ms: u64,
    /// How far into the future the published transform is stamped
    /// (milliseconds).
    pub lookahead_ms: u64,
}

impl Default for CorrectionThreadConfig {
    fn default() -> Self {
        Self {
            publish_period_ms: 50,
            lookahead_ms: 100,
        }
    }
}

/// Correction thread handle.
pub struct CorrectionThread {
    handle: JoinHandle<()>,
}

impl CorrectionThread {
    /// Spawn the correction thread.
    pub fn spawn(
        config: CorrectionThreadConfig,
        correction_slot: CorrectionSlot,
        publisher: StreamPublisher,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("correction".into())
            .spawn(move || run_loop(config, correction_slot, publisher, running))
            .expect("Failed to spawn correction thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop(
    config: CorrectionThreadConfig,
    correction_slot: CorrectionSlot,
    publisher: StreamPublisher,
    running: Arc<AtomicBool>,
) {
    log::info!("correction thread started");

    let period = Duration::from_millis(config.publish_period_ms);
    let lookahead_us = config.lookahead_ms * 1_000;

    while running.load(Ordering::Relaxed) {
        if let Some(correction) = correction_slot.latest() {
            let stamp = now_us() + lookahead_us;
            let msg = StreamMessage::map_to_odom(&correction, stamp);
            if let Err(e) = publisher.publish(&msg) {
                log::warn!("failed to publish correction: {}", e);
            }
        }

        thread::sleep(period);
    }

    log::info!("correction thread stopped");
}
