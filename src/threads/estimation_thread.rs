//! Estimation Thread - drives the filter state machine.
//!
//! This thread:
//! - Drains odometry samples into the time-indexed history
//! - Applies pose-reset commands
//! - Polls for a scan, resolves its odometry pose, and runs one filter
//!   cycle, deferring when the odometry transform is not yet available
//! - Writes the resulting estimate, population snapshot and map->odom
//!   correction to shared state
//!
//! The loop sleeps between polls; a scan arriving mid-sleep is picked up
//! at the next iteration. While a deferred scan is waiting for its
//! odometry, newer scans are drained and dropped so at most one scan is
//! in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::types::{LaserScan, Timestamped};
use crate::localization::{CycleOutcome, MclFilter};
use crate::state::{
    CommandReceiver, FilterCommand, FilterState, OdomReceiver, ScanReceiver, SharedStateHandle,
};
use crate::tf::{map_to_odom, Correction, CorrectionSlot, OdomHistory, PoseLookup};

/// Configuration for the estimation thread.
#[derive(Debug, Clone)]
pub struct EstimationThreadConfig {
    /// Sleep between loop iterations (milliseconds).
    pub poll_interval_ms: u64,
    /// Odometry history retention window (microseconds).
    pub odom_retention_us: u64,
}

impl Default for EstimationThreadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            odom_retention_us: 10_000_000,
        }
    }
}

/// Estimation thread handle.
pub struct EstimationThread {
    handle: JoinHandle<()>,
}

impl EstimationThread {
    /// Spawn the estimation thread.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        config: EstimationThreadConfig,
        filter: MclFilter,
        odom_rx: OdomReceiver,
        scan_rx: ScanReceiver,
        command_rx: CommandReceiver,
        shared_state: SharedStateHandle,
        correction_slot: CorrectionSlot,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("estimation".into())
            .spawn(move || {
                run_loop(
                    config,
                    filter,
                    odom_rx,
                    scan_rx,
                    command_rx,
                    shared_state,
                    correction_slot,
                    running,
                );
            })
            .expect("Failed to spawn estimation thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    config: EstimationThreadConfig,
    mut filter: MclFilter,
    odom_rx: OdomReceiver,
    scan_rx: ScanReceiver,
    command_rx: CommandReceiver,
    shared_state: SharedStateHandle,
    correction_slot: CorrectionSlot,
    running: Arc<AtomicBool>,
) {
    log::info!("estimation thread started");

    let mut history = OdomHistory::new(config.odom_retention_us);
    let mut pending: Option<Timestamped<LaserScan>> = None;
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    while running.load(Ordering::Relaxed) {
        while let Ok(sample) = odom_rx.try_recv() {
            history.push(sample);
        }

        while let Ok(cmd) = command_rx.try_recv() {
            match cmd {
                FilterCommand::SetPose(pose) => {
                    filter.reset_to(pose.data, pose.timestamp_us);
                    publish_state(&shared_state, &filter, FilterState::Tracking);
                }
            }
        }

        if pending.is_none() {
            pending = scan_rx.try_recv().ok();
        } else {
            // A deferred scan is in flight, drop anything newer
            while scan_rx.try_recv().is_ok() {
                log::debug!("dropping scan while another is deferred");
            }
        }

        if let Some(scan) = pending.take() {
            match history.pose_at(scan.timestamp_us) {
                PoseLookup::Found(odom_pose) => {
                    let polar = scan.data.to_polar();
                    let outcome = filter.handle_scan(&polar, odom_pose, scan.timestamp_us);
                    if outcome != CycleOutcome::Rejected {
                        if let Ok(mut state) = shared_state.write() {
                            state.last_scan = Some(scan.clone());
                        }
                    }
                    handle_outcome(
                        outcome,
                        &filter,
                        &odom_pose,
                        scan.timestamp_us,
                        &shared_state,
                        &correction_slot,
                    );
                }
                PoseLookup::NotYetAvailable => {
                    // Odometry has not caught up yet, retry next iteration
                    pending = Some(scan);
                }
                PoseLookup::TooOld => {
                    log::warn!(
                        "dropping scan at {}: odometry history no longer covers it",
                        scan.timestamp_us
                    );
                    if let Ok(mut state) = shared_state.write() {
                        state.stats.scans_dropped += 1;
                    }
                }
            }
        }

        thread::sleep(poll_interval);
    }

    log::info!("estimation thread stopped");
}

fn handle_outcome(
    outcome: CycleOutcome,
    filter: &MclFilter,
    odom_pose: &crate::core::types::Pose2D,
    timestamp_us: u64,
    shared_state: &SharedStateHandle,
    correction_slot: &CorrectionSlot,
) {
    match outcome {
        CycleOutcome::Updated => {
            if let Some(estimate) = filter.estimate() {
                correction_slot.store(Correction {
                    transform: map_to_odom(&estimate.data, odom_pose),
                    timestamp_us,
                });
            }
            if let Ok(mut state) = shared_state.write() {
                state.estimate = filter.estimate().cloned();
                state.cloud = filter.cloud().particles().to_vec();
                state.filter_state = FilterState::Tracking;
                state.stats.update_cycles += 1;
                state.stats.particle_count = filter.cloud().len();
                state.stats.last_update_us = timestamp_us;
            }
        }
        CycleOutcome::Reinitialized => {
            publish_state(shared_state, filter, FilterState::Tracking);
        }
        CycleOutcome::Collapsed => {
            publish_state(shared_state, filter, FilterState::Recovering);
        }
        CycleOutcome::Rejected => {
            if let Ok(mut state) = shared_state.write() {
                state.stats.scans_rejected += 1;
            }
        }
        CycleOutcome::AwaitingOdometry | CycleOutcome::Idle => {}
    }
}

fn publish_state(shared_state: &SharedStateHandle, filter: &MclFilter, filter_state: FilterState) {
    if let Ok(mut state) = shared_state.write() {
        state.estimate = filter.estimate().cloned();
        state.cloud = filter.cloud().particles().to_vec();
        state.filter_state = filter_state;
        state.stats.particle_count = filter.cloud().len();
    }
}
