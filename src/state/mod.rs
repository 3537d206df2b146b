//! State management for the multi-threaded localization daemon.

mod channels;
mod shared;

pub use channels::{
    create_command_channel, create_odom_channel, create_scan_channel, CommandReceiver,
    CommandSender, FilterCommand, OdomReceiver, OdomSender, ScanReceiver, ScanSender,
};
pub use shared::{create_shared_state, FilterState, FilterStats, SharedState, SharedStateHandle};
