//! Transport boundary: UDP sensor input and TCP streaming output.

pub mod messages;
pub mod sensor_receiver;
pub mod stream_publisher;

pub use messages::{SensorMessage, StreamMessage};
pub use sensor_receiver::{ReceiverConfig, SensorReceiver};
pub use stream_publisher::{PublisherConfig, StreamPublisher, StreamServer};
