//! Infrastructure layer: TCP listener, handshake detection, and the file sink.

pub mod handshake;
pub mod listener;
pub mod sink;

pub use listener::{Receiver, ReceiverError};
pub use sink::FileSink;
