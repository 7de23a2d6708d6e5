//! Application layer: the per-connection session use case and its ports.

pub mod session;

pub use session::{SessionOutcome, SessionReport, SessionRunner, Sink, SinkError};
