//! framesink-receiver library crate.
//!
//! Receives length-prefixed binary video frames over a single TCP connection
//! and appends the payloads, in arrival order, to a raw `.h265` elementary
//! stream file.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Sender (length-prefixed frames over TCP)
//!         ↓
//! [framesink-receiver]
//!   ├── domain/           Pure types: ReceiverConfig
//!   ├── application/      SessionRunner use case + Sink port
//!   └── infrastructure/
//!         ├── listener/   TCP accept loop, per-connection lifecycle
//!         ├── handshake/  Format-announcement peek on a fresh connection
//!         └── sink/       File-backed Sink implementation
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `framesink-core` only; its
//!   `SessionRunner` is generic over the reader and the sink, so it is unit
//!   tested without a socket or a file.
//! - `infrastructure` depends on all other layers plus `tokio::net` and
//!   `tokio::fs`.

/// Application layer: the session use case and the Sink port.
pub mod application;

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Infrastructure layer: TCP listener, handshake detection, file sink.
pub mod infrastructure;
