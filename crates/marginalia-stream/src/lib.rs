//! Streaming event client
//!
//! Maintains push-based connections for asynchronous jobs (document
//! processing, rabbithole agent exploration), normalizes the two wire
//! shapes the server emits, and applies bounded reconnection.
//!
//! The reconnect/watchdog logic is a pure state machine (`machine`); the
//! async driver (`client`) owns the actual transport and persistence so the
//! retry behavior is unit-testable without a network.

pub mod client;
pub mod error;
pub mod machine;
pub mod persist;
pub mod wire;

pub use client::{StreamClient, StreamTransport};
pub use error::StreamError;
pub use machine::{transition, ConnectionState, Effect, Input, ReconnectPolicy};
pub use persist::{FileJobStore, JobStore, MemoryJobStore};
pub use wire::parse_stream_message;
