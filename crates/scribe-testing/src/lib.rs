//! Testing utilities for scribe
//!
//! - [`RecordingBackend`] keeps every emitted line for assertions.
//! - [`FixedClock`] and [`fixed_host`] make envelopes deterministic.
//! - [`ChunkedBody`] streams a body in caller-chosen pieces.
//! - [`TestServer`] serves a Tower service over real HTTP.

pub mod backend;
pub mod body;
pub mod clock;
pub mod server;

pub use backend::{RecordedLine, RecordingBackend};
pub use body::{ChunkedBody, TestBodyError};
pub use clock::{fixed_host, FixedClock, TEST_HOSTNAME, TEST_PID};
pub use server::TestServer;

use scribe_core::{HttpLogger, LogConfig, MessageBuilder};

/// Service name used by [`test_logger`].
pub const TEST_SERVICE: &str = "scribe-test";

/// Message builder with a fixed host and the given clock.
pub fn test_builder(clock: FixedClock) -> MessageBuilder {
    MessageBuilder::new(TEST_SERVICE)
        .host(fixed_host())
        .clock(clock)
}

/// Logger writing into a fresh [`RecordingBackend`], with a fixed host and a
/// [`FixedClock`] starting at 1000.
pub fn test_logger(config: LogConfig) -> (HttpLogger, RecordingBackend) {
    let backend = RecordingBackend::new();
    let logger = HttpLogger::new(config, test_builder(FixedClock::new(1_000)), backend.clone());
    (logger, backend)
}
