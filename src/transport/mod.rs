//! Transport implementations for instrument communication.
//!
//! This module defines the seam between the session layer and whatever
//! actually moves bytes to the instrument. The wire framing (serial, GPIB,
//! USB) is entirely the transport's problem; the session layer only ever
//! sends newline-terminated SCPI text and reads text back.
//!
//! Two implementations are provided:
//!
//! - [`visa::VisaResourceManager`]: the real thing, backed by the `visa-rs`
//!   crate. Feature-gated with `instrument_visa`.
//! - [`mock::MockResourceManager`]: an in-process simulation of the embedded
//!   SCPI example device, used by the test suite and the `--mock` flag of
//!   the binaries.

pub mod mock;
#[cfg(feature = "instrument_visa")]
pub mod visa;

pub use mock::{MockResourceManager, MockTransport};
#[cfg(feature = "instrument_visa")]
pub use visa::VisaResourceManager;

use std::time::Duration;

use crate::config::MockSettings;
use crate::error::AppResult;

/// One open command/response channel to a physical instrument.
///
/// Implementations own exactly one underlying handle. `release` must be
/// idempotent; the session layer may call it on error paths that have
/// already torn the handle down.
pub trait Transport {
    /// Send a command and read one line of response.
    fn query(&mut self, command: &str) -> AppResult<String>;

    /// Send a command with no response expected.
    fn send(&mut self, command: &str) -> AppResult<()>;

    /// Release the underlying handle. Safe to call more than once.
    fn release(&mut self);
}

/// Opens transports by resource name and enumerates what is available.
pub trait ResourceManager {
    fn open_resource(
        &self,
        resource: &str,
        options: &TransportOptions,
    ) -> AppResult<Box<dyn Transport>>;

    fn list_resources(&self) -> AppResult<Vec<String>>;
}

/// Wire-level configuration handed to [`ResourceManager::open_resource`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Terminator appended to every outgoing command (typically "\n" for SCPI).
    pub line_terminator: String,

    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            line_terminator: "\n".to_string(),
            timeout: Duration::from_millis(100),
        }
    }
}

impl TransportOptions {
    /// Set read/write timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set line terminator for commands.
    pub fn with_line_terminator(mut self, terminator: String) -> Self {
        self.line_terminator = terminator;
        self
    }
}

/// Pick the resource manager for a run: the simulated device when `use_mock`
/// is set, otherwise the system VISA library (which requires the
/// `instrument_visa` feature).
pub fn resource_manager(
    use_mock: bool,
    mock: &MockSettings,
) -> AppResult<Box<dyn ResourceManager>> {
    if use_mock {
        let manager = MockResourceManager::new()
            .with_identity(&mock.identity)
            .with_noise(mock.noise_amplitude);
        return Ok(Box::new(manager));
    }

    #[cfg(feature = "instrument_visa")]
    {
        Ok(Box::new(VisaResourceManager::new()?))
    }

    #[cfg(not(feature = "instrument_visa"))]
    {
        Err(crate::error::DaqError::Connection(
            "VISA support not enabled. Rebuild with --features instrument_visa, or pass --mock"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_options_defaults() {
        let opts = TransportOptions::default();
        assert_eq!(opts.line_terminator, "\n");
        assert_eq!(opts.timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_transport_options_builder() {
        let opts = TransportOptions::default()
            .with_timeout(Duration::from_secs(2))
            .with_line_terminator("\r\n".to_string());
        assert_eq!(opts.timeout, Duration::from_secs(2));
        assert_eq!(opts.line_terminator, "\r\n");
    }
}
