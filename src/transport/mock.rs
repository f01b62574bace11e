//! Mock transport simulating the embedded SCPI example device.
//!
//! The mock models the small command surface the real firmware exposes: an
//! identity string, one frequency register and two source-voltage registers
//! that are echoed back by the measurement queries. Every command that goes
//! over the "wire" is recorded so tests can assert on the exact traffic, and
//! a `released` flag tracks whether the handle was torn down.
//!
//! The binaries can run entirely against this module via `--mock`, which is
//! handy for demoing the GUI and the acquisition flow without hardware.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use rand::Rng;

use super::{ResourceManager, Transport, TransportOptions};
use crate::error::{AppResult, DaqError};
use crate::session::FIRMWARE_IDENTITY;

/// Resource name served by a default [`MockResourceManager`].
pub const MOCK_RESOURCE: &str = "MOCK0::INSTR";

/// Shared register file of the simulated device.
#[derive(Debug)]
pub struct MockState {
    pub identity: String,
    pub frequency: f64,
    pub source_volts: [f64; 2],
    /// Uniform noise added to measurement readings, in volts. Zero disables.
    pub noise_amplitude: f64,
    /// When set, every query fails as if the device stopped answering.
    pub fail_queries: bool,
    pub command_log: Vec<String>,
    pub released: bool,
}

impl MockState {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            frequency: 1000.0,
            source_volts: [0.0, 0.0],
            noise_amplitude: 0.0,
            fail_queries: false,
            command_log: Vec::new(),
            released: false,
        }
    }
}

fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One open handle onto a [`MockState`].
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn with_state(state: Arc<Mutex<MockState>>) -> Self {
        Self { state }
    }

    fn measure(state: &MockState, channel: usize) -> f64 {
        let mut value = state.source_volts[channel];
        if state.noise_amplitude > 0.0 {
            value += rand::thread_rng()
                .gen_range(-state.noise_amplitude..=state.noise_amplitude);
        }
        value
    }
}

impl Transport for MockTransport {
    fn query(&mut self, command: &str) -> AppResult<String> {
        let mut state = lock_state(&self.state);
        state.command_log.push(command.to_string());

        if state.fail_queries {
            return Err(DaqError::Transport("mock device is not answering".to_string()));
        }

        let response = match command {
            "*IDN?" => state.identity.clone(),
            ":SOURCE:FREQUENCY?" => format!("{}", state.frequency),
            ":MEASURE:VOLTAGE?" => format!("{:.6}", Self::measure(&state, 0)),
            ":MEASURE:VOLTAGE1?" => format!("{:.6}", Self::measure(&state, 1)),
            _ => {
                return Err(DaqError::Transport(format!(
                    "mock device does not recognize query '{command}'"
                )))
            }
        };
        debug!("mock query '{}' -> '{}'", command, response);
        Ok(response)
    }

    fn send(&mut self, command: &str) -> AppResult<()> {
        let mut state = lock_state(&self.state);
        state.command_log.push(command.to_string());

        if let Some(rest) = command.strip_prefix(":SOURCE:FREQUENCY ") {
            state.frequency = parse_numeric(command, rest)?;
        } else if let Some(rest) = command.strip_prefix(":SOURCE:VOLTAGE1 ") {
            state.source_volts[1] = parse_volts(command, rest)?;
        } else if let Some(rest) = command.strip_prefix(":SOURCE:VOLTAGE ") {
            state.source_volts[0] = parse_volts(command, rest)?;
        } else {
            return Err(DaqError::Transport(format!(
                "mock device does not recognize command '{command}'"
            )));
        }
        debug!("mock command accepted: {}", command);
        Ok(())
    }

    fn release(&mut self) {
        let mut state = lock_state(&self.state);
        if !state.released {
            state.released = true;
            debug!("mock transport released");
        }
    }
}

fn parse_numeric(command: &str, text: &str) -> AppResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| DaqError::Transport(format!("mock device rejected '{command}'")))
}

/// Parse a voltage argument, accepting the "5V" unit-suffixed form the
/// device grammar uses.
fn parse_volts(command: &str, text: &str) -> AppResult<f64> {
    let trimmed = text.trim();
    let digits = trimmed.strip_suffix('V').unwrap_or(trimmed);
    parse_numeric(command, digits)
}

/// Resource manager serving one simulated device over a configurable set of
/// resource names. Only names marked connectable actually open; the rest
/// fail with a connection error, which is what the discovery loop has to
/// cope with on a real bus.
pub struct MockResourceManager {
    resources: Vec<String>,
    connectable: HashSet<String>,
    state: Arc<Mutex<MockState>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResourceManager {
    /// A single connectable device with the stock firmware identity.
    pub fn new() -> Self {
        Self {
            resources: vec![MOCK_RESOURCE.to_string()],
            connectable: [MOCK_RESOURCE.to_string()].into_iter().collect(),
            state: Arc::new(Mutex::new(MockState::new(FIRMWARE_IDENTITY))),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the identity string the simulated device reports.
    pub fn with_identity(self, identity: &str) -> Self {
        lock_state(&self.state).identity = identity.to_string();
        self
    }

    /// Add uniform measurement noise, in volts.
    pub fn with_noise(self, amplitude: f64) -> Self {
        lock_state(&self.state).noise_amplitude = amplitude;
        self
    }

    /// Replace the served resource list. Only names in `connectable` open
    /// successfully.
    pub fn with_resources(mut self, resources: &[&str], connectable: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self.connectable = connectable.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Handle on the simulated register file, shared with every transport
    /// this manager opens.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }

    /// Resource names `open_resource` has been called with, in order.
    pub fn attempts(&self) -> Vec<String> {
        lock_attempts(&self.attempts).clone()
    }
}

fn lock_attempts(attempts: &Mutex<Vec<String>>) -> MutexGuard<'_, Vec<String>> {
    attempts.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResourceManager for MockResourceManager {
    fn open_resource(
        &self,
        resource: &str,
        _options: &TransportOptions,
    ) -> AppResult<Box<dyn Transport>> {
        lock_attempts(&self.attempts).push(resource.to_string());

        if !self.connectable.contains(resource) {
            return Err(DaqError::Connection(format!(
                "no mock device on resource '{resource}'"
            )));
        }
        Ok(Box::new(MockTransport::with_state(self.state.clone())))
    }

    fn list_resources(&self) -> AppResult<Vec<String>> {
        Ok(self.resources.clone())
    }
}
