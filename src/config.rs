//! Manages application configuration.
//!
//! Settings are loaded in layers with the `config` crate: struct defaults,
//! then an optional TOML file (`config/default.toml` unless a path is given
//! on the command line), then `SIGGEN`-prefixed environment variables. Later
//! layers win, so a single value can be overridden for one run without
//! editing anything:
//!
//! ```bash
//! SIGGEN__SESSION__SETTLE=0s cargo run --bin step_response -- --mock
//! ```
//!
//! Example `config/default.toml`:
//!
//! ```toml
//! resource = "ASRL11::INSTR"
//!
//! [session]
//! timeout = "100ms"
//! settle = "2s"
//! expected_identity = "OIC,Embedded SCPI Example,1,10"
//!
//! [experiment]
//! low_volts = 0.0
//! high_volts = 5.0
//! settle = "1s"
//! samples_per_channel = 20
//! ```

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppResult;
use crate::experiment::StepResponse;
use crate::session::{SessionOptions, FIRMWARE_IDENTITY};

/// Top-level application settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Resource to connect to. When absent the acquisition flow falls back
    /// to discovery.
    pub resource: Option<String>,

    pub session: SessionOptions,
    pub experiment: StepResponse,
    pub mock: MockSettings,
}

/// Behavior of the simulated device used by `--mock`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    pub identity: String,
    /// Uniform measurement noise in volts, so mock traces look alive.
    pub noise_amplitude: f64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            identity: FIRMWARE_IDENTITY.to_string(),
            noise_amplitude: 0.05,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn new(path: Option<&Path>) -> AppResult<Self> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path)),
            None => Config::builder().add_source(File::with_name("config/default").required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("SIGGEN").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
