//! Instrument session: one transport handle, typed command/response access.
//!
//! A [`Session`] owns exactly one transport handle to a physical instrument
//! and mediates every command/response exchange with it. The device speaks
//! newline-terminated SCPI:
//!
//! - `*IDN?`: identity, conventionally "manufacturer,model,serial,firmware"
//! - `:SOURCE:FREQUENCY <hz>` / `:SOURCE:FREQUENCY?`
//! - `:SOURCE:VOLTAGE<n> <value>V` / `:MEASURE:VOLTAGE<n>?` where the channel
//!   suffix `<n>` is empty for channel 0 and "1" for channel 1
//!
//! Opening a session waits a settle period for the device to boot (the
//! Arduino firmware resets on serial open), then interrogates `*IDN?`. If
//! that query fails, or the identity does not match the expected string when
//! one is configured, the handle is released before the error propagates.
//!
//! `close` is idempotent, and `Drop` closes a session that was never
//! explicitly closed, so the handle cannot leak or be double-released.

use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{AppResult, DaqError};
use crate::transport::{ResourceManager, Transport, TransportOptions};

/// `*IDN?` response of the embedded SCPI example firmware this crate drives.
pub const FIRMWARE_IDENTITY: &str = "OIC,Embedded SCPI Example,1,10";

/// Logical input/output channel of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A0,
    A1,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::A0, Channel::A1];

    /// Suffix appended to the voltage commands for this channel.
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::A0 => "",
            Channel::A1 => "1",
        }
    }

    /// Display label, matching the device's pin naming.
    pub fn label(self) -> &'static str {
        match self {
            Channel::A0 => "A0",
            Channel::A1 => "A1",
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = DaqError;

    fn try_from(id: u8) -> AppResult<Self> {
        match id {
            0 => Ok(Channel::A0),
            1 => Ok(Channel::A1),
            other => Err(DaqError::InvalidChannel(other)),
        }
    }
}

/// Connection parameters for [`Session::open`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Transport read/write timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// How long to wait after acquiring the handle before the first query.
    /// The embedded device reboots when the port opens and needs about two
    /// seconds before it answers.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,

    /// When set, `open` fails unless `*IDN?` returns exactly this string.
    /// Defaults to [`FIRMWARE_IDENTITY`] so unattended flows never drive a
    /// stranger on the bus; the interactive flow clears it.
    pub expected_identity: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(100),
            settle: Duration::from_secs(2),
            expected_identity: Some(FIRMWARE_IDENTITY.to_string()),
        }
    }
}

impl SessionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_expected_identity(mut self, identity: &str) -> Self {
        self.expected_identity = Some(identity.to_string());
        self
    }
}

/// An open connection to one instrument.
pub struct Session {
    transport: Option<Box<dyn Transport>>,
    identity: String,
    resource: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Acquire a transport handle for `resource`, wait the settle period and
    /// validate the device identity.
    ///
    /// On any failure after the handle was acquired, the handle is released
    /// before the error is returned; the caller never sees a half-open
    /// session.
    pub fn open(
        manager: &dyn ResourceManager,
        resource: &str,
        options: &SessionOptions,
    ) -> AppResult<Self> {
        let transport_options = TransportOptions::default().with_timeout(options.timeout);
        let mut transport = manager.open_resource(resource, &transport_options)?;

        if !options.settle.is_zero() {
            debug!(
                "waiting {}ms for '{}' to settle",
                options.settle.as_millis(),
                resource
            );
            thread::sleep(options.settle);
        }

        let identity = match transport.query("*IDN?") {
            Ok(response) => response.trim().to_string(),
            Err(e) => {
                transport.release();
                return Err(e);
            }
        };

        if let Some(expected) = &options.expected_identity {
            if identity != *expected {
                transport.release();
                return Err(DaqError::IdentityMismatch {
                    expected: expected.clone(),
                    actual: identity,
                });
            }
        }

        info!("connected to '{}' on {}", identity, resource);
        Ok(Self {
            transport: Some(transport),
            identity,
            resource: resource.to_string(),
        })
    }

    /// Identity string the device reported at open time.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Resource name this session was opened on.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&mut self) -> AppResult<&mut dyn Transport> {
        match self.transport.as_mut() {
            Some(transport) => Ok(transport.as_mut()),
            None => Err(DaqError::NotConnected),
        }
    }

    /// Measure the voltage on `channel`, in volts.
    pub fn read_channel(&mut self, channel: Channel) -> AppResult<f64> {
        let command = format!(":MEASURE:VOLTAGE{}?", channel.suffix());
        let response = self.transport()?.query(&command)?;
        parse_float(&response)
    }

    /// Set the output voltage of `channel`. The value is rendered with the
    /// unit suffix the device grammar expects ("0V", "5V", ...).
    pub fn write_channel(&mut self, channel: Channel, volts: f64) -> AppResult<()> {
        let command = format!(":SOURCE:VOLTAGE{} {}V", channel.suffix(), volts);
        self.transport()?.send(&command)
    }

    /// Set the generator output frequency in hertz.
    pub fn set_frequency(&mut self, hz: f64) -> AppResult<()> {
        let command = format!(":SOURCE:FREQUENCY {hz}");
        self.transport()?.send(&command)
    }

    /// Read back the generator output frequency in hertz.
    pub fn frequency(&mut self) -> AppResult<f64> {
        let response = self.transport()?.query(":SOURCE:FREQUENCY?")?;
        parse_float(&response)
    }

    /// Release the transport handle. Safe to call more than once; further
    /// read/write operations fail with `NotConnected`.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.release();
            info!("disconnected from '{}'", self.resource);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_float(response: &str) -> AppResult<f64> {
    let trimmed = response.trim();
    trimmed.parse::<f64>().map_err(|source| DaqError::Parse {
        response: trimmed.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockResourceManager, MOCK_RESOURCE};

    fn options() -> SessionOptions {
        SessionOptions::default().with_settle(Duration::ZERO)
    }

    fn open(manager: &MockResourceManager) -> Session {
        Session::open(manager, MOCK_RESOURCE, &options()).unwrap()
    }

    #[test]
    fn test_channel_id_mapping() {
        assert_eq!(Channel::try_from(0).unwrap(), Channel::A0);
        assert_eq!(Channel::try_from(1).unwrap(), Channel::A1);
        assert_eq!(Channel::A0.suffix(), "");
        assert_eq!(Channel::A1.suffix(), "1");
    }

    #[test]
    fn test_invalid_channel_ids_fail_without_io() {
        let manager = MockResourceManager::new();
        let session = open(&manager);
        let commands_after_open = manager.state().lock().unwrap().command_log.len();

        for id in [2u8, 3, 17, 255] {
            assert!(matches!(
                Channel::try_from(id),
                Err(DaqError::InvalidChannel(got)) if got == id
            ));
        }

        // Rejection happens before the transport is touched.
        assert_eq!(
            manager.state().lock().unwrap().command_log.len(),
            commands_after_open
        );
        drop(session);
    }

    #[test]
    fn test_open_queries_identity() {
        let manager = MockResourceManager::new();
        let session = open(&manager);
        assert_eq!(session.identity(), FIRMWARE_IDENTITY);
        assert_eq!(session.resource(), MOCK_RESOURCE);
        assert!(session.is_connected());
        assert_eq!(
            manager.state().lock().unwrap().command_log,
            vec!["*IDN?".to_string()]
        );
    }

    #[test]
    fn test_identity_query_failure_releases_handle() {
        let manager = MockResourceManager::new();
        manager.state().lock().unwrap().fail_queries = true;

        let err = Session::open(&manager, MOCK_RESOURCE, &options()).unwrap_err();
        assert!(matches!(err, DaqError::Transport(_)));
        assert!(manager.state().lock().unwrap().released);
    }

    #[test]
    fn test_identity_mismatch_releases_handle() {
        let manager = MockResourceManager::new().with_identity("ACME,Toaster,0,1");
        let opts = options().with_expected_identity(FIRMWARE_IDENTITY);

        let err = Session::open(&manager, MOCK_RESOURCE, &opts).unwrap_err();
        match err {
            DaqError::IdentityMismatch { expected, actual } => {
                assert_eq!(expected, FIRMWARE_IDENTITY);
                assert_eq!(actual, "ACME,Toaster,0,1");
            }
            other => panic!("expected IdentityMismatch, got {other:?}"),
        }
        assert!(manager.state().lock().unwrap().released);
    }

    #[test]
    fn test_expected_identity_match_succeeds() {
        let manager = MockResourceManager::new();
        let opts = options().with_expected_identity(FIRMWARE_IDENTITY);
        let session = Session::open(&manager, MOCK_RESOURCE, &opts).unwrap();
        assert_eq!(session.identity(), FIRMWARE_IDENTITY);
    }

    #[test]
    fn test_read_channel_parses_volts() {
        let manager = MockResourceManager::new();
        manager.state().lock().unwrap().source_volts[0] = 3.3;
        let mut session = open(&manager);
        let volts = session.read_channel(Channel::A0).unwrap();
        assert!((volts - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_write_channel_uses_unit_suffix() {
        let manager = MockResourceManager::new();
        let mut session = open(&manager);
        session.write_channel(Channel::A0, 5.0).unwrap();
        session.write_channel(Channel::A1, 0.0).unwrap();

        let state = manager.state();
        let state = state.lock().unwrap();
        assert!(state
            .command_log
            .contains(&":SOURCE:VOLTAGE 5V".to_string()));
        assert!(state
            .command_log
            .contains(&":SOURCE:VOLTAGE1 0V".to_string()));
        assert_eq!(state.source_volts, [5.0, 0.0]);
    }

    #[test]
    fn test_frequency_round_trip() {
        let manager = MockResourceManager::new();
        let mut session = open(&manager);
        session.set_frequency(5000.0).unwrap();
        assert_eq!(session.frequency().unwrap(), 5000.0);
    }

    #[test]
    fn test_response_parsing() {
        assert_eq!(parse_float(" 3.300000\r\n").unwrap(), 3.3);
        assert!(matches!(
            parse_float("not a number"),
            Err(DaqError::Parse { .. })
        ));
    }

    #[test]
    fn test_operations_after_close_fail_not_connected() {
        let manager = MockResourceManager::new();
        let mut session = open(&manager);
        session.close();

        assert!(!session.is_connected());
        assert!(matches!(
            session.read_channel(Channel::A0),
            Err(DaqError::NotConnected)
        ));
        assert!(matches!(
            session.write_channel(Channel::A1, 1.0),
            Err(DaqError::NotConnected)
        ));
        assert!(matches!(session.frequency(), Err(DaqError::NotConnected)));
        assert!(matches!(
            session.set_frequency(100.0),
            Err(DaqError::NotConnected)
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let manager = MockResourceManager::new();
        let mut session = open(&manager);
        session.close();
        session.close();
        assert!(manager.state().lock().unwrap().released);
    }

    #[test]
    fn test_drop_releases_handle() {
        let manager = MockResourceManager::new();
        let session = open(&manager);
        drop(session);
        assert!(manager.state().lock().unwrap().released);
    }
}
