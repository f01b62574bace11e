//! VISA transport for GPIB/USB/serial/Ethernet instruments.
//!
//! Wraps the `visa-rs` crate behind the [`Transport`] and [`ResourceManager`]
//! seams. Feature-gated with `instrument_visa`; requires a VISA library
//! (NI-VISA, Keysight IO Libraries, librevisa) installed on the host.
//!
//! Resource strings look like:
//! - "ASRL11::INSTR" (serial, e.g. an Arduino on COM11)
//! - "GPIB0::1::INSTR" (GPIB interface)
//! - "USB0::0x1234::0x5678::SERIAL::INSTR" (USB)
//! - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)

use std::ffi::CString;
use std::io::{BufRead, BufReader, Write};

use log::debug;
use visa_rs::prelude::*;

use super::{ResourceManager, Transport, TransportOptions};
use crate::error::{AppResult, DaqError};

/// Resource manager backed by the system VISA library.
pub struct VisaResourceManager {
    rm: DefaultRM,
}

impl VisaResourceManager {
    pub fn new() -> AppResult<Self> {
        let rm = DefaultRM::new()
            .map_err(|e| DaqError::Connection(format!("failed to create VISA resource manager: {e}")))?;
        Ok(Self { rm })
    }
}

impl ResourceManager for VisaResourceManager {
    fn open_resource(
        &self,
        resource: &str,
        options: &TransportOptions,
    ) -> AppResult<Box<dyn Transport>> {
        let name = CString::new(resource)
            .map_err(|_| DaqError::Connection(format!("invalid resource name '{resource}'")))?;

        let instrument = self
            .rm
            .open(&name.into(), AccessMode::NO_LOCK, options.timeout)
            .map_err(|e| {
                DaqError::Connection(format!("failed to open VISA resource '{resource}': {e}"))
            })?;

        debug!(
            "VISA resource '{}' opened with {}ms timeout",
            resource,
            options.timeout.as_millis()
        );

        Ok(Box::new(VisaTransport {
            instrument: Some(instrument),
            line_terminator: options.line_terminator.clone(),
            resource: resource.to_string(),
        }))
    }

    fn list_resources(&self) -> AppResult<Vec<String>> {
        let expr = CString::new("?*::INSTR")
            .map_err(|_| DaqError::Connection("invalid search expression".to_string()))?;

        let list = self
            .rm
            .find_res_list(&expr.into())
            .map_err(|e| DaqError::Connection(format!("VISA resource enumeration failed: {e}")))?;

        let mut resources = Vec::new();
        for res in list {
            match res {
                Ok(name) => resources.push(name.to_string()),
                Err(e) => debug!("skipping unreadable VISA resource entry: {}", e),
            }
        }
        Ok(resources)
    }
}

/// One open VISA instrument handle.
pub struct VisaTransport {
    instrument: Option<Instrument>,
    line_terminator: String,
    resource: String,
}

impl VisaTransport {
    fn instrument(&mut self) -> AppResult<&mut Instrument> {
        self.instrument.as_mut().ok_or(DaqError::NotConnected)
    }

    fn write_command(&mut self, command: &str) -> AppResult<()> {
        let framed = format!("{}{}", command, self.line_terminator);
        let instrument = self.instrument()?;
        instrument
            .write_all(framed.as_bytes())
            .map_err(|e| DaqError::Transport(format!("VISA write failed for '{command}': {e}")))
    }
}

impl Transport for VisaTransport {
    fn query(&mut self, command: &str) -> AppResult<String> {
        self.write_command(command)?;

        let instrument = self.instrument()?;
        let mut response = String::new();
        let mut reader = BufReader::new(&*instrument);
        reader
            .read_line(&mut response)
            .map_err(|e| DaqError::Transport(format!("VISA read failed for '{command}': {e}")))?;

        let response = response.trim_end().to_string();
        debug!("VISA query '{}' -> '{}'", command, response);
        Ok(response)
    }

    fn send(&mut self, command: &str) -> AppResult<()> {
        self.write_command(command)?;
        debug!("VISA command sent: {}", command);
        Ok(())
    }

    fn release(&mut self) {
        if self.instrument.take().is_some() {
            debug!("VISA resource '{}' closed", self.resource);
        }
    }
}
