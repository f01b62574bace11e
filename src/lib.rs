//! Control and step-response acquisition for a SCPI signal generator / DAQ
//! device.
//!
//! The heart of the crate is [`session::Session`]: one transport handle to a
//! physical instrument, validated against its `*IDN?` identity and exposing
//! typed frequency and per-channel voltage operations. Everything else is
//! built around it:
//!
//! - [`transport`]: the seam to whatever moves the bytes (real VISA behind
//!   the `instrument_visa` feature, or an in-process mock device).
//! - [`discovery`]: probe the bus and keep the first instrument that opens.
//! - [`experiment`]: the step-response acquisition procedure.
//! - [`gui`] / [`plot`]: eframe front-ends for interactive control and for
//!   displaying acquired traces.
//! - [`config`]: layered settings (defaults, TOML file, environment).
//!
//! Both flows are synchronous and single-threaded; each user action or
//! script step blocks on the instrument round-trip.

pub mod config;
pub mod discovery;
pub mod error;
pub mod experiment;
pub mod gui;
pub mod plot;
pub mod session;
pub mod transport;
