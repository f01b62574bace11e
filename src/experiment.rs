//! Step-response experiment.
//!
//! Drives both source channels low, waits for the outputs to settle, then
//! applies a voltage step and samples both measurement channels as fast as
//! the command/response round-trip allows. The outputs are driven back low
//! at the end regardless of how many samples were taken, so the rig is left
//! in a safe state.
//!
//! Defaults reproduce the original bring-up experiment: 0 V baseline, 5 V
//! step, 1 s settle, 20 samples per channel.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;

use crate::error::AppResult;
use crate::session::{Channel, Session};

/// One timestamped voltage reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the experiment epoch.
    pub elapsed: f64,
    pub volts: f64,
}

/// All samples taken on one channel, in acquisition order.
#[derive(Debug, Clone)]
pub struct Trace {
    pub channel: Channel,
    pub samples: Vec<Sample>,
}

impl Trace {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            samples: Vec::new(),
        }
    }

    /// Legend label for plotting ("A0" / "A1").
    pub fn label(&self) -> &'static str {
        self.channel.label()
    }
}

/// Result of one experiment run.
#[derive(Debug, Clone)]
pub struct StepResponseData {
    pub started_at: DateTime<Utc>,
    pub traces: Vec<Trace>,
}

/// Step-response experiment parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StepResponse {
    pub low_volts: f64,
    pub high_volts: f64,

    /// Wait between driving the baseline and taking the first sample.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,

    /// Total samples per channel, including the baseline sample.
    pub samples_per_channel: usize,
}

impl Default for StepResponse {
    fn default() -> Self {
        Self {
            low_volts: 0.0,
            high_volts: 5.0,
            settle: Duration::from_secs(1),
            samples_per_channel: 20,
        }
    }
}

impl StepResponse {
    pub fn with_levels(mut self, low_volts: f64, high_volts: f64) -> Self {
        self.low_volts = low_volts;
        self.high_volts = high_volts;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_samples_per_channel(mut self, samples: usize) -> Self {
        self.samples_per_channel = samples;
        self
    }

    /// Run the experiment on an open session.
    ///
    /// Any session failure aborts the run immediately; there are no retries.
    pub fn run(&self, session: &mut Session) -> AppResult<StepResponseData> {
        info!(
            "step response on '{}': {}V -> {}V, {} samples/channel",
            session.identity(),
            self.low_volts,
            self.high_volts,
            self.samples_per_channel
        );

        // Establish the baseline output level.
        for channel in Channel::ALL {
            session.write_channel(channel, self.low_volts)?;
        }
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        let started_at = Utc::now();
        let epoch = Instant::now();
        let mut traces: Vec<Trace> = Channel::ALL.into_iter().map(Trace::new).collect();

        if self.samples_per_channel > 0 {
            // One baseline sample per channel before the step.
            for trace in &mut traces {
                take_sample(session, epoch, trace)?;
            }

            // Apply the step.
            for channel in Channel::ALL {
                session.write_channel(channel, self.high_volts)?;
            }

            // Sample both channels repeatedly; loop overhead is the only
            // inter-sample delay.
            for _ in 1..self.samples_per_channel {
                for trace in &mut traces {
                    take_sample(session, epoch, trace)?;
                }
            }
        }

        // Drive the outputs back down.
        for channel in Channel::ALL {
            session.write_channel(channel, self.low_volts)?;
        }

        info!(
            "step response finished in {:.3}s",
            epoch.elapsed().as_secs_f64()
        );
        Ok(StepResponseData { started_at, traces })
    }
}

fn take_sample(session: &mut Session, epoch: Instant, trace: &mut Trace) -> AppResult<()> {
    let elapsed = epoch.elapsed().as_secs_f64();
    let volts = session.read_channel(trace.channel)?;
    trace.samples.push(Sample { elapsed, volts });
    Ok(())
}
