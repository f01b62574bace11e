//! End-to-end exercise of the batch acquisition flow against the simulated
//! device: discovery, identity validation, the step-response experiment and
//! session teardown.

use std::time::Duration;

use siggen_daq::discovery::find_instrument;
use siggen_daq::error::DaqError;
use siggen_daq::experiment::StepResponse;
use siggen_daq::session::{Channel, SessionOptions, FIRMWARE_IDENTITY};
use siggen_daq::transport::mock::MockResourceManager;

fn options() -> SessionOptions {
    // Defaults already pin the expected identity to the firmware string.
    SessionOptions::default().with_settle(Duration::ZERO)
}

#[test]
fn test_full_acquisition_flow() {
    let manager = MockResourceManager::new().with_resources(
        &["ASRL1::INSTR", "GPIB0::9::INSTR", "ASRL11::INSTR"],
        &["ASRL11::INSTR"],
    );

    let mut session = find_instrument(&manager, &options()).unwrap();
    assert_eq!(session.resource(), "ASRL11::INSTR");
    assert_eq!(session.identity(), FIRMWARE_IDENTITY);

    let experiment = StepResponse::default()
        .with_settle(Duration::ZERO)
        .with_samples_per_channel(20);
    let data = experiment.run(&mut session).unwrap();

    assert_eq!(data.traces.len(), 2);
    assert_eq!(data.traces[0].channel, Channel::A0);
    assert_eq!(data.traces[1].channel, Channel::A1);
    for trace in &data.traces {
        assert_eq!(trace.samples.len(), 20);
        assert_eq!(trace.samples[0].volts, 0.0);
        assert_eq!(trace.samples[19].volts, 5.0);
    }

    // The rig is left safe and the handle released.
    session.close();
    let state = manager.state();
    let state = state.lock().unwrap();
    assert_eq!(state.source_volts, [0.0, 0.0]);
    assert!(state.released);
}

#[test]
fn test_flow_aborts_when_device_stops_answering() {
    let manager = MockResourceManager::new();
    let mut session = find_instrument(&manager, &options()).unwrap();

    manager.state().lock().unwrap().fail_queries = true;

    let experiment = StepResponse::default().with_settle(Duration::ZERO);
    let err = experiment.run(&mut session).unwrap_err();
    assert!(matches!(err, DaqError::Transport(_)));
}

#[test]
fn test_session_unusable_after_flow_teardown() {
    let manager = MockResourceManager::new();
    let mut session = find_instrument(&manager, &options()).unwrap();
    session.close();

    assert!(matches!(
        session.read_channel(Channel::A0),
        Err(DaqError::NotConnected)
    ));
}
