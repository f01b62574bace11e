//! Interactive signal generator control panel.
//!
//! Presents a small dialog to connect to an instrument by resource name and
//! adjust its output frequency. Run against the simulated device with:
//!
//! ```bash
//! cargo run --bin siggen_gui -- --mock
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;

use siggen_daq::config::Settings;
use siggen_daq::gui::ControllerApp;
use siggen_daq::transport;

#[derive(Parser)]
#[command(name = "siggen_gui", about = "Signal generator control panel")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resource to pre-fill in the connection field.
    #[arg(long)]
    resource: Option<String>,

    /// Use the simulated device instead of the VISA library.
    #[arg(long)]
    mock: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::new(args.config.as_deref())?;
    if args.resource.is_some() {
        settings.resource = args.resource;
    }
    if args.mock && settings.resource.is_none() {
        settings.resource = Some(siggen_daq::transport::mock::MOCK_RESOURCE.to_string());
    }

    // The interactive flow connects to whatever the user points it at; only
    // the batch flow insists on a particular identity.
    settings.session.expected_identity = None;

    let manager = transport::resource_manager(args.mock, &settings.mock)?;
    let resource = settings.resource.clone().unwrap_or_default();
    info!("starting control panel");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([460.0, 220.0])
            .with_title("Signal Generator Control"),
        ..Default::default()
    };

    let session_options = settings.session.clone();
    eframe::run_native(
        "Signal Generator Control",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(ControllerApp::new(
                manager,
                session_options,
                &resource,
            )))
        }),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}
