//! Step-response acquisition script.
//!
//! Finds the instrument (first resource that opens and reports the expected
//! identity), runs the step-response experiment and shows the two channel
//! traces in a plot window. Without hardware:
//!
//! ```bash
//! cargo run --bin step_response -- --mock
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use siggen_daq::config::Settings;
use siggen_daq::discovery::find_instrument;
use siggen_daq::plot;
use siggen_daq::session::Session;
use siggen_daq::transport;

#[derive(Parser)]
#[command(name = "step_response", about = "Step-response acquisition")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connect to this resource instead of probing the bus.
    #[arg(long)]
    resource: Option<String>,

    /// Use the simulated device instead of the VISA library.
    #[arg(long)]
    mock: bool,

    /// List available resources and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::new(args.config.as_deref())?;
    if args.resource.is_some() {
        settings.resource = args.resource;
    }

    let manager = transport::resource_manager(args.mock, &settings.mock)?;

    if args.list {
        for resource in manager.list_resources()? {
            println!("{resource}");
        }
        return Ok(());
    }

    let mut session = match &settings.resource {
        Some(resource) => Session::open(manager.as_ref(), resource, &settings.session)
            .with_context(|| format!("could not open instrument on '{resource}'"))?,
        None => find_instrument(manager.as_ref(), &settings.session)
            .context("could not find a proper instrument")?,
    };
    info!(
        "using '{}' on {}",
        session.identity(),
        session.resource()
    );

    let data = settings
        .experiment
        .run(&mut session)
        .context("step-response experiment failed")?;
    session.close();

    plot::show_step_response(data)
}
