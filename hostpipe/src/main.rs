//! Command-line agent exporting host metrics over OTLP/HTTP.

use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use log::{error, info, warn};

use hostpipe_core::{ExporterConfig, Pipeline};

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let options = cli.into_options();
    let config = match ExporterConfig::from_options(&options) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    // Install the interrupt handler before anything starts exporting, so
    // there is no window where a running pipeline cannot be cancelled.
    let interrupt = match interrupt_channel() {
        Ok(receiver) => receiver,
        Err(err) => {
            error!("failed to install interrupt handler: {err}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::start(&config, options.shutdown_timeout) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("startup failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "sending metrics... (collectors: {})",
        pipeline.collectors().join(", ")
    );

    let _ = interrupt.recv();
    info!("interrupt received, shutting down");

    // Shutdown failures are reported but never change the exit status.
    if let Err(err) = pipeline.shutdown() {
        warn!("shutdown incomplete: {err}");
    }
    ExitCode::SUCCESS
}

/// Returns a channel that receives one message per interrupt signal.
fn interrupt_channel() -> Result<mpsc::Receiver<()>, ctrlc::Error> {
    let (sender, receiver) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = sender.send(());
    })?;
    Ok(receiver)
}

fn init_logger(verbose: u8) {
    let filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
