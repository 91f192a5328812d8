//! pipedview: a graphics viewer driven by commands piped in from another
//! process.
//!
//! Commands arrive on stdin (JSON lines or length-delimited protobuf) and
//! responses leave on stdout; logs go to stderr.

mod config;
mod pump;
mod shell;
mod transport;

use std::process::ExitCode;

use canvas::command::Command;
use canvas::engine::{Outcome, Viewer};
use canvas::fonts::FontBook;
use clap::Parser;
use frames::ErrorCode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::pump::Stop;
use crate::shell::HeadlessShell;

fn main() -> ExitCode {
    // Stdout may carry responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(run(config));
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_background();
    code
}

async fn run(config: Config) -> ExitCode {
    info!(wire = ?config.wire, dpi = ?config.dpi(), hidden = config.hidden, "pipedview starting");
    let fonts = FontBook::discover(config.font.as_deref());
    let mut viewer = Viewer::new(HeadlessShell::new(config.dpi()), fonts);

    let (in_tx, mut in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let reader = transport::spawn_reader(tokio::io::stdin(), config.wire, in_tx);
    let writer = transport::spawn_writer(tokio::io::stdout(), config.wire, out_rx);

    let shown = if config.hidden { Ok(Outcome::Continue) } else { viewer.execute(Command::Show) };
    let stop = match shown {
        Ok(_) => pump::run(&mut viewer, &mut in_rx, &out_tx, config.pump_options()).await,
        Err(err) => {
            error!(code = err.error_code(), error = %err, "initial display failed");
            Stop::Fatal
        }
    };

    drop(out_tx);
    reader.abort();
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "response writer failed"),
        Err(err) => warn!(error = %err, "response writer task failed"),
    }
    info!(
        ?stop,
        title = viewer.shell().title(),
        frames = viewer.shell().presented(),
        pictures = viewer.pictures().len(),
        "pipedview stopped"
    );
    match stop {
        Stop::Exit => ExitCode::SUCCESS,
        Stop::Fatal => ExitCode::FAILURE,
    }
}
