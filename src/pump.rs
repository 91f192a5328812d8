//! Cooperative run loop: drains the command queue into the viewer.
//!
//! DESIGN
//! ======
//! The loop never blocks on the queue. Each batch takes commands with
//! `try_recv` and applies them to completion until the queue is empty or the
//! time slice runs out. A cut-short batch yields to the scheduler so other
//! tasks (the channel reader and writer) make progress; an empty queue
//! waits one poll interval.
//!
//! ERROR HANDLING
//! ==============
//! Fatal errors (channel failures, protocol and validation errors) are
//! reported once on the outbound queue as `**ERROR {code}: {message}` and
//! stop the loop. Non-fatal errors (export failures) are logged and the
//! loop continues.

#[cfg(test)]
#[path = "pump_test.rs"]
mod pump_test;

use std::time::Duration;

use canvas::engine::{Outcome, Shell, Viewer};
use frames::{ErrorCode, Response};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::transport::{Inbound, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOptions {
    pub time_slice: Duration,
    pub poll_interval: Duration,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The controller sent `exit`.
    Exit,
    /// A fatal error was reported.
    Fatal,
}

enum Batch {
    Drained,
    SliceElapsed,
    Stopped(Stop),
}

/// Run until `exit` or a fatal error.
pub async fn run<S: Shell>(
    viewer: &mut Viewer<S>,
    inbound: &mut UnboundedReceiver<Inbound>,
    outbound: &UnboundedSender<Response>,
    options: PumpOptions,
) -> Stop {
    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        match run_batch(viewer, inbound, outbound, options.time_slice) {
            Batch::Drained => {
                ticker.tick().await;
            }
            Batch::SliceElapsed => {
                debug!("time slice elapsed, yielding");
                tokio::task::yield_now().await;
            }
            Batch::Stopped(stop) => return stop,
        }
    }
}

fn run_batch<S: Shell>(
    viewer: &mut Viewer<S>,
    inbound: &mut UnboundedReceiver<Inbound>,
    outbound: &UnboundedSender<Response>,
    time_slice: Duration,
) -> Batch {
    let started = Instant::now();
    loop {
        let frame = match inbound.try_recv() {
            Ok(Ok(frame)) => frame,
            Ok(Err(err)) => return Batch::Stopped(report_fatal(outbound, &err)),
            Err(TryRecvError::Empty) => return Batch::Drained,
            Err(TryRecvError::Disconnected) => return Batch::Stopped(report_fatal(outbound, &TransportError::Closed)),
        };
        match viewer.dispatch(&frame) {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Reply(response)) => send(outbound, response),
            Ok(Outcome::Exit) => {
                info!("exit requested");
                return Batch::Stopped(Stop::Exit);
            }
            Err(err) if !err.is_fatal() => {
                warn!(action = %frame.action, code = err.error_code(), error = %err, "command failed");
            }
            Err(err) => return Batch::Stopped(report_fatal(outbound, &err)),
        }
        if started.elapsed() >= time_slice {
            return Batch::SliceElapsed;
        }
    }
}

fn report_fatal(outbound: &UnboundedSender<Response>, err: &dyn ErrorCode) -> Stop {
    error!(code = err.error_code(), error = %err, "fatal error, shutting down");
    send(outbound, Response::fatal(err));
    Stop::Fatal
}

fn send(outbound: &UnboundedSender<Response>, response: Response) {
    if let Err(err) = outbound.send(response) {
        warn!(response = ?err.0, "response channel closed");
    }
}
