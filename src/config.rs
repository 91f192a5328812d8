//! Command-line and environment configuration.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use canvas::consts::DEFAULT_DPI;
use clap::{Parser, ValueEnum};

use crate::pump::PumpOptions;

pub const DEFAULT_TIME_SLICE_MS: u64 = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

/// Encoding of the stdio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Wire {
    /// One JSON object per line.
    Json,
    /// Length-delimited protobuf messages.
    Proto,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pipedview", about = "Graphics viewer driven by commands on stdin")]
pub struct Config {
    #[arg(long, env = "PIPEDVIEW_WIRE", value_enum, default_value_t = Wire::Json)]
    pub wire: Wire,

    /// Horizontal display resolution in dots per inch.
    #[arg(long, env = "PIPEDVIEW_DPI_X", default_value_t = DEFAULT_DPI, value_parser = positive)]
    pub dpi_x: f64,

    /// Vertical display resolution in dots per inch.
    #[arg(long, env = "PIPEDVIEW_DPI_Y", default_value_t = DEFAULT_DPI, value_parser = positive)]
    pub dpi_y: f64,

    /// Font file for raster text; common system locations are searched when absent.
    #[arg(long, env = "PIPEDVIEW_FONT")]
    pub font: Option<PathBuf>,

    /// Longest stretch of command processing before yielding, in milliseconds.
    #[arg(long, env = "PIPEDVIEW_TIME_SLICE_MS", default_value_t = DEFAULT_TIME_SLICE_MS)]
    pub time_slice_ms: u64,

    /// Wait between polls of an empty command queue, in milliseconds.
    #[arg(long, env = "PIPEDVIEW_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Start hidden; the controller sends `show` when ready.
    #[arg(long, env = "PIPEDVIEW_HIDDEN")]
    pub hidden: bool,
}

impl Config {
    #[must_use]
    pub fn dpi(&self) -> (f64, f64) {
        (self.dpi_x, self.dpi_y)
    }

    #[must_use]
    pub fn pump_options(&self) -> PumpOptions {
        PumpOptions {
            time_slice: Duration::from_millis(self.time_slice_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn positive(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{raw:?} is not a number: {e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{raw} must be a positive number"))
    }
}
