//! Headless presentation shell.
//!
//! Keeps the visibility and title state a window would have and reports
//! presented frames and status messages through `tracing`. Print page
//! tuning keeps the default page.

use canvas::engine::Shell;
use canvas::export::ExportHost;
use canvas::render::StatusSink;
use tiny_skia::Pixmap;
use tracing::{debug, info, trace};

#[derive(Debug)]
pub struct HeadlessShell {
    dpi: (f64, f64),
    visible: bool,
    title: String,
    presented: u64,
}

impl HeadlessShell {
    /// A hidden shell reporting `dpi` as its display resolution.
    #[must_use]
    pub fn new(dpi: (f64, f64)) -> Self {
        Self { dpi, visible: false, title: String::new(), presented: 0 }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of buffers presented so far.
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl StatusSink for HeadlessShell {
    fn show_status(&mut self, message: &str) {
        trace!(message, "status");
    }
}

impl ExportHost for HeadlessShell {}

impl Shell for HeadlessShell {
    fn set_title(&mut self, title: &str) {
        info!(title, "window title set");
        title.clone_into(&mut self.title);
    }

    fn show(&mut self) {
        debug!("shown");
        self.visible = true;
    }

    fn hide(&mut self) {
        debug!("hidden");
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn dpi(&self) -> (f64, f64) {
        self.dpi
    }

    fn present(&mut self, buffer: &Pixmap) {
        self.presented += 1;
        debug!(width = buffer.width(), height = buffer.height(), frame = self.presented, "buffer presented");
    }
}
