//! Scene compositor: replays finalized pictures onto a drawing surface.
//!
//! This module owns the [`Surface`] seam. Concrete surfaces live next to it
//! (`raster`, `svg`, `postscript`); each knows how to fill itself and how to
//! replay one [`Picture`] under an extra placement transform. The compositor
//! itself only decides which pictures to replay, in what order, and at what
//! origin and scale, and it reports progress through a [`StatusSink`].

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use tracing::trace;

use crate::attrs::Color;
use crate::consts::STATUS_READY;
use crate::picture::Picture;
use crate::view::{Affine, Point};

/// Something pictures can be replayed onto.
pub trait Surface {
    /// Replace every pixel (or the whole page) with `color`.
    fn fill(&mut self, color: Color);

    /// Replay `picture` with `placement` applied after the picture's own
    /// transform. Layers marked clipped are clipped to the picture's view
    /// rectangle under the same placement.
    fn draw_picture(&mut self, picture: &Picture, placement: Affine);
}

/// Receives progress messages while compositing.
pub trait StatusSink {
    fn show_status(&mut self, message: &str);
}

/// Status sink that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn show_status(&mut self, _message: &str) {}
}

/// Replay `pictures[first..]` onto `surface`.
///
/// `origin_x` and `origin_y` are in output units (already scaled); they are
/// divided by `scale` so the offset survives the uniform scaling applied on
/// top of every picture's own transform. A `"{label} (piece k of n)"` status
/// is shown before each picture and `"Ready"` once done.
#[allow(clippy::too_many_arguments)]
pub fn paint(
    surface: &mut dyn Surface,
    pictures: &[Picture],
    first: usize,
    origin_x: f64,
    origin_y: f64,
    scale: f64,
    label: &str,
    status: &mut dyn StatusSink,
) {
    let placement = Affine::placement(Point::new(origin_x / scale, origin_y / scale), scale);
    let total = pictures.len();
    for (index, picture) in pictures.iter().enumerate().skip(first) {
        status.show_status(&format!("{label} (piece {} of {total})", index + 1));
        surface.draw_picture(picture, placement);
    }
    trace!(first, total, scale, "composited pictures");
    status.show_status(STATUS_READY);
}

/// Compact decimal for text outputs: at most four fractional digits,
/// trailing zeros removed.
pub(crate) fn num(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_owned() } else { text.to_owned() }
}
