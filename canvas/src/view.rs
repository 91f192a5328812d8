//! View geometry: user and device coordinates, and the viewport-to-window transform.
//!
//! The controlling application describes geometry in user coordinates with the
//! origin at the bottom left and Y increasing upward. Primitives are recorded
//! in a window frame where Y has already been flipped against the view's top
//! bound (see [`adjust`]). A per-view [`Affine`] then maps that window frame
//! onto device pixels, origin top left and Y increasing downward.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use serde::Deserialize;

/// A point in user, window, or device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The four sides of a rectangle as sent by the controlling application.
///
/// Missing keys deserialize as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Sides {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Sides {
    #[must_use]
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self { left, bottom, right, top }
    }
}

/// Axis-aligned rectangle given by its top-left corner and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

/// Scale-and-translate transform with no shear or rotation.
///
/// Maps `(x, y)` to `(sx * x + tx, sy * y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0, tx: 0.0, ty: 0.0 };

    #[must_use]
    pub fn map(&self, p: Point) -> Point {
        Point::new(self.sx * p.x + self.tx, self.sy * p.y + self.ty)
    }

    #[must_use]
    pub fn map_rect(&self, r: Rect) -> Rect {
        let a = self.map(Point::new(r.x, r.y));
        let b = self.map(Point::new(r.right(), r.bottom()));
        Rect::new(a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs())
    }

    /// The transform that applies `self` first and `outer` second.
    #[must_use]
    pub fn then(self, outer: Affine) -> Affine {
        Affine {
            sx: outer.sx * self.sx,
            sy: outer.sy * self.sy,
            tx: outer.sx * self.tx + outer.tx,
            ty: outer.sy * self.ty + outer.ty,
        }
    }

    /// Offset by `origin`, then scale uniformly by `scale`.
    #[must_use]
    pub fn placement(origin: Point, scale: f64) -> Affine {
        Affine { sx: scale, sy: scale, tx: scale * origin.x, ty: scale * origin.y }
    }
}

/// Error returned by [`build_view`].
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// View fractions give an empty or out-of-canvas device rectangle.
    #[error("invalid {sides} view fractions: {low} to {high} pixels (limit {limit})")]
    InvalidViewBounds { sides: &'static str, low: f64, high: f64, limit: f64 },
    /// User coordinates are inverted or degenerate.
    #[error("invalid {sides} user coordinates: {low} to {high}")]
    InvalidUserBounds { sides: &'static str, low: f64, high: f64 },
}

impl frames::ErrorCode for ViewError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidViewBounds { .. } => "E_INVALID_VIEW_BOUNDS",
            Self::InvalidUserBounds { .. } => "E_INVALID_USER_BOUNDS",
        }
    }
}

/// Everything derived from a view request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    /// View rectangle in unscaled device pixels; also the clip rectangle.
    pub device: Rect,
    /// View rectangle in the Y-flipped window frame.
    pub window: Rect,
    /// Window frame to device pixels.
    pub transform: Affine,
    /// Top user coordinate, used to flip incoming points.
    pub user_ymax: f64,
}

impl ViewGeometry {
    /// Flip a user point into this view's window frame.
    #[must_use]
    pub fn adjust(&self, p: Point) -> Point {
        adjust(p, self.user_ymax)
    }
}

/// Flip a Y-up user point against the view's top user coordinate.
#[must_use]
pub fn adjust(p: Point, user_ymax: f64) -> Point {
    Point::new(p.x, user_ymax - p.y)
}

fn ordered(low: f64, high: f64, limit: f64) -> bool {
    0.0 <= low && low < high && high <= limit
}

fn increasing(low: f64, high: f64) -> bool {
    low < high
}

/// Compute the device rectangle and transform for a view.
///
/// `frac` positions the view as fractions of the canvas (bottom-left origin),
/// `user` gives the user coordinates of its sides. Canvas dimensions are in
/// scaled device pixels; the geometry is built in unscaled pixels so that the
/// compositor can apply the scale factor uniformly on replay.
///
/// # Errors
///
/// Returns [`ViewError::InvalidViewBounds`] when the device rectangle is
/// empty or leaves the canvas, and [`ViewError::InvalidUserBounds`] when the
/// user sides are not strictly increasing.
pub fn build_view(
    frac: &Sides,
    user: &Sides,
    canvas_width: u32,
    canvas_height: u32,
    scale: f64,
) -> Result<ViewGeometry, ViewError> {
    let width = f64::from(canvas_width) / scale;
    let height = f64::from(canvas_height) / scale;
    let left_px = frac.left * width;
    let right_px = frac.right * width;
    let bottom_px = frac.bottom * height;
    let top_px = frac.top * height;

    // Checked in pixels so nearly-equal fractions are also rejected.
    if !ordered(left_px, right_px, width) {
        return Err(ViewError::InvalidViewBounds {
            sides: "left, right",
            low: left_px,
            high: right_px,
            limit: width,
        });
    }
    if !ordered(bottom_px, top_px, height) {
        return Err(ViewError::InvalidViewBounds {
            sides: "bottom, top",
            low: bottom_px,
            high: top_px,
            limit: height,
        });
    }
    let device = Rect::new(left_px, height - top_px, right_px - left_px, top_px - bottom_px);

    if !increasing(user.left, user.right) {
        return Err(ViewError::InvalidUserBounds {
            sides: "left, right",
            low: user.left,
            high: user.right,
        });
    }
    if !increasing(user.bottom, user.top) {
        return Err(ViewError::InvalidUserBounds {
            sides: "bottom, top",
            low: user.bottom,
            high: user.top,
        });
    }
    let window = Rect::new(user.left, 0.0, user.right - user.left, user.top - user.bottom);

    let sx = device.width / window.width;
    let sy = device.height / window.height;
    let transform = Affine { sx, sy, tx: device.x - sx * window.x, ty: device.y - sy * window.y };

    Ok(ViewGeometry { device, window, transform, user_ymax: user.top })
}
