//! Pictures and the recorder that produces them.
//!
//! A [`PictureRecorder`] is the drawing surface of an active view. Draw
//! calls flip their user coordinates with the view's `user_ymax`, lower the
//! request into [`Primitive`]s in the window frame, and count the discrete
//! graphical elements added. [`PictureRecorder::finish`] seals the result
//! into an immutable [`Picture`] carrying the view transform and clip
//! rectangle, so replay never consults live view state.
//!
//! DESIGN
//! ======
//! Every filled or stroked element becomes a [`Shape`] built from
//! [`PathOp`]s: rectangles, grid cells, and placed symbol copies included.
//! Surfaces therefore only need to handle two primitive kinds (paths and
//! text). Clipping can be toggled mid-recording, so primitives are grouped
//! into [`Layer`]s that share one clip flag.

#[cfg(test)]
#[path = "picture_test.rs"]
mod picture_test;

use tracing::debug;

use crate::attrs::{Brush, BrushStyle, CapStyle, Color, Font, JoinStyle, LineStyle, Pen};
use crate::consts::{SYMBOL_BOX, SYMBOL_PEN_WIDTH};
use crate::symbol::{PathOp, Symbol};
use crate::view::{Affine, Point, Rect, Sides, ViewGeometry};

/// Error returned by a draw call on the recorder.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("no active view")]
    NoActiveView,
    #[error("fewer than two endpoints given ({0})")]
    TooFewPoints(usize),
    #[error("polygon has neither a fill nor an outline")]
    NoFillOrOutline,
    #[error("{dimension} of the rectangle is not positive ({value})")]
    NonPositiveDimension { dimension: &'static str, value: f64 },
    #[error("{which} is not a positive integer ({value})")]
    InvalidGrid { which: &'static str, value: f64 },
    #[error("not enough colors given: need {needed}, got {given}")]
    InsufficientColors { needed: usize, given: usize },
}

impl frames::ErrorCode for DrawError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoActiveView => "E_NO_ACTIVE_VIEW",
            Self::TooFewPoints(_) => "E_TOO_FEW_POINTS",
            Self::NoFillOrOutline => "E_NO_FILL_OR_OUTLINE",
            Self::NonPositiveDimension { .. } => "E_NON_POSITIVE_DIMENSION",
            Self::InvalidGrid { .. } => "E_INVALID_GRID",
            Self::InsufficientColors { .. } => "E_INSUFFICIENT_COLORS",
        }
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A path filled with `brush` and then stroked with `pen`.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub ops: Vec<PathOp>,
    pub brush: Option<Brush>,
    pub pen: Option<Pen>,
}

/// A line of text whose baseline starts at `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: Font,
    pub pen: Pen,
    pub origin: Point,
    /// Clockwise rotation about `origin`, in degrees.
    pub rotate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Shape(Shape),
    Text(TextRun),
}

/// Consecutive primitives recorded under the same clip setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub clipped: bool,
    pub primitives: Vec<Primitive>,
}

/// An immutable, replayable batch of primitives.
///
/// Coordinates are in the window frame; `transform` maps them to unscaled
/// device pixels and `clip` is the view rectangle in the same pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    transform: Affine,
    clip: Rect,
    layers: Vec<Layer>,
}

impl Picture {
    #[must_use]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    #[must_use]
    pub fn clip(&self) -> Rect {
        self.clip
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of recorded primitives across all layers.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.primitives.len()).sum()
    }
}

/// Parameters a view was opened with, kept so it can be reopened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest {
    pub frac: Sides,
    pub user: Sides,
    pub clip: bool,
}

// =============================================================================
// RECORDER
// =============================================================================

/// Mutable recording surface for one active view.
#[derive(Debug)]
pub struct PictureRecorder {
    geometry: ViewGeometry,
    clipped: bool,
    layers: Vec<Layer>,
    count: usize,
}

impl PictureRecorder {
    #[must_use]
    pub fn new(geometry: ViewGeometry, clip: bool) -> Self {
        Self { geometry, clipped: clip, layers: Vec::new(), count: 0 }
    }

    /// Discrete graphical elements drawn so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn geometry(&self) -> &ViewGeometry {
        &self.geometry
    }

    #[must_use]
    pub fn clipped(&self) -> bool {
        self.clipped
    }

    /// Enable or disable clipping for primitives drawn from now on.
    pub fn set_clip(&mut self, enabled: bool) {
        self.clipped = enabled;
    }

    fn push(&mut self, primitive: Primitive) {
        match self.layers.last_mut() {
            Some(layer) if layer.clipped == self.clipped => layer.primitives.push(primitive),
            _ => self.layers.push(Layer { clipped: self.clipped, primitives: vec![primitive] }),
        }
    }

    fn adjust_all(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.geometry.adjust(*p)).collect()
    }

    /// Connected line segments through `points`.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::TooFewPoints`] for fewer than two points.
    pub fn draw_multiline(&mut self, points: &[Point], pen: Pen) -> Result<(), DrawError> {
        if points.len() < 2 {
            return Err(DrawError::TooFewPoints(points.len()));
        }
        let ops = polyline_ops(&self.adjust_all(points), false);
        self.push(Primitive::Shape(Shape { ops, brush: None, pen: Some(pen) }));
        self.count += 1;
        Ok(())
    }

    /// One copy of `symbol` centred on each point, scaled by `size / 100`.
    pub fn draw_points(&mut self, points: &[Point], symbol: Symbol, size: f64, color: Color) {
        let scale = size / SYMBOL_BOX;
        let (brush, pen) = if symbol.filled {
            (Some(Brush::solid(color)), None)
        } else {
            let pen = Pen {
                color,
                width: SYMBOL_PEN_WIDTH * scale,
                style: LineStyle::Solid,
                cap: CapStyle::Round,
                join: JoinStyle::Round,
            };
            (None, Some(pen))
        };
        for center in self.adjust_all(points) {
            let ops = symbol.ops.iter().map(|op| op.placed(center, scale)).collect();
            self.push(Primitive::Shape(Shape { ops, brush, pen }));
        }
        self.count += points.len();
    }

    /// Closed polygon through `points`.
    ///
    /// Without an outline the edge is drawn with a cosmetic pen in the fill
    /// color.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::NoFillOrOutline`] when neither a visible fill
    /// style nor an outline is given.
    pub fn draw_polygon(&mut self, points: &[Point], fill: Option<Brush>, outline: Option<Pen>) -> Result<(), DrawError> {
        let fill = fill.filter(|brush| brush.style != BrushStyle::NoBrush);
        let pen = match (outline, fill) {
            (Some(pen), _) => pen,
            (None, Some(brush)) => Pen::cosmetic(brush.color),
            (None, None) => return Err(DrawError::NoFillOrOutline),
        };
        let ops = polyline_ops(&self.adjust_all(points), true);
        self.push(Primitive::Shape(Shape { ops, brush: fill, pen: Some(pen) }));
        self.count += 1;
        Ok(())
    }

    /// Axis-aligned rectangle. Missing fill or outline draws nothing for
    /// that part.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::NonPositiveDimension`] when the sides are
    /// inverted or equal.
    pub fn draw_rectangle(&mut self, sides: &Sides, fill: Option<Brush>, outline: Option<Pen>) -> Result<(), DrawError> {
        let rect = self.window_rect(sides)?;
        self.push(Primitive::Shape(Shape { ops: rect_ops(rect), brush: fill, pen: outline }));
        self.count += 1;
        Ok(())
    }

    /// Rectangle split into a grid of solid cells.
    ///
    /// `colors` is column-major with the first row at the top. Row and
    /// column counts are rounded to the nearest integer.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::NonPositiveDimension`], [`DrawError::InvalidGrid`],
    /// or [`DrawError::InsufficientColors`]; nothing is recorded on error.
    pub fn draw_multicolor_rectangle(
        &mut self,
        sides: &Sides,
        numrows: f64,
        numcols: f64,
        colors: &[Color],
    ) -> Result<(), DrawError> {
        let rect = self.window_rect(sides)?;
        let rows = grid_count("numrows", numrows)?;
        let cols = grid_count("numcols", numcols)?;
        let needed = rows
            .checked_mul(cols)
            .ok_or(DrawError::InvalidGrid { which: "numrows * numcols", value: numrows * numcols })?;
        if colors.len() < needed {
            return Err(DrawError::InsufficientColors { needed, given: colors.len() });
        }

        #[allow(clippy::cast_precision_loss)]
        let (cell_width, cell_height) = (rect.width / cols as f64, rect.height / rows as f64);
        let mut cells = colors.iter();
        for col in 0..cols {
            for row in 0..rows {
                let Some(color) = cells.next() else { break };
                #[allow(clippy::cast_precision_loss)]
                let cell = Rect::new(
                    rect.x + col as f64 * cell_width,
                    rect.y + row as f64 * cell_height,
                    cell_width,
                    cell_height,
                );
                self.push(Primitive::Shape(Shape { ops: rect_ops(cell), brush: Some(Brush::solid(*color)), pen: None }));
            }
        }
        self.count += needed;
        Ok(())
    }

    /// Text with its baseline starting at `location`, or centred in the view
    /// when no location is given.
    pub fn draw_text(&mut self, text: &str, font: Option<Font>, pen: Option<Pen>, rotate: f64, location: Option<Point>) {
        let origin = match location {
            Some(p) => self.geometry.adjust(p),
            None => {
                debug!(text, "text without location placed at view centre");
                self.geometry.window.center()
            }
        };
        self.push(Primitive::Text(TextRun {
            text: text.to_owned(),
            font: font.unwrap_or_default(),
            pen: pen.unwrap_or(Pen::cosmetic(Color::BLACK)),
            origin,
            rotate,
        }));
        self.count += 1;
    }

    /// Seal the recording. Returns `None` when nothing was drawn.
    #[must_use]
    pub fn finish(self) -> Option<Picture> {
        if self.count == 0 {
            return None;
        }
        Some(Picture { transform: self.geometry.transform, clip: self.geometry.device, layers: self.layers })
    }

    fn window_rect(&self, sides: &Sides) -> Result<Rect, DrawError> {
        let top_left = self.geometry.adjust(Point::new(sides.left, sides.top));
        let bottom_right = self.geometry.adjust(Point::new(sides.right, sides.bottom));
        let width = bottom_right.x - top_left.x;
        if width.is_nan() || width <= 0.0 {
            return Err(DrawError::NonPositiveDimension { dimension: "width", value: width });
        }
        let height = bottom_right.y - top_left.y;
        if height.is_nan() || height <= 0.0 {
            return Err(DrawError::NonPositiveDimension { dimension: "height", value: height });
        }
        Ok(Rect::new(top_left.x, top_left.y, width, height))
    }
}

fn grid_count(which: &'static str, value: f64) -> Result<usize, DrawError> {
    let rounded = (value + 0.5).trunc();
    if rounded.is_nan() || rounded < 1.0 || rounded > f64::from(u32::MAX) {
        return Err(DrawError::InvalidGrid { which, value });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(rounded as usize)
}

fn polyline_ops(points: &[Point], closed: bool) -> Vec<PathOp> {
    let mut ops = Vec::with_capacity(points.len() + 1);
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        ops.push(PathOp::MoveTo(*first));
        ops.extend(iter.map(|p| PathOp::LineTo(*p)));
        if closed {
            ops.push(PathOp::Close);
        }
    }
    ops
}

/// Closed path around `rect`.
#[must_use]
pub fn rect_ops(rect: Rect) -> Vec<PathOp> {
    vec![
        PathOp::MoveTo(Point::new(rect.x, rect.y)),
        PathOp::LineTo(Point::new(rect.right(), rect.y)),
        PathOp::LineTo(Point::new(rect.right(), rect.bottom())),
        PathOp::LineTo(Point::new(rect.x, rect.bottom())),
        PathOp::Close,
    ]
}
