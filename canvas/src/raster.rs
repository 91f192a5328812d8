//! Raster surface backed by a `tiny-skia` pixmap.
//!
//! Used for the on-screen buffer and for raster file export. Paths are
//! anti-aliased; clipping uses a [`Mask`] of the placed view rectangle.
//! Pens of width zero become tiny-skia hairlines, one device pixel wide at
//! any scale.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use tiny_skia::{FillRule, LineCap, LineJoin, Mask, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};
use tracing::warn;

use crate::attrs::{CapStyle, Color, JoinStyle, Pen};
use crate::fonts::FontBook;
use crate::picture::{Picture, Primitive, Shape, TextRun};
use crate::render::Surface;
use crate::symbol::PathOp;
use crate::view::Affine;

/// Slant applied to italic text.
const ITALIC_SKEW: f32 = -0.2;

/// Extra outline width, in ems, that emboldens text.
const BOLD_STROKE_EM: f32 = 1.0 / 30.0;

/// Underline offset below the baseline and thickness, in ems.
const UNDERLINE_OFFSET_EM: f32 = 0.1;
const UNDERLINE_WIDTH_EM: f32 = 1.0 / 15.0;

/// Replays pictures into a borrowed pixmap.
pub struct RasterSurface<'a> {
    pixmap: &'a mut Pixmap,
    fonts: &'a FontBook,
    warned_no_font: bool,
}

impl<'a> RasterSurface<'a> {
    #[must_use]
    pub fn new(pixmap: &'a mut Pixmap, fonts: &'a FontBook) -> Self {
        Self { pixmap, fonts, warned_no_font: false }
    }

    fn clip_mask(&self, picture: &Picture, placement: Affine) -> Option<Mask> {
        let clip = placement.map_rect(picture.clip());
        #[allow(clippy::cast_possible_truncation)]
        let rect = tiny_skia::Rect::from_xywh(clip.x as f32, clip.y as f32, clip.width as f32, clip.height as f32)?;
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        mask.fill_path(&PathBuilder::from_rect(rect), FillRule::Winding, false, Transform::identity());
        Some(mask)
    }

    fn draw_shape(&mut self, shape: &Shape, transform: Transform, mask: Option<&Mask>) {
        let Some(path) = build_path(&shape.ops) else { return };
        if let Some(brush) = shape.brush.filter(|brush| brush.is_visible()) {
            self.pixmap.fill_path(&path, &paint_for(brush.color), FillRule::Winding, transform, mask);
        }
        if let Some(pen) = shape.pen.filter(Pen::is_visible) {
            self.pixmap.stroke_path(&path, &paint_for(pen.color), &stroke_for(&pen), transform, mask);
        }
    }

    fn draw_text(&mut self, run: &TextRun, transform: Transform, mask: Option<&Mask>) {
        if !run.pen.is_visible() || run.text.is_empty() {
            return;
        }
        let Some(outline) = self.fonts.outline(&run.text) else {
            if !self.warned_no_font {
                warn!(text = %run.text, "no font available, skipping raster text");
                self.warned_no_font = true;
            }
            return;
        };
        #[allow(clippy::cast_possible_truncation)]
        let (size, origin_x, origin_y, rotate) =
            (run.font.size as f32, run.origin.x as f32, run.origin.y as f32, run.rotate as f32);
        let mut local = Transform::from_translate(origin_x, origin_y)
            .pre_concat(Transform::from_rotate(rotate))
            .pre_concat(Transform::from_scale(size, size));
        if run.font.italic {
            local = local.pre_concat(Transform::from_row(1.0, 0.0, ITALIC_SKEW, 1.0, 0.0, 0.0));
        }
        let glyph_transform = transform.pre_concat(local);
        let paint = paint_for(run.pen.color);
        if let Some(path) = &outline.path {
            self.pixmap.fill_path(path, &paint, FillRule::Winding, glyph_transform, mask);
            if run.font.bold {
                let stroke = Stroke { width: BOLD_STROKE_EM, ..Stroke::default() };
                self.pixmap.stroke_path(path, &paint, &stroke, glyph_transform, mask);
            }
        }
        if run.font.underline && outline.advance > 0.0 {
            let mut builder = PathBuilder::new();
            builder.move_to(0.0, UNDERLINE_OFFSET_EM);
            builder.line_to(outline.advance, UNDERLINE_OFFSET_EM);
            if let Some(line) = builder.finish() {
                let stroke = Stroke { width: UNDERLINE_WIDTH_EM, ..Stroke::default() };
                self.pixmap.stroke_path(&line, &paint, &stroke, glyph_transform, mask);
            }
        }
    }
}

impl Surface for RasterSurface<'_> {
    fn fill(&mut self, color: Color) {
        self.pixmap.fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    fn draw_picture(&mut self, picture: &Picture, placement: Affine) {
        let transform = to_skia(picture.transform().then(placement));
        let mask = if picture.layers().iter().any(|layer| layer.clipped) {
            self.clip_mask(picture, placement)
        } else {
            None
        };
        for layer in picture.layers() {
            let layer_mask = if layer.clipped { mask.as_ref() } else { None };
            for primitive in &layer.primitives {
                match primitive {
                    Primitive::Shape(shape) => self.draw_shape(shape, transform, layer_mask),
                    Primitive::Text(run) => self.draw_text(run, transform, layer_mask),
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_skia(affine: Affine) -> Transform {
    Transform::from_row(affine.sx as f32, 0.0, 0.0, affine.sy as f32, affine.tx as f32, affine.ty as f32)
}

#[allow(clippy::cast_possible_truncation)]
fn build_path(ops: &[PathOp]) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for op in ops {
        match *op {
            PathOp::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathOp::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathOp::Close => builder.close(),
            PathOp::Circle { center, radius } => builder.push_circle(center.x as f32, center.y as f32, radius as f32),
        }
    }
    builder.finish()
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

#[allow(clippy::cast_possible_truncation)]
fn stroke_for(pen: &Pen) -> Stroke {
    let line_cap = match pen.cap {
        CapStyle::Square => LineCap::Square,
        CapStyle::Flat => LineCap::Butt,
        CapStyle::Round => LineCap::Round,
    };
    let line_join = match pen.join {
        JoinStyle::Bevel => LineJoin::Bevel,
        JoinStyle::Miter => LineJoin::Miter,
        JoinStyle::Round => LineJoin::Round,
    };
    let dash = pen
        .dash_array()
        .and_then(|lengths| StrokeDash::new(lengths.into_iter().map(|len| len as f32).collect(), 0.0));
    Stroke { width: pen.width.max(0.0) as f32, line_cap, line_join, dash, ..Stroke::default() }
}
