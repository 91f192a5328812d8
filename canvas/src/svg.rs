//! SVG document surface.
//!
//! Builds the document as text. Each picture layer becomes a
//! `<g transform="matrix(...)">` group in window coordinates, wrapped in an
//! outer group that references a `clipPath` in output coordinates when the
//! layer is clipped. Cosmetic pens use `vector-effect="non-scaling-stroke"`
//! so they stay one unit wide.

#[cfg(test)]
#[path = "svg_test.rs"]
mod svg_test;

use crate::attrs::{Brush, CapStyle, Color, JoinStyle, Pen};
use crate::picture::{Picture, Primitive, Shape, TextRun};
use crate::render::{Surface, num};
use crate::symbol::PathOp;
use crate::view::Affine;

/// Accumulates an SVG document of a fixed size.
#[derive(Debug)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    defs: String,
    body: String,
    next_clip: usize,
}

impl SvgSurface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, defs: String::new(), body: String::new(), next_clip: 0 }
    }

    /// The complete document.
    #[must_use]
    pub fn finish(self) -> String {
        let mut doc = String::new();
        doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
        doc.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height
        ));
        if !self.defs.is_empty() {
            doc.push_str("<defs>\n");
            doc.push_str(&self.defs);
            doc.push_str("</defs>\n");
        }
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc
    }

    fn add_clip(&mut self, picture: &Picture, placement: Affine) -> String {
        let clip = placement.map_rect(picture.clip());
        let id = format!("clip{}", self.next_clip);
        self.next_clip += 1;
        self.defs.push_str(&format!(
            "<clipPath id=\"{id}\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"/></clipPath>\n",
            num(clip.x),
            num(clip.y),
            num(clip.width),
            num(clip.height)
        ));
        id
    }

    fn shape(&mut self, shape: &Shape) {
        let d = path_data(&shape.ops);
        if d.is_empty() {
            return;
        }
        let mut attrs = fill_attrs(shape.brush);
        attrs.push_str(&stroke_attrs(shape.pen));
        self.body.push_str(&format!("<path d=\"{d}\"{attrs}/>\n"));
    }

    fn text(&mut self, run: &TextRun) {
        if !run.pen.is_visible() {
            return;
        }
        let (x, y) = (num(run.origin.x), num(run.origin.y));
        let mut attrs = format!(
            " font-family=\"{}\" font-size=\"{}\"",
            escape(&run.font.family),
            num(run.font.size)
        );
        if run.font.bold {
            attrs.push_str(" font-weight=\"bold\"");
        }
        if run.font.italic {
            attrs.push_str(" font-style=\"italic\"");
        }
        if run.font.underline {
            attrs.push_str(" text-decoration=\"underline\"");
        }
        if run.rotate != 0.0 {
            attrs.push_str(&format!(" transform=\"rotate({} {x} {y})\"", num(run.rotate)));
        }
        attrs.push_str(&color_attr("fill", run.pen.color));
        self.body.push_str(&format!("<text x=\"{x}\" y=\"{y}\"{attrs}>{}</text>\n", escape(&run.text)));
    }
}

impl Surface for SvgSurface {
    fn fill(&mut self, color: Color) {
        self.body.push_str(&format!(
            "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\"{}/>\n",
            self.width,
            self.height,
            color_attr("fill", color)
        ));
    }

    fn draw_picture(&mut self, picture: &Picture, placement: Affine) {
        let t = picture.transform().then(placement);
        let matrix = format!("matrix({} 0 0 {} {} {})", num(t.sx), num(t.sy), num(t.tx), num(t.ty));
        for layer in picture.layers() {
            let clip = layer.clipped.then(|| self.add_clip(picture, placement));
            if let Some(id) = &clip {
                self.body.push_str(&format!("<g clip-path=\"url(#{id})\">\n"));
            }
            self.body.push_str(&format!("<g transform=\"{matrix}\">\n"));
            for primitive in &layer.primitives {
                match primitive {
                    Primitive::Shape(shape) => self.shape(shape),
                    Primitive::Text(run) => self.text(run),
                }
            }
            self.body.push_str("</g>\n");
            if clip.is_some() {
                self.body.push_str("</g>\n");
            }
        }
    }
}

fn path_data(ops: &[PathOp]) -> String {
    let mut parts = Vec::with_capacity(ops.len());
    for op in ops {
        match *op {
            PathOp::MoveTo(p) => parts.push(format!("M{} {}", num(p.x), num(p.y))),
            PathOp::LineTo(p) => parts.push(format!("L{} {}", num(p.x), num(p.y))),
            PathOp::Close => parts.push("Z".to_owned()),
            PathOp::Circle { center, radius } => {
                let r = num(radius);
                let (left, right, cy) = (num(center.x - radius), num(center.x + radius), num(center.y));
                parts.push(format!("M{left} {cy} A{r} {r} 0 1 0 {right} {cy} A{r} {r} 0 1 0 {left} {cy} Z"));
            }
        }
    }
    parts.join(" ")
}

fn color_attr(name: &str, color: Color) -> String {
    let mut attr = format!(" {name}=\"{}\"", color.css_rgb());
    if color.a < 255 {
        attr.push_str(&format!(" {name}-opacity=\"{}\"", num(color.opacity())));
    }
    attr
}

fn fill_attrs(brush: Option<Brush>) -> String {
    match brush.filter(Brush::is_visible) {
        Some(brush) => color_attr("fill", brush.color),
        None => " fill=\"none\"".to_owned(),
    }
}

fn stroke_attrs(pen: Option<Pen>) -> String {
    let Some(pen) = pen.filter(Pen::is_visible) else {
        return String::new();
    };
    let mut attrs = color_attr("stroke", pen.color);
    if pen.is_cosmetic() {
        attrs.push_str(" stroke-width=\"1\" vector-effect=\"non-scaling-stroke\"");
    } else {
        attrs.push_str(&format!(" stroke-width=\"{}\"", num(pen.width)));
    }
    let cap = match pen.cap {
        CapStyle::Square => "square",
        CapStyle::Flat => "butt",
        CapStyle::Round => "round",
    };
    let join = match pen.join {
        JoinStyle::Bevel => "bevel",
        JoinStyle::Miter => "miter",
        JoinStyle::Round => "round",
    };
    attrs.push_str(&format!(" stroke-linecap=\"{cap}\" stroke-linejoin=\"{join}\""));
    if let Some(dashes) = pen.dash_array() {
        let list: Vec<String> = dashes.into_iter().map(num).collect();
        attrs.push_str(&format!(" stroke-dasharray=\"{}\"", list.join(" ")));
    }
    attrs
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
