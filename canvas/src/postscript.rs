//! Single-page PostScript surface for print output.
//!
//! The page is set up Y-down in points (`0 H translate 1 -1 scale`) so the
//! compositor's placement works unchanged. PostScript has no alpha: fully
//! transparent fills are skipped and partial alpha is painted opaque.
//! Text uses the standard 35 fonts, picked from the requested family and
//! style.

#[cfg(test)]
#[path = "postscript_test.rs"]
mod postscript_test;

use crate::attrs::{CapStyle, Color, Font, JoinStyle, Pen};
use crate::picture::{Picture, Primitive, Shape, TextRun};
use crate::render::{Surface, num};
use crate::symbol::PathOp;
use crate::view::Affine;

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Accumulates the drawing operators of one page.
#[derive(Debug)]
pub struct PostScriptSurface {
    page: PageSize,
    body: String,
}

impl PostScriptSurface {
    #[must_use]
    pub fn new(page: PageSize) -> Self {
        Self { page, body: String::new() }
    }

    /// The complete program, ending with `showpage`.
    #[must_use]
    pub fn finish(self) -> String {
        let (w, h) = (num(self.page.width), num(self.page.height));
        let orientation = if self.page.width > self.page.height { "Landscape" } else { "Portrait" };
        let mut doc = String::new();
        doc.push_str("%!PS-Adobe-3.0\n");
        doc.push_str("%%Creator: pipedview\n");
        doc.push_str("%%Pages: 1\n");
        doc.push_str(&format!("%%BoundingBox: 0 0 {w} {h}\n"));
        doc.push_str(&format!("%%Orientation: {orientation}\n"));
        doc.push_str("%%EndComments\n");
        doc.push_str(&format!("<< /PageSize [{w} {h}] >> setpagedevice\n"));
        doc.push_str("%%Page: 1 1\n");
        doc.push_str(&format!("0 {h} translate 1 -1 scale\n"));
        doc.push_str(&self.body);
        doc.push_str("showpage\n%%EOF\n");
        doc
    }

    fn line(&mut self, text: &str) {
        self.body.push_str(text);
        self.body.push('\n');
    }

    fn shape(&mut self, shape: &Shape) {
        if shape.ops.is_empty() {
            return;
        }
        let path = path_ops(&shape.ops);
        if let Some(brush) = shape.brush.filter(|brush| brush.is_visible()) {
            self.line(&format!("newpath {path} {} fill", rgb(brush.color)));
        }
        if let Some(pen) = shape.pen.filter(Pen::is_visible) {
            self.line(&format!("gsave newpath {path} {} {} stroke grestore", rgb(pen.color), pen_ops(&pen)));
        }
    }

    fn text(&mut self, run: &TextRun) {
        if !run.pen.is_visible() || run.text.is_empty() {
            return;
        }
        let size = num(run.font.size);
        let text = ps_string(&run.text);
        self.line("gsave");
        self.line(&format!("/{} findfont [{size} 0 0 -{size} 0 0] makefont setfont", font_name(&run.font)));
        self.line(&format!(
            "{} {} translate {} rotate {}",
            num(run.origin.x),
            num(run.origin.y),
            num(run.rotate),
            rgb(run.pen.color)
        ));
        self.line(&format!("0 0 moveto {text} show"));
        if run.font.underline {
            let offset = num(run.font.size * 0.1);
            self.line(&format!(
                "newpath 0 {offset} moveto {text} stringwidth pop {offset} lineto {} setlinewidth stroke",
                num(run.font.size / 15.0)
            ));
        }
        self.line("grestore");
    }
}

impl Surface for PostScriptSurface {
    fn fill(&mut self, color: Color) {
        if color.a == 0 {
            return;
        }
        self.line(&format!(
            "gsave {} 0 0 {} {} rectfill grestore",
            rgb(color),
            num(self.page.width),
            num(self.page.height)
        ));
    }

    fn draw_picture(&mut self, picture: &Picture, placement: Affine) {
        let t = picture.transform().then(placement);
        for layer in picture.layers() {
            self.line("gsave");
            if layer.clipped {
                let clip = placement.map_rect(picture.clip());
                self.line(&format!(
                    "{} {} {} {} rectclip",
                    num(clip.x),
                    num(clip.y),
                    num(clip.width),
                    num(clip.height)
                ));
            }
            self.line(&format!("[{} 0 0 {} {} {}] concat", num(t.sx), num(t.sy), num(t.tx), num(t.ty)));
            for primitive in &layer.primitives {
                match primitive {
                    Primitive::Shape(shape) => self.shape(shape),
                    Primitive::Text(run) => self.text(run),
                }
            }
            self.line("grestore");
        }
    }
}

fn rgb(color: Color) -> String {
    format!(
        "{} {} {} setrgbcolor",
        num(f64::from(color.r) / 255.0),
        num(f64::from(color.g) / 255.0),
        num(f64::from(color.b) / 255.0)
    )
}

fn path_ops(ops: &[PathOp]) -> String {
    let mut parts = Vec::with_capacity(ops.len());
    for op in ops {
        match *op {
            PathOp::MoveTo(p) => parts.push(format!("{} {} moveto", num(p.x), num(p.y))),
            PathOp::LineTo(p) => parts.push(format!("{} {} lineto", num(p.x), num(p.y))),
            PathOp::Close => parts.push("closepath".to_owned()),
            PathOp::Circle { center, radius } => parts.push(format!(
                "{} {} moveto {} {} {} 0 360 arc closepath",
                num(center.x + radius),
                num(center.y),
                num(center.x),
                num(center.y),
                num(radius)
            )),
        }
    }
    parts.join(" ")
}

fn pen_ops(pen: &Pen) -> String {
    let cap = match pen.cap {
        CapStyle::Flat => 0,
        CapStyle::Round => 1,
        CapStyle::Square => 2,
    };
    let join = match pen.join {
        JoinStyle::Miter => 0,
        JoinStyle::Round => 1,
        JoinStyle::Bevel => 2,
    };
    let dash = match pen.dash_array() {
        Some(lengths) => lengths.into_iter().map(num).collect::<Vec<_>>().join(" "),
        None => String::new(),
    };
    // Width 0 is the thinnest line the device can render.
    format!("{} setlinewidth {cap} setlinecap {join} setlinejoin [{dash}] 0 setdash", num(pen.width.max(0.0)))
}

fn font_name(font: &Font) -> &'static str {
    let family = font.family.to_ascii_lowercase();
    let serif = (family.contains("serif") && !family.contains("sans")) || family.contains("times");
    let mono = family.contains("mono") || family.contains("courier");
    match (serif, mono, font.bold, font.italic) {
        (_, true, false, false) => "Courier",
        (_, true, true, false) => "Courier-Bold",
        (_, true, false, true) => "Courier-Oblique",
        (_, true, true, true) => "Courier-BoldOblique",
        (true, false, false, false) => "Times-Roman",
        (true, false, true, false) => "Times-Bold",
        (true, false, false, true) => "Times-Italic",
        (true, false, true, true) => "Times-BoldItalic",
        (false, false, false, false) => "Helvetica",
        (false, false, true, false) => "Helvetica-Bold",
        (false, false, false, true) => "Helvetica-Oblique",
        (false, false, true, true) => "Helvetica-BoldOblique",
    }
}

/// PostScript string literal; characters outside Latin-1 become `?`.
fn ps_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            _ => match u8::try_from(u32::from(ch)) {
                Ok(byte) => out.push_str(&format!("\\{byte:03o}")),
                Err(_) => out.push('?'),
            },
        }
    }
    out.push(')');
    out
}
