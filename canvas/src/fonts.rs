//! Font loading and glyph outlining for raster text.
//!
//! Vector outputs emit text natively and let the reader pick a font. Raster
//! output needs real outlines, so the viewer loads one TrueType/OpenType
//! file at startup: an explicit path from configuration, otherwise the first
//! readable entry of [`SYSTEM_FONT_PATHS`]. Without a font, raster text is
//! skipped.

#[cfg(test)]
#[path = "fonts_test.rs"]
mod fonts_test;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tiny_skia::PathBuilder;
use tracing::{debug, info, warn};

/// Fallback font files tried in order when no font is configured.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse font {path}: {source}")]
    Parse { path: PathBuf, source: ttf_parser::FaceParsingError },
}

/// Outlined text in em-relative units, baseline at y = 0, Y down.
pub struct TextOutline {
    pub path: Option<tiny_skia::Path>,
    /// Horizontal advance of the whole run.
    pub advance: f32,
}

/// The single face used for raster text. Cheap to clone.
#[derive(Clone, Default)]
pub struct FontBook {
    data: Option<Arc<[u8]>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook").field("path", &self.path).finish_non_exhaustive()
    }
}

impl FontBook {
    /// A book with no face; raster text is skipped.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and validate a font file.
    ///
    /// # Errors
    ///
    /// Returns [`FontError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let bytes = fs::read(path).map_err(|source| FontError::Io { path: path.to_owned(), source })?;
        ttf_parser::Face::parse(&bytes, 0).map_err(|source| FontError::Parse { path: path.to_owned(), source })?;
        Ok(Self { data: Some(Arc::from(bytes)), path: Some(path.to_owned()) })
    }

    /// Load `explicit` if given, otherwise the first usable system font.
    #[must_use]
    pub fn discover(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            match Self::from_file(path) {
                Ok(book) => {
                    info!(path = %path.display(), "loaded font");
                    return book;
                }
                Err(err) => warn!(%err, "configured font unusable, searching system fonts"),
            }
        }
        for candidate in SYSTEM_FONT_PATHS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::from_file(path) {
                Ok(book) => {
                    info!(path = %path.display(), "loaded system font");
                    return book;
                }
                Err(err) => debug!(%err, "skipping system font"),
            }
        }
        warn!("no usable font found; raster text will be skipped");
        Self::empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Outline `text` at a size of one unit per em.
    ///
    /// Characters without a glyph advance by nothing and draw nothing.
    /// Returns `None` when the book is empty.
    #[must_use]
    pub fn outline(&self, text: &str) -> Option<TextOutline> {
        let data = self.data.as_ref()?;
        let face = match ttf_parser::Face::parse(data, 0) {
            Ok(face) => face,
            Err(err) => {
                warn!(%err, "font failed to parse");
                return None;
            }
        };
        let scale = 1.0 / f32::from(face.units_per_em());
        let mut builder = GlyphPathBuilder { path: PathBuilder::new(), x: 0.0, scale };
        for ch in text.chars() {
            let Some(glyph) = face.glyph_index(ch) else { continue };
            face.outline_glyph(glyph, &mut builder);
            builder.x += f32::from(face.glyph_hor_advance(glyph).unwrap_or(0)) * scale;
        }
        let advance = builder.x;
        Some(TextOutline { path: builder.path.finish(), advance })
    }
}

/// Collects glyph outlines into one path, flipping font Y-up to Y-down.
struct GlyphPathBuilder {
    path: PathBuilder,
    x: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn px(&self, gx: f32) -> f32 {
        self.x + gx * self.scale
    }

    fn py(&self, gy: f32) -> f32 {
        -gy * self.scale
    }
}

impl ttf_parser::OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.path.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.path.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.px(x1), self.py(y1), self.px(x), self.py(y));
        self.path.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1, x2, y2, x, y) = (self.px(x1), self.py(y1), self.px(x2), self.py(y2), self.px(x), self.py(y));
        self.path.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.path.close();
    }
}
