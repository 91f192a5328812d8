//! Output exporter: re-renders the picture list into a file.
//!
//! DESIGN
//! ======
//! Every output is produced by replaying the finalized pictures onto a fresh
//! surface, never by copying the on-screen buffer, so exports are device
//! independent. The output kind is resolved from the explicit format name or
//! the filename extension:
//!
//! - `svg` → [`SvgSurface`] at canvas size
//! - `ps` → [`PostScriptSurface`] on a US Letter page
//! - `gif` → PNG, with the filename extension rewritten to `.png`
//! - anything the compiled `image` encoders can write → [`RasterSurface`]
//!
//! Export failures are resource errors: the dispatcher logs them and keeps
//! running.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::attrs::Color;
use crate::consts::{LETTER_HEIGHT_IN, LETTER_WIDTH_IN, POSTSCRIPT_DPI};
use crate::fonts::FontBook;
use crate::picture::Picture;
use crate::postscript::{PageSize, PostScriptSurface};
use crate::raster::RasterSurface;
use crate::render::{StatusSink, Surface, paint};
use crate::svg::SvgSurface;
use crate::view::{Affine, Point};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(String),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot allocate output surface: {0}")]
    Surface(String),
}

impl frames::ErrorCode for ExportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "E_UNSUPPORTED_FORMAT",
            Self::Io { .. } => "E_IO",
            Self::Encode { .. } => "E_ENCODE",
            Self::Surface(_) => "E_SURFACE",
        }
    }

    fn is_fatal(&self) -> bool {
        false
    }
}

// =============================================================================
// REQUEST AND TARGET
// =============================================================================

/// A `save` command.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub filename: String,
    /// Explicit format name; the filename extension is used when absent.
    pub format: Option<String>,
    /// Leave the background unpainted instead of using the clear colour.
    pub transparent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Raster(ImageFormat),
    Svg,
    PostScript,
}

/// Where and how a save request is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub path: PathBuf,
    pub kind: OutputKind,
}

/// Resolve the output kind and final path of `request`.
///
/// # Errors
///
/// `UnsupportedFormat` when no format can be determined, for `pdf`, and for
/// raster formats the compiled encoders cannot write.
pub fn resolve_target(request: &SaveRequest) -> Result<Target, ExportError> {
    let mut path = PathBuf::from(&request.filename);
    let name = match &request.format {
        Some(format) => format.to_ascii_lowercase(),
        None => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default(),
    };
    let kind = match name.as_str() {
        "" => return Err(ExportError::UnsupportedFormat(name)),
        "gif" => {
            path.set_extension("png");
            OutputKind::Raster(ImageFormat::Png)
        }
        "svg" => OutputKind::Svg,
        "ps" => OutputKind::PostScript,
        _ => match ImageFormat::from_extension(&name) {
            Some(format) if format.writing_enabled() && raster_supported(format) => OutputKind::Raster(format),
            _ => return Err(ExportError::UnsupportedFormat(name)),
        },
    };
    Ok(Target { path, kind })
}

fn raster_supported(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff | ImageFormat::Pnm
    )
}

fn keeps_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff)
}

// =============================================================================
// PAGE LAYOUT
// =============================================================================

/// Print page selection, adjustable through [`ExportHost::tune_page`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    /// Portrait paper size in points.
    pub paper: PageSize,
    pub landscape: bool,
}

impl PageSetup {
    /// US Letter, landscape when the canvas is wider than tall.
    #[must_use]
    pub fn letter_for(width: u32, height: u32) -> Self {
        Self {
            paper: PageSize { width: LETTER_WIDTH_IN * POSTSCRIPT_DPI, height: LETTER_HEIGHT_IN * POSTSCRIPT_DPI },
            landscape: width > height,
        }
    }

    /// Page size in points, oriented.
    #[must_use]
    pub fn page(&self) -> PageSize {
        if self.landscape {
            PageSize { width: self.paper.height, height: self.paper.width }
        } else {
            self.paper
        }
    }
}

/// Fit of the canvas onto a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    /// Offset of the centred canvas, in page units.
    pub left: f64,
    pub top: f64,
    /// Physical enlargement of the canvas, multiplied by the canvas scale.
    pub factor: f64,
}

/// Centre the canvas's physical size on a page.
///
/// The page is `page_width` × `page_height` units at `page_res` units per
/// inch; the canvas is `width` × `height` pixels at `dpi` pixels per inch on
/// both axes. The canvas is enlarged to fill the page while keeping its
/// aspect ratio, then the enlargement is multiplied by `scale`.
#[must_use]
pub fn fit_to_page(
    page_width: f64,
    page_height: f64,
    page_res: f64,
    width: u32,
    height: u32,
    dpi: f64,
    scale: f64,
) -> PageFit {
    let (page_w_in, page_h_in) = (page_width / page_res, page_height / page_res);
    let (canvas_w_in, canvas_h_in) = (f64::from(width) / dpi, f64::from(height) / dpi);
    let factor = (page_w_in / canvas_w_in).min(page_h_in / canvas_h_in);
    PageFit {
        left: 0.5 * page_res * (page_w_in - factor * canvas_w_in),
        top: 0.5 * page_res * (page_h_in - factor * canvas_h_in),
        factor: factor * scale,
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// Everything the exporter needs to know about the current scene.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub pictures: &'a [Picture],
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub clear_color: Color,
    pub dpi: (f64, f64),
}

/// Host services used while exporting.
pub trait ExportHost: StatusSink {
    /// Let the user adjust the print page. Returns `false` when cancelled.
    fn tune_page(&mut self, _page: &mut PageSetup) -> bool {
        true
    }
}

/// Write `scene` as described by `request`.
///
/// Returns the path written, or `None` when an interactive page setup was
/// cancelled.
///
/// # Errors
///
/// Any [`ExportError`]; nothing is written on error.
pub fn export(
    scene: &Scene<'_>,
    request: &SaveRequest,
    interactive: bool,
    fonts: &FontBook,
    host: &mut dyn ExportHost,
) -> Result<Option<PathBuf>, ExportError> {
    let target = resolve_target(request)?;
    debug!(path = %target.path.display(), kind = ?target.kind, "resolved export target");
    match target.kind {
        OutputKind::Raster(format) => write_raster(scene, request.transparent, fonts, host, &target.path, format)?,
        OutputKind::Svg => write_svg(scene, request.transparent, host, &target.path)?,
        OutputKind::PostScript => {
            let mut setup = PageSetup::letter_for(scene.width, scene.height);
            if interactive && !host.tune_page(&mut setup) {
                info!(path = %target.path.display(), "print export cancelled");
                return Ok(None);
            }
            write_postscript(scene, request.transparent, setup.page(), host, &target.path)?;
        }
    }
    info!(path = %target.path.display(), pictures = scene.pictures.len(), "exported scene");
    Ok(Some(target.path))
}

fn background(scene: &Scene<'_>, transparent: bool) -> Option<Color> {
    (!transparent).then_some(scene.clear_color)
}

/// Render the scene into a new pixmap at canvas size.
///
/// # Errors
///
/// `Surface` when the pixmap cannot be allocated.
pub fn render_pixmap(
    scene: &Scene<'_>,
    transparent: bool,
    fonts: &FontBook,
    status: &mut dyn StatusSink,
) -> Result<Pixmap, ExportError> {
    let mut pixmap = Pixmap::new(scene.width, scene.height)
        .ok_or_else(|| ExportError::Surface(format!("{}x{} pixmap", scene.width, scene.height)))?;
    let mut surface = RasterSurface::new(&mut pixmap, fonts);
    surface.fill(background(scene, transparent).unwrap_or(Color::TRANSPARENT_WHITE));
    paint(&mut surface, scene.pictures, 0, 0.0, 0.0, scene.scale, "Saving", status);
    Ok(pixmap)
}

/// Convert premultiplied pixmap data into a straight-alpha image.
///
/// # Errors
///
/// `Surface` when the pixel buffer does not match the pixmap size.
pub fn to_image(pixmap: &Pixmap) -> Result<RgbaImage, ExportError> {
    let mut raw = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        raw.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .ok_or_else(|| ExportError::Surface("pixel buffer size mismatch".to_owned()))
}

fn write_raster(
    scene: &Scene<'_>,
    transparent: bool,
    fonts: &FontBook,
    host: &mut dyn ExportHost,
    path: &Path,
    format: ImageFormat,
) -> Result<(), ExportError> {
    let pixmap = render_pixmap(scene, transparent, fonts, host)?;
    let image = to_image(&pixmap)?;
    let encoded = if keeps_alpha(format) {
        image.save_with_format(path, format)
    } else {
        DynamicImage::ImageRgba8(image).to_rgb8().save_with_format(path, format)
    };
    encoded.map_err(|source| ExportError::Encode { path: path.to_path_buf(), source })
}

fn write_svg(scene: &Scene<'_>, transparent: bool, host: &mut dyn ExportHost, path: &Path) -> Result<(), ExportError> {
    let mut surface = SvgSurface::new(scene.width, scene.height);
    if let Some(color) = background(scene, transparent) {
        surface.fill(color);
    }
    paint(&mut surface, scene.pictures, 0, 0.0, 0.0, scene.scale, "Saving", host);
    write_text(path, &surface.finish())
}

fn write_postscript(
    scene: &Scene<'_>,
    transparent: bool,
    page: PageSize,
    host: &mut dyn ExportHost,
    path: &Path,
) -> Result<(), ExportError> {
    let placement = print_placement(scene, page);
    let mut surface = PostScriptSurface::new(page);
    if let Some(color) = background(scene, transparent) {
        surface.fill(color);
    }
    paint(&mut surface, scene.pictures, 0, placement.tx, placement.ty, placement.sx, "Saving", host);
    write_text(path, &surface.finish())
}

/// Map from picture pixels to page points.
///
/// Placement is uniform, so the horizontal resolution converts pixels to
/// inches on both axes when fitting the page.
pub(crate) fn print_placement(scene: &Scene<'_>, page: PageSize) -> Affine {
    let dpi = scene.dpi.0;
    let fit = fit_to_page(page.width, page.height, POSTSCRIPT_DPI, scene.width, scene.height, dpi, scene.scale);
    let points_per_pixel = fit.factor * POSTSCRIPT_DPI / dpi;
    Affine::placement(Point::new(fit.left / points_per_pixel, fit.top / points_per_pixel), points_per_pixel)
}

fn write_text(path: &Path, text: &str) -> Result<(), ExportError> {
    std::fs::write(path, text).map_err(|source| ExportError::Io { path: path.to_path_buf(), source })
}
