use super::*;
use crate::attrs::Brush;
use crate::picture::PictureRecorder;
use crate::render::NoStatus;
use crate::view::{Sides, build_view};

#[derive(Default)]
struct Host {
    statuses: Vec<String>,
    cancel: bool,
    tuned: Option<PageSetup>,
}

impl StatusSink for Host {
    fn show_status(&mut self, message: &str) {
        self.statuses.push(message.to_owned());
    }
}

impl ExportHost for Host {
    fn tune_page(&mut self, page: &mut PageSetup) -> bool {
        self.tuned = Some(*page);
        !self.cancel
    }
}

fn request(filename: &str, format: Option<&str>, transparent: bool) -> SaveRequest {
    SaveRequest { filename: filename.to_owned(), format: format.map(str::to_owned), transparent }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pipedview-export-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir.join(name)
}

fn pictures() -> Vec<Picture> {
    let geometry = build_view(
        &Sides::new(0.0, 0.0, 1.0, 1.0),
        &Sides::new(0.0, 0.0, 10.0, 10.0),
        40,
        20,
        1.0,
    )
    .expect("view");
    let mut rec = PictureRecorder::new(geometry, true);
    rec.draw_rectangle(&Sides::new(0.0, 0.0, 5.0, 10.0), Some(Brush::solid(Color::rgb(255, 0, 0))), None)
        .expect("rect");
    vec![rec.finish().expect("picture")]
}

fn scene(pictures: &[Picture]) -> Scene<'_> {
    Scene { pictures, width: 40, height: 20, scale: 1.0, clear_color: Color::WHITE, dpi: (96.0, 96.0) }
}

#[test]
fn gif_resolves_to_png_with_rewritten_extension() {
    let target = resolve_target(&request("/tmp/plot.gif", None, false)).expect("target");
    assert_eq!(target.path, PathBuf::from("/tmp/plot.png"));
    assert_eq!(target.kind, OutputKind::Raster(ImageFormat::Png));

    let target = resolve_target(&request("/tmp/plot.out", Some("GIF"), false)).expect("target");
    assert_eq!(target.path, PathBuf::from("/tmp/plot.png"));
}

#[test]
fn explicit_format_overrides_extension() {
    let target = resolve_target(&request("plot.png", Some("SVG"), false)).expect("target");
    assert_eq!(target.kind, OutputKind::Svg);
    assert_eq!(target.path, PathBuf::from("plot.png"));
}

#[test]
fn extension_is_case_insensitive() {
    assert_eq!(resolve_target(&request("plot.PS", None, false)).expect("ps").kind, OutputKind::PostScript);
    assert_eq!(
        resolve_target(&request("plot.JPG", None, false)).expect("jpg").kind,
        OutputKind::Raster(ImageFormat::Jpeg)
    );
}

#[test]
fn pdf_and_unknown_formats_are_unsupported() {
    for (name, format) in [("plot.pdf", None), ("plot", None), ("plot.png", Some("xyz"))] {
        let err = resolve_target(&request(name, format, false)).expect_err(name);
        assert!(matches!(err, ExportError::UnsupportedFormat(_)), "{name}: {err}");
        assert_eq!(frames::ErrorCode::error_code(&err), "E_UNSUPPORTED_FORMAT");
        assert!(!frames::ErrorCode::is_fatal(&err));
    }
}

#[test]
fn letter_page_is_landscape_for_wide_canvas() {
    let wide = PageSetup::letter_for(1110, 890);
    assert!(wide.landscape);
    assert_eq!(wide.page(), PageSize { width: 792.0, height: 612.0 });
    let tall = PageSetup::letter_for(500, 800);
    assert_eq!(tall.page(), PageSize { width: 612.0, height: 792.0 });
}

#[test]
fn fit_centres_canvas_on_page() {
    // 960x480 px at 96 dpi is 10x5 in; an 11x8.5 in page fits it at 1.1.
    let fit = fit_to_page(792.0, 612.0, 72.0, 960, 480, 96.0, 1.0);
    assert!((fit.factor - 1.1).abs() < 1e-9);
    assert!(fit.left.abs() < 1e-9);
    assert!((fit.top - 0.5 * 72.0 * (8.5 - 5.5)).abs() < 1e-9);

    let scaled = fit_to_page(792.0, 612.0, 72.0, 960, 480, 96.0, 2.0);
    assert!((scaled.factor - 2.2).abs() < 1e-9);
    assert!((scaled.left - fit.left).abs() < 1e-9);
}

#[test]
fn print_placement_keeps_canvas_on_page_with_uneven_dpi() {
    let pictures = pictures();
    let portrait = PageSize { width: 612.0, height: 792.0 };
    for (scale, size) in [(1.0, 1000), (2.0, 2000)] {
        let scene = Scene { pictures: &pictures, width: size, height: size, scale, clear_color: Color::WHITE, dpi: (100.0, 200.0) };
        let placement = print_placement(&scene, portrait);
        let top_left = placement.map(Point::new(0.0, 0.0));
        let bottom_right = placement.map(Point::new(1000.0, 1000.0));
        assert!(top_left.x >= -1e-9 && top_left.y >= -1e-9, "{top_left:?}");
        assert!(bottom_right.x <= 612.0 + 1e-9 && bottom_right.y <= 792.0 + 1e-9, "{bottom_right:?}");
        // Square canvas fills the page width and is centred vertically.
        assert!((bottom_right.x - top_left.x - 612.0).abs() < 1e-9);
        assert!((bottom_right.y - top_left.y - 612.0).abs() < 1e-9);
        assert!((top_left.y - 90.0).abs() < 1e-9);
    }
}

#[test]
fn gif_export_writes_png_file() {
    let pictures = pictures();
    let path = scratch("scene.gif");
    let written = export(&scene(&pictures), &request(&path.to_string_lossy(), None, false), false, &FontBook::empty(), &mut Host::default())
        .expect("export")
        .expect("written");
    assert_eq!(written, path.with_extension("png"));
    let bytes = std::fs::read(&written).expect("png file");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    assert!(!path.exists());
}

#[test]
fn raster_background_is_clear_colour_or_transparent() {
    let pictures = pictures();
    let scene = scene(&pictures);
    let fonts = FontBook::empty();

    let opaque = to_image(&render_pixmap(&scene, false, &fonts, &mut NoStatus).expect("pixmap")).expect("image");
    assert_eq!(opaque.get_pixel(1, 10).0, [255, 0, 0, 255]);
    assert_eq!(opaque.get_pixel(38, 10).0, [255, 255, 255, 255]);

    let clear = to_image(&render_pixmap(&scene, true, &fonts, &mut NoStatus).expect("pixmap")).expect("image");
    assert_eq!(clear.get_pixel(38, 10).0[3], 0);
}

#[test]
fn svg_export_reports_progress() {
    let pictures = pictures();
    let path = scratch("scene.svg");
    let mut host = Host::default();
    export(&scene(&pictures), &request(&path.to_string_lossy(), None, true), false, &FontBook::empty(), &mut host)
        .expect("export");
    let doc = std::fs::read_to_string(&path).expect("svg file");
    assert!(doc.contains("viewBox=\"0 0 40 20\""));
    assert!(!doc.contains("<rect x=\"0\" y=\"0\" width=\"40\""));
    assert_eq!(host.statuses, ["Saving (piece 1 of 1)", "Ready"]);
}

#[test]
fn interactive_print_can_be_cancelled() {
    let pictures = pictures();
    let path = scratch("cancelled.ps");
    let mut host = Host { cancel: true, ..Host::default() };
    let written = export(&scene(&pictures), &request(&path.to_string_lossy(), None, false), true, &FontBook::empty(), &mut host)
        .expect("export");
    assert_eq!(written, None);
    assert!(host.tuned.is_some_and(|page| page.landscape));
    assert!(!path.exists());
}

#[test]
fn print_export_writes_postscript() {
    let pictures = pictures();
    let path = scratch("scene.ps");
    let mut host = Host::default();
    export(&scene(&pictures), &request(&path.to_string_lossy(), None, false), false, &FontBook::empty(), &mut host)
        .expect("export");
    assert!(host.tuned.is_none());
    let doc = std::fs::read_to_string(&path).expect("ps file");
    assert!(doc.starts_with("%!PS-Adobe-3.0"));
    assert!(doc.contains("<< /PageSize [792 612] >> setpagedevice"));
}

#[test]
fn missing_directory_is_an_io_error() {
    let pictures = pictures();
    let path = scratch("no-such-dir").join("scene.svg");
    let err = export(&scene(&pictures), &request(&path.to_string_lossy(), None, false), false, &FontBook::empty(), &mut Host::default())
        .expect_err("missing dir");
    assert_eq!(frames::ErrorCode::error_code(&err), "E_IO");
}
