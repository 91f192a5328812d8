//! Command interpreter and picture model of the piped graphics viewer.
//!
//! A controlling process streams declarative drawing commands; this crate
//! validates them, records them into immutable pictures under per-view
//! coordinate transforms, composites those pictures onto an on-screen pixel
//! buffer, and re-renders them for raster, SVG, and PostScript output. The
//! host binary supplies the channel and a [`engine::Shell`] for presentation.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::Viewer`]: state, view lifecycle, dispatch, refresh policy |
//! | [`command`] | Typed [`command::Command`] decoded from wire frames |
//! | [`attrs`] | Colors, pens, brushes, and fonts resolved from attribute mappings |
//! | [`symbol`] | Marker shapes for `drawPoints` |
//! | [`view`] | Coordinate flipping and view → device transforms |
//! | [`picture`] | Picture recorder and the immutable [`picture::Picture`] |
//! | [`render`] | Scene compositor and the [`render::Surface`] seam |
//! | [`raster`] | `tiny-skia` pixmap surface |
//! | [`svg`] | SVG document surface |
//! | [`postscript`] | PostScript page surface |
//! | [`fonts`] | Font file discovery and glyph outlines for raster text |
//! | [`export`] | File export: format resolution, page fitting, writers |
//! | [`consts`] | Shared numeric constants (canvas defaults, ceilings, page sizes) |

pub mod attrs;
pub mod command;
pub mod consts;
pub mod engine;
pub mod export;
pub mod fonts;
pub mod picture;
pub mod postscript;
pub mod raster;
pub mod render;
pub mod svg;
pub mod symbol;
pub mod view;
