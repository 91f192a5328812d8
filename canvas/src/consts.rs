//! Shared numeric constants for the canvas crate.

// ── Canvas ──────────────────────────────────────────────────────

/// Initial canvas width in device pixels (about sqrt(0.75) × 1280).
pub const DEFAULT_CANVAS_WIDTH: u32 = 1110;

/// Initial canvas height in device pixels (about sqrt(0.75) × 1024).
pub const DEFAULT_CANVAS_HEIGHT: u32 = 890;

/// Smallest allowed canvas dimension in device pixels.
pub const MIN_CANVAS_SIZE: u32 = 256;

/// Screen resolution assumed when the shell does not report one.
pub const DEFAULT_DPI: f64 = 96.0;

// ── Recording ───────────────────────────────────────────────────

/// Primitive count that forces an implicit scene update mid-view.
pub const MAX_DRAWS_PER_PICTURE: usize = 256;

/// Side length of the box symbol glyphs are defined in.
pub const SYMBOL_BOX: f64 = 100.0;

/// Pen width, in symbol units, used for outline-only symbols.
pub const SYMBOL_PEN_WIDTH: f64 = 15.0;

/// Font size, in user units, when a text command gives no font.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

// ── Print ───────────────────────────────────────────────────────

/// Resolution of PostScript user space (points per inch).
pub const POSTSCRIPT_DPI: f64 = 72.0;

/// US Letter paper width in inches.
pub const LETTER_WIDTH_IN: f64 = 8.5;

/// US Letter paper height in inches.
pub const LETTER_HEIGHT_IN: f64 = 11.0;

// ── Status ──────────────────────────────────────────────────────

/// Status message shown when no compositing is in progress.
pub const STATUS_READY: &str = "Ready";
