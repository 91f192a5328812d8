//! Attribute resolver: colors, pens, brushes, and fonts from command payloads.
//!
//! Commands describe drawing attributes as small JSON mappings, for example
//! `{"color": 0x880000, "alpha": 128, "width": 5, "style": "dash"}`. This
//! module turns those mappings into the typed attributes that recorded
//! primitives carry. Colors accept a 24-bit integer, a `"#rrggbb"` string, or
//! a name from a fixed table; `alpha` is a separate 0-255 key.

#[cfg(test)]
#[path = "attrs_test.rs"]
mod attrs_test;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::consts::DEFAULT_FONT_SIZE;

/// Error returned while resolving an attribute mapping.
#[derive(Debug, thiserror::Error)]
pub enum AttrError {
    /// The attribute value is not a JSON mapping.
    #[error("attribute is not a mapping")]
    NotAMapping,
    /// A required key is absent.
    #[error("missing attribute key `{0}`")]
    MissingKey(&'static str),
    /// A color name is not in the table.
    #[error("unknown color `{0}`")]
    UnknownColor(String),
    /// A key holds a value of the wrong type or range.
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
    /// A symbol name is not known.
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
}

// =============================================================================
// COLOR
// =============================================================================

/// 8-bit RGBA color, not premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// White with zero alpha; the initial clear color.
    pub const TRANSPARENT_WHITE: Self = Self { r: 255, g: 255, b: 255, a: 0 };

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Build an opaque color from a `0xRRGGBB` value; higher bits are ignored.
    #[must_use]
    pub fn from_rgb24(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Self::rgb(r, g, b)
    }

    /// Look up a color by name (case-insensitive) or `#rrggbb` notation.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            return match u32::from_str_radix(hex, 16) {
                Ok(value) => Some(Self::from_rgb24(value)),
                Err(_) => None,
            };
        }
        let color = match lower.as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "lime" => Self::rgb(0, 255, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "cyan" => Self::rgb(0, 255, 255),
            "magenta" => Self::rgb(255, 0, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "darkgray" | "darkgrey" => Self::rgb(169, 169, 169),
            "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "lightblue" => Self::rgb(173, 216, 230),
            "darkblue" => Self::rgb(0, 0, 139),
            "navy" => Self::rgb(0, 0, 128),
            "darkred" => Self::rgb(139, 0, 0),
            "darkgreen" => Self::rgb(0, 100, 0),
            "orange" => Self::rgb(255, 165, 0),
            "purple" => Self::rgb(128, 0, 128),
            "brown" => Self::rgb(165, 42, 42),
            "pink" => Self::rgb(255, 192, 203),
            "transparent" => Self { r: 0, g: 0, b: 0, a: 0 },
            _ => return None,
        };
        Some(color)
    }

    /// Alpha as a fraction in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        f64::from(self.a) / 255.0
    }

    /// `rgb(r,g,b)` notation for SVG attributes.
    #[must_use]
    pub fn css_rgb(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Resolve the optional `color` and `alpha` keys of a mapping.
///
/// Returns `Ok(None)` when there is no `color` key.
///
/// # Errors
///
/// Returns [`AttrError::UnknownColor`] or [`AttrError::InvalidValue`] when
/// the keys are present but unusable.
pub fn optional_color(map: &serde_json::Map<String, Value>) -> Result<Option<Color>, AttrError> {
    let Some(raw) = map.get("color") else {
        return Ok(None);
    };
    let color = match raw {
        Value::String(name) => Color::named(name).ok_or_else(|| AttrError::UnknownColor(name.clone()))?,
        Value::Number(n) => {
            let value = n.as_f64().unwrap_or(-1.0);
            if !(0.0..=f64::from(0x00FF_FFFF_u32)).contains(&value) {
                return Err(AttrError::InvalidValue { key: "color", value: raw.to_string() });
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Color::from_rgb24(value.round() as u32)
        }
        other => return Err(AttrError::InvalidValue { key: "color", value: other.to_string() }),
    };
    match map.get("alpha") {
        None | Some(Value::Null) => Ok(Some(color)),
        Some(raw) => Ok(Some(color.with_alpha(alpha_from(raw)?))),
    }
}

fn alpha_from(raw: &Value) -> Result<u8, AttrError> {
    let value = raw.as_f64().unwrap_or(-1.0);
    if !(0.0..=255.0).contains(&value) {
        return Err(AttrError::InvalidValue { key: "alpha", value: raw.to_string() });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value.round() as u8)
}

fn as_mapping(value: &Value) -> Result<&serde_json::Map<String, Value>, AttrError> {
    value.as_object().ok_or(AttrError::NotAMapping)
}

// =============================================================================
// PEN
// =============================================================================

/// Dash style of a pen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
    /// Nothing is stroked.
    NoPen,
}

impl LineStyle {
    /// Dash pattern in units of the pen width; empty for solid lines.
    #[must_use]
    pub fn pattern(self) -> &'static [f64] {
        match self {
            Self::Solid | Self::NoPen => &[],
            Self::Dash => &[4.0, 2.0],
            Self::Dot => &[1.0, 2.0],
            Self::DashDot => &[4.0, 2.0, 1.0, 2.0],
            Self::DashDotDot => &[4.0, 2.0, 1.0, 2.0, 1.0, 2.0],
        }
    }
}

/// Line end decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapStyle {
    #[default]
    Square,
    Flat,
    Round,
}

/// Corner decoration between joined segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    #[default]
    Bevel,
    Miter,
    Round,
}

/// Stroke attributes. Width is in user units; zero means a one-pixel
/// cosmetic line regardless of scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f64,
    pub style: LineStyle,
    pub cap: CapStyle,
    pub join: JoinStyle,
}

impl Pen {
    /// One-pixel solid pen.
    #[must_use]
    pub fn cosmetic(color: Color) -> Self {
        Self { color, width: 0.0, style: LineStyle::Solid, cap: CapStyle::Round, join: JoinStyle::Round }
    }

    #[must_use]
    pub fn is_cosmetic(&self) -> bool {
        self.width <= 0.0
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.style != LineStyle::NoPen && self.color.a > 0
    }

    /// Dash lengths scaled by the pen width, or `None` for a solid line.
    #[must_use]
    pub fn dash_array(&self) -> Option<Vec<f64>> {
        let pattern = self.style.pattern();
        if pattern.is_empty() {
            return None;
        }
        let unit = self.width.max(1.0);
        Some(pattern.iter().map(|len| len * unit).collect())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PenSpec {
    width: f64,
    style: LineStyle,
    capstyle: CapStyle,
    joinstyle: JoinStyle,
}

/// Resolve a pen mapping. The color defaults to opaque black.
///
/// # Errors
///
/// Returns an [`AttrError`] for a non-mapping value, an unusable color, an
/// unknown style name, or a negative width.
pub fn pen_from(value: &Value) -> Result<Pen, AttrError> {
    let map = as_mapping(value)?;
    let color = optional_color(map)?.unwrap_or(Color::BLACK);
    let mut spec_map = map.clone();
    spec_map.remove("color");
    spec_map.remove("alpha");
    let spec: PenSpec = serde_json::from_value(Value::Object(spec_map))
        .map_err(|e| AttrError::InvalidValue { key: "pen", value: e.to_string() })?;
    if spec.width.is_nan() || spec.width < 0.0 {
        return Err(AttrError::InvalidValue { key: "width", value: spec.width.to_string() });
    }
    Ok(Pen { color, width: spec.width, style: spec.style, cap: spec.capstyle, join: spec.joinstyle })
}

// =============================================================================
// BRUSH
// =============================================================================

/// Fill style of a brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushStyle {
    #[default]
    Solid,
    /// Nothing is filled.
    NoBrush,
}

/// Fill attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub style: BrushStyle,
}

impl Brush {
    #[must_use]
    pub fn solid(color: Color) -> Self {
        Self { color, style: BrushStyle::Solid }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.style == BrushStyle::Solid && self.color.a > 0
    }
}

const HATCH_STYLES: &[&str] = &[
    "hor", "ver", "cross", "bdiag", "fdiag", "diagcross", "dense1", "dense2", "dense3", "dense4",
    "dense5", "dense6", "dense7",
];

/// Resolve a brush mapping. The color defaults to opaque black.
///
/// Hatch pattern names are accepted and filled solid.
///
/// # Errors
///
/// Returns an [`AttrError`] for a non-mapping value, an unusable color, or
/// an unknown style name.
pub fn brush_from(value: &Value) -> Result<Brush, AttrError> {
    let map = as_mapping(value)?;
    let color = optional_color(map)?.unwrap_or(Color::BLACK);
    let style = match map.get("style") {
        None | Some(Value::Null) => BrushStyle::Solid,
        Some(Value::String(name)) => match name.to_ascii_lowercase().as_str() {
            "solid" => BrushStyle::Solid,
            "nobrush" => BrushStyle::NoBrush,
            hatch if HATCH_STYLES.contains(&hatch) => {
                debug!(style = hatch, "hatch brush filled solid");
                BrushStyle::Solid
            }
            _ => return Err(AttrError::InvalidValue { key: "style", value: name.clone() }),
        },
        Some(other) => return Err(AttrError::InvalidValue { key: "style", value: other.to_string() }),
    };
    Ok(Brush { color, style })
}

// =============================================================================
// FONT
// =============================================================================

/// Text attributes. Size is in user units.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_owned(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

/// Resolve a font mapping; absent keys take [`Font::default`] values.
///
/// # Errors
///
/// Returns an [`AttrError`] for a non-mapping value, mistyped keys, or a
/// non-positive size.
pub fn font_from(value: &Value) -> Result<Font, AttrError> {
    as_mapping(value)?;
    let font: Font = serde_json::from_value(value.clone())
        .map_err(|e| AttrError::InvalidValue { key: "font", value: e.to_string() })?;
    if font.size.is_nan() || font.size <= 0.0 {
        return Err(AttrError::InvalidValue { key: "size", value: font.size.to_string() });
    }
    Ok(font)
}
