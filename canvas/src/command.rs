//! Typed commands, validated once from inbound frames.
//!
//! A [`Frame`] is a dynamic mapping. [`Command::try_from`] checks the action
//! tag, pulls every key the action needs, and resolves nested attribute
//! mappings, so the dispatcher only ever sees well-typed payloads.

#[cfg(test)]
#[path = "command_test.rs"]
mod command_test;

use frames::Frame;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::attrs::{AttrError, Brush, Color, Font, Pen, brush_from, font_from, optional_color, pen_from};
use crate::export::SaveRequest;
use crate::picture::ViewRequest;
use crate::symbol::{Symbol, symbol_named};
use crate::view::{Point, Sides};

/// Error returned when a frame cannot become a [`Command`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command action `{0}`")]
    UnknownAction(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid attribute `{field}`: {source}")]
    Attribute { field: &'static str, source: AttrError },
}

impl frames::ErrorCode for CommandError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "E_UNKNOWN_ACTION",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
            Self::Attribute { .. } => "E_INVALID_ATTRIBUTE",
        }
    }
}

/// Payload of `drawText`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub text: String,
    pub font: Option<Font>,
    pub pen: Option<Pen>,
    /// Clockwise, in degrees.
    pub rotate: f64,
    pub location: Option<Point>,
}

/// One validated viewer command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `color` is `None` when absent or unusable; the last clear color stays.
    Clear { color: Option<Color> },
    Exit,
    Hide,
    Show,
    Dpi,
    Update,
    Redraw,
    /// Size in 0.001-inch units.
    Resize { width: f64, height: f64 },
    Scale { factor: f64 },
    Save(SaveRequest),
    SetTitle(String),
    BeginView(ViewRequest),
    ClipView(bool),
    EndView,
    DrawMultiline { points: Vec<Point>, pen: Pen },
    DrawPoints { points: Vec<Point>, symbol: Symbol, size: f64, color: Color },
    DrawPolygon { points: Vec<Point>, fill: Option<Brush>, outline: Option<Pen> },
    DrawRectangle { sides: Sides, fill: Option<Brush>, outline: Option<Pen> },
    DrawMulticolorRectangle { sides: Sides, numrows: f64, numcols: f64, colors: Vec<Color> },
    DrawText(TextRequest),
}

impl Command {
    /// Wire name of the action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Clear { .. } => "clear",
            Self::Exit => "exit",
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Dpi => "dpi",
            Self::Update => "update",
            Self::Redraw => "redraw",
            Self::Resize { .. } => "resize",
            Self::Scale { .. } => "scale",
            Self::Save(_) => "save",
            Self::SetTitle(_) => "setTitle",
            Self::BeginView(_) => "beginView",
            Self::ClipView(_) => "clipView",
            Self::EndView => "endView",
            Self::DrawMultiline { .. } => "drawMultiline",
            Self::DrawPoints { .. } => "drawPoints",
            Self::DrawPolygon { .. } => "drawPolygon",
            Self::DrawRectangle { .. } => "drawRectangle",
            Self::DrawMulticolorRectangle { .. } => "drawMulticolorRectangle",
            Self::DrawText(_) => "drawText",
        }
    }
}

impl TryFrom<&Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        let f = Fields(frame);
        let command = match frame.action.as_str() {
            "clear" => Self::Clear { color: clear_color(frame) },
            "exit" => Self::Exit,
            "hide" => Self::Hide,
            "show" => Self::Show,
            "dpi" => Self::Dpi,
            "update" => Self::Update,
            "redraw" => Self::Redraw,
            "endView" => Self::EndView,
            "resize" => Self::Resize { width: f.number("width")?, height: f.number("height")? },
            "scale" => Self::Scale { factor: f.number("factor")? },
            "save" => Self::Save(SaveRequest {
                filename: f.string("filename")?,
                format: f.opt_string("fileformat")?,
                transparent: f.opt_bool("transparentbkg")?.unwrap_or(false),
            }),
            "setTitle" => Self::SetTitle(f.string("title")?),
            "beginView" => Self::BeginView(ViewRequest {
                frac: f.typed("viewfracs")?,
                user: f.typed("usercoords")?,
                clip: f.opt_bool("clip")?.unwrap_or(true),
            }),
            "clipView" => Self::ClipView(f.opt_bool("clip")?.ok_or(CommandError::MissingField("clip"))?),
            "drawMultiline" => Self::DrawMultiline {
                points: f.points("points")?,
                pen: f.attr("pen", pen_from)?.ok_or(CommandError::MissingField("pen"))?,
            },
            "drawPoints" => Self::DrawPoints {
                points: f.points("points")?,
                symbol: symbol_named(&f.string("symbol")?)
                    .map_err(|source| CommandError::Attribute { field: "symbol", source })?,
                size: f.number("size")?,
                color: optional_color(&frame.data)
                    .map_err(|source| CommandError::Attribute { field: "color", source })?
                    .unwrap_or(Color::BLACK),
            },
            "drawPolygon" => Self::DrawPolygon {
                points: f.points("points")?,
                fill: f.attr("fill", brush_from)?,
                outline: f.attr("outline", pen_from)?,
            },
            "drawRectangle" => Self::DrawRectangle {
                sides: f.inline_sides()?,
                fill: f.attr("fill", brush_from)?,
                outline: f.attr("outline", pen_from)?,
            },
            "drawMulticolorRectangle" => Self::DrawMulticolorRectangle {
                sides: f.inline_sides()?,
                numrows: f.number("numrows")?,
                numcols: f.number("numcols")?,
                colors: f.colors("colors")?,
            },
            "drawText" => Self::DrawText(TextRequest {
                text: f.string("text")?,
                font: f.attr("font", font_from)?,
                pen: f.attr("fill", pen_from)?,
                rotate: f.opt_number("rotate")?.unwrap_or(0.0),
                location: f.opt_typed::<(f64, f64)>("location")?.map(|(x, y)| Point::new(x, y)),
            }),
            other => return Err(CommandError::UnknownAction(other.to_owned())),
        };
        Ok(command)
    }
}

fn clear_color(frame: &Frame) -> Option<Color> {
    match optional_color(&frame.data) {
        Ok(color) => color,
        Err(err) => {
            warn!(%err, "ignoring invalid clear color");
            None
        }
    }
}

// =============================================================================
// FIELD ACCESS
// =============================================================================

/// Typed accessors over a frame's payload.
struct Fields<'a>(&'a Frame);

impl Fields<'_> {
    fn optional(&self, key: &'static str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    fn required(&self, key: &'static str) -> Result<&Value, CommandError> {
        self.optional(key).ok_or(CommandError::MissingField(key))
    }

    fn opt_number(&self, key: &'static str) -> Result<Option<f64>, CommandError> {
        self.optional(key)
            .map(|value| {
                value.as_f64().ok_or_else(|| CommandError::InvalidField {
                    field: key,
                    reason: format!("expected a number, got {value}"),
                })
            })
            .transpose()
    }

    fn number(&self, key: &'static str) -> Result<f64, CommandError> {
        self.opt_number(key)?.ok_or(CommandError::MissingField(key))
    }

    fn opt_string(&self, key: &'static str) -> Result<Option<String>, CommandError> {
        self.optional(key)
            .map(|value| {
                value.as_str().map(str::to_owned).ok_or_else(|| CommandError::InvalidField {
                    field: key,
                    reason: format!("expected a string, got {value}"),
                })
            })
            .transpose()
    }

    fn string(&self, key: &'static str) -> Result<String, CommandError> {
        self.opt_string(key)?.ok_or(CommandError::MissingField(key))
    }

    /// Booleans also accept numbers, nonzero meaning true.
    fn opt_bool(&self, key: &'static str) -> Result<Option<bool>, CommandError> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64().is_some_and(|v| v != 0.0))),
            Some(other) => Err(CommandError::InvalidField { field: key, reason: format!("expected a boolean, got {other}") }),
        }
    }

    fn opt_typed<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, CommandError> {
        self.optional(key)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| CommandError::InvalidField { field: key, reason: e.to_string() })
            })
            .transpose()
    }

    fn typed<T: DeserializeOwned>(&self, key: &'static str) -> Result<T, CommandError> {
        self.opt_typed(key)?.ok_or(CommandError::MissingField(key))
    }

    /// A list of `[x, y]` pairs.
    fn points(&self, key: &'static str) -> Result<Vec<Point>, CommandError> {
        let pairs: Vec<(f64, f64)> = self.typed(key)?;
        Ok(pairs.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }

    /// `left`, `bottom`, `right`, `top` read from the payload itself.
    fn inline_sides(&self) -> Result<Sides, CommandError> {
        let mut sides = Sides::default();
        for (key, slot) in [
            ("left", &mut sides.left),
            ("bottom", &mut sides.bottom),
            ("right", &mut sides.right),
            ("top", &mut sides.top),
        ] {
            if let Some(value) = self.opt_number(key)? {
                *slot = value;
            }
        }
        Ok(sides)
    }

    fn attr<T>(&self, key: &'static str, parse: fn(&Value) -> Result<T, AttrError>) -> Result<Option<T>, CommandError> {
        self.optional(key)
            .map(|value| parse(value).map_err(|source| CommandError::Attribute { field: key, source }))
            .transpose()
    }

    /// A list of color mappings, each requiring a `color` key.
    fn colors(&self, key: &'static str) -> Result<Vec<Color>, CommandError> {
        let Value::Array(items) = self.required(key)? else {
            return Err(CommandError::InvalidField { field: key, reason: "expected a list".to_owned() });
        };
        items
            .iter()
            .map(|item| {
                let map = item.as_object().ok_or(CommandError::Attribute { field: key, source: AttrError::NotAMapping })?;
                optional_color(map)
                    .map_err(|source| CommandError::Attribute { field: key, source })?
                    .ok_or(CommandError::Attribute { field: key, source: AttrError::MissingKey("color") })
            })
            .collect()
    }
}
