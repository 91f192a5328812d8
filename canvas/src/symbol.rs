//! Point-marker glyphs.
//!
//! Each symbol is a path in a 100×100 box centred on the origin, Y down.
//! `drawPoints` translates a copy to every point and scales it by
//! `size / 100`, so a symbol of size `s` spans roughly `s` user units.

#[cfg(test)]
#[path = "symbol_test.rs"]
mod symbol_test;

use crate::attrs::AttrError;
use crate::view::Point;

/// One step of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
    /// Close the current subpath back to its last `MoveTo`.
    Close,
    /// A complete circular subpath.
    Circle { center: Point, radius: f64 },
}

impl PathOp {
    /// Apply `p -> offset + p * scale` to every coordinate.
    #[must_use]
    pub fn placed(self, offset: Point, scale: f64) -> Self {
        let place = |p: Point| Point::new(offset.x + p.x * scale, offset.y + p.y * scale);
        match self {
            Self::MoveTo(p) => Self::MoveTo(place(p)),
            Self::LineTo(p) => Self::LineTo(place(p)),
            Self::Close => Self::Close,
            Self::Circle { center, radius } => Self::Circle { center: place(center), radius: radius * scale },
        }
    }
}

/// A named marker glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Symbol {
    pub name: &'static str,
    /// Filled symbols are painted with a brush only; the rest are stroked.
    pub filled: bool,
    pub ops: &'static [PathOp],
}

const fn m(x: f64, y: f64) -> PathOp {
    PathOp::MoveTo(Point::new(x, y))
}

const fn l(x: f64, y: f64) -> PathOp {
    PathOp::LineTo(Point::new(x, y))
}

const fn circle(radius: f64) -> PathOp {
    PathOp::Circle { center: Point::new(0.0, 0.0), radius }
}

const DOT: &[PathOp] = &[circle(10.0)];
const RING: &[PathOp] = &[circle(40.0)];
const DISC: &[PathOp] = &[circle(50.0)];
const PLUS: &[PathOp] = &[m(-50.0, 0.0), l(50.0, 0.0), m(0.0, -50.0), l(0.0, 50.0)];
const CROSS: &[PathOp] = &[m(-40.0, -40.0), l(40.0, 40.0), m(-40.0, 40.0), l(40.0, -40.0)];
const STAR: &[PathOp] = &[
    m(-50.0, 0.0),
    l(50.0, 0.0),
    m(0.0, -50.0),
    l(0.0, 50.0),
    m(-35.0, -35.0),
    l(35.0, 35.0),
    m(-35.0, 35.0),
    l(35.0, -35.0),
];
const TRIANGLE: &[PathOp] = &[m(-40.0, 30.0), l(0.0, -39.0), l(40.0, 30.0), PathOp::Close];
const BIG_TRIANGLE: &[PathOp] = &[m(-50.0, 37.0), l(0.0, -50.0), l(50.0, 37.0), PathOp::Close];
const SQUARE: &[PathOp] = &[m(-40.0, -40.0), l(40.0, -40.0), l(40.0, 40.0), l(-40.0, 40.0), PathOp::Close];
const BIG_SQUARE: &[PathOp] = &[m(-50.0, -50.0), l(50.0, -50.0), l(50.0, 50.0), l(-50.0, 50.0), PathOp::Close];
const DIAMOND: &[PathOp] = &[m(0.0, -50.0), l(50.0, 0.0), l(0.0, 50.0), l(-50.0, 0.0), PathOp::Close];

const SYMBOLS: &[Symbol] = &[
    Symbol { name: ".", filled: true, ops: DOT },
    Symbol { name: "o", filled: false, ops: RING },
    Symbol { name: "+", filled: false, ops: PLUS },
    Symbol { name: "x", filled: false, ops: CROSS },
    Symbol { name: "*", filled: false, ops: STAR },
    Symbol { name: "^", filled: false, ops: TRIANGLE },
    Symbol { name: "#", filled: false, ops: SQUARE },
    Symbol { name: "filledcircle", filled: true, ops: DISC },
    Symbol { name: "filledsquare", filled: true, ops: BIG_SQUARE },
    Symbol { name: "filledtriangle", filled: true, ops: BIG_TRIANGLE },
    Symbol { name: "diamond", filled: false, ops: DIAMOND },
    Symbol { name: "filleddiamond", filled: true, ops: DIAMOND },
];

/// Look up a symbol by name.
///
/// # Errors
///
/// Returns [`AttrError::UnknownSymbol`] for names not in the table.
pub fn symbol_named(name: &str) -> Result<Symbol, AttrError> {
    SYMBOLS
        .iter()
        .find(|symbol| symbol.name == name)
        .copied()
        .ok_or_else(|| AttrError::UnknownSymbol(name.to_owned()))
}
