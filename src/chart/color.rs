//! CSS-style color values used by chart preferences.
//!
//! Preferences arrive as loosely typed JSON, so colors are parsed leniently:
//! anything unrecognised resolves to opaque black instead of failing the
//! whole preference update.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Straight-alpha sRGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            a.clamp(0.0, 1.0),
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A color as written in preferences, paired with its parsed value.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CssColor {
    source: String,
    rgba: Rgba,
}

impl CssColor {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let rgba = parse_css_color(&source).unwrap_or_else(|| {
            warn!("[chart] malformed color {source:?}; using opaque black");
            Rgba::BLACK
        });
        Self { source, rgba }
    }

    pub fn rgba(&self) -> Rgba {
        self.rgba
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for CssColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CssColor({:?})", self.source)
    }
}

impl From<String> for CssColor {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CssColor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CssColor> for String {
    fn from(value: CssColor) -> Self {
        value.source
    }
}

/// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` and a
/// handful of named colors.
pub fn parse_css_color(input: &str) -> Option<Rgba> {
    let value = input.trim().to_ascii_lowercase();

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    if let Some(body) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
    {
        return parse_functional(body.strip_suffix(')')?);
    }

    match value.as_str() {
        "black" => Some(Rgba::BLACK),
        "white" => Some(Rgba::WHITE),
        "transparent" => Some(Rgba::TRANSPARENT),
        "red" => Some(Rgba::from_rgb8(255, 0, 0, 1.0)),
        "green" => Some(Rgba::from_rgb8(0, 128, 0, 1.0)),
        "blue" => Some(Rgba::from_rgb8(0, 0, 255, 1.0)),
        "orange" => Some(Rgba::from_rgb8(255, 165, 0, 1.0)),
        "gray" | "grey" => Some(Rgba::from_rgb8(128, 128, 128, 1.0)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |index: usize| u8::from_str_radix(&hex[index..=index], 16).ok();
    let byte = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();

    match hex.len() {
        3 | 4 => {
            let expand = |n: u8| n * 17;
            let alpha = if hex.len() == 4 {
                f32::from(expand(nibble(3)?)) / 255.0
            } else {
                1.0
            };
            Some(Rgba::from_rgb8(
                expand(nibble(0)?),
                expand(nibble(1)?),
                expand(nibble(2)?),
                alpha,
            ))
        }
        6 | 8 => {
            let alpha = if hex.len() == 8 {
                f32::from(byte(6)?) / 255.0
            } else {
                1.0
            };
            Some(Rgba::from_rgb8(byte(0)?, byte(2)?, byte(4)?, alpha))
        }
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |part: &str| -> Option<u8> {
        let value: f32 = part.parse().ok()?;
        value.is_finite().then(|| value.clamp(0.0, 255.0).round() as u8)
    };

    let alpha = match parts.get(3) {
        Some(part) => {
            let value: f32 = part.parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            value
        }
        None => 1.0,
    };

    Some(Rgba::from_rgb8(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}
