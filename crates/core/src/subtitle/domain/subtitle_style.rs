use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_SHADOW_COLOR, DEFAULT_SHADOW_OFFSET,
    DEFAULT_TEXT_COLOR, DEFAULT_VERTICAL_POSITION,
};

/// An RGBA colour, written in settings as a name or `#RRGGBB[AA]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextColor(pub [u8; 4]);

const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("white", [255, 255, 255, 255]),
    ("black", [0, 0, 0, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
];

impl TextColor {
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| format!("invalid hex colour '{value}'"));
        }
        let lower = value.to_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgba)| TextColor(*rgba))
            .ok_or_else(|| format!("unknown colour '{value}'"))
    }

    pub fn rgba(&self) -> [u8; 4] {
        self.0
    }
}

fn parse_hex(hex: &str) -> Option<TextColor> {
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let mut rgba = [255u8; 4];
    for (i, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(TextColor(rgba))
}

impl TryFrom<String> for TextColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TextColor::parse(&value)
    }
}

impl From<TextColor> for String {
    fn from(color: TextColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED_COLORS.iter().find(|(_, rgba)| *rgba == self.0) {
            return write!(f, "{name}");
        }
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// How subtitle text looks and where it sits on the frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    /// Font family name or path to a TrueType/OpenType file.
    pub font: String,
    pub font_size: f32,
    pub color: TextColor,
    pub shadow_color: TextColor,
    /// Shadow displacement in pixels, right and down.
    pub shadow_offset: u32,
    /// Top edge of the overlay as a fraction of frame height.
    pub vertical_position: f64,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: TextColor::parse(DEFAULT_TEXT_COLOR).unwrap_or(TextColor([255; 4])),
            shadow_color: TextColor::parse(DEFAULT_SHADOW_COLOR)
                .unwrap_or(TextColor([0, 0, 0, 255])),
            shadow_offset: DEFAULT_SHADOW_OFFSET,
            vertical_position: DEFAULT_VERTICAL_POSITION,
        }
    }
}
