use crate::error::ParseColorError;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::str::FromStr;

/// Channel sum below which swatch labels are drawn in white
pub const LEGIBILITY_THRESHOLD: u16 = 380;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    White,
    Black,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Color {
        Color { red, green, blue }
    }

    /// Uppercase `#RRGGBB`
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    pub fn channel_sum(&self) -> u16 {
        self.red as u16 + self.green as u16 + self.blue as u16
    }

    /// Label color that stays readable on top of this color
    pub fn text_color(&self) -> TextColor {
        if self.channel_sum() < LEGIBILITY_THRESHOLD {
            TextColor::White
        } else {
            TextColor::Black
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(code.to_string());

        let digits = code.strip_prefix('#').ok_or_else(err)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| err())
        };

        Ok(Color {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("Color", 4)?;
        record.serialize_field("r", &self.red)?;
        record.serialize_field("g", &self.green)?;
        record.serialize_field("b", &self.blue)?;
        record.serialize_field("hex", &self.hex())?;
        record.end()
    }
}

/// Ordered colors; index 0 is the main color, the rest are variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub(crate) fn from_colors(colors: Vec<Color>) -> Palette {
        Palette { colors }
    }

    pub fn main(&self) -> Color {
        self.colors[0]
    }

    pub fn variants(&self) -> &[Color] {
        &self.colors[1..]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Color> {
        self.colors.iter()
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.colors
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Color;
    type IntoIter = std::slice::Iter<'a, Color>;

    fn into_iter(self) -> Self::IntoIter {
        self.colors.iter()
    }
}

impl Serialize for Palette {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.colors.serialize(serializer)
    }
}
