// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ARGB color values for the app-bar appearance configuration.
//
// Accepts the same textual forms the mobile platform parsers accept:
// `#rrggbb`, `#aarrggbb` (case-insensitive hex) and a fixed set of named
// colors.  Colors are rendered back as lowercase hex, dropping the alpha
// byte when fully opaque.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

use crate::error::{EngageError, Result};

/// 32-bit ARGB color carried through the appearance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

/// Named colors recognised alongside hex notation.  Mirrors the set the
/// platform-native parsers accept.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0xFF00_0000),
    ("blue", 0xFF00_00FF),
    ("cyan", 0xFF00_FFFF),
    ("darkgray", 0xFF44_4444),
    ("darkgrey", 0xFF44_4444),
    ("gray", 0xFF88_8888),
    ("grey", 0xFF88_8888),
    ("green", 0xFF00_FF00),
    ("lightgray", 0xFFCC_CCCC),
    ("lightgrey", 0xFFCC_CCCC),
    ("magenta", 0xFFFF_00FF),
    ("red", 0xFFFF_0000),
    ("white", 0xFFFF_FFFF),
    ("yellow", 0xFFFF_FF00),
    ("aqua", 0xFF00_FFFF),
    ("fuchsia", 0xFFFF_00FF),
    ("lime", 0xFF00_FF00),
    ("maroon", 0xFF80_0000),
    ("navy", 0xFF00_0080),
    ("olive", 0xFF80_8000),
    ("purple", 0xFF80_0080),
    ("silver", 0xFFC0_C0C0),
    ("teal", 0xFF00_8080),
];

impl Color {
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const BLUE: Color = Color(0xFF00_00FF);

    /// Parse a color from its textual form.
    ///
    /// `#rrggbb` is widened to full alpha; `#aarrggbb` is taken verbatim.
    /// Anything else is matched against the named-color table.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if let Some(hex_part) = trimmed.strip_prefix('#') {
            if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(EngageError::InvalidColor(input.to_owned()));
            }
            return match hex_part.len() {
                6 => {
                    let rgb = u32::from_str_radix(hex_part, 16)
                        .map_err(|_| EngageError::InvalidColor(input.to_owned()))?;
                    Ok(Color(0xFF00_0000 | rgb))
                }
                8 => {
                    let argb = u32::from_str_radix(hex_part, 16)
                        .map_err(|_| EngageError::InvalidColor(input.to_owned()))?;
                    Ok(Color(argb))
                }
                _ => Err(EngageError::InvalidColor(input.to_owned())),
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, argb)| Color(*argb))
            .ok_or_else(|| EngageError::InvalidColor(input.to_owned()))
    }

    /// Alpha channel (0 = transparent, 255 = opaque).
    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// RGB portion without the alpha byte.
    pub fn rgb(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alpha() == 0xFF {
            write!(f, "#{:06x}", self.rgb())
        } else {
            write!(f, "#{:08x}", self.0)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::parse(&raw).map_err(de::Error::custom)
    }
}
