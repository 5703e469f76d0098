//! Color parsing for style translation.
//!
//! The primary engine hands out colors either as component arrays or as CSS
//! strings (`rgb(...)` / `rgba(...)` / `#rrggbb`). The secondary engine's
//! solid-color API has no alpha channel, so the alpha component is extracted
//! separately and conveyed as an opacity value.

use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// An RGBA color with byte channels and a fractional alpha
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Builds a color from a `[r, g, b]` or `[r, g, b, a]` component slice
    pub fn from_components(components: &[f64]) -> Result<Self> {
        match components {
            [r, g, b] => Ok(Self::rgb(*r as u8, *g as u8, *b as u8)),
            [r, g, b, a] => Ok(Self::new(*r as u8, *g as u8, *b as u8, *a)),
            _ => Err(BridgeError::Parse(format!(
                "expected 3 or 4 color components, got {}",
                components.len()
            ))),
        }
    }

    /// Parses a CSS color string: `rgb(...)`, `rgba(...)` or `#rrggbb`
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex, input);
        }
        let (body, has_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(BridgeError::Parse(format!("unrecognized color: {input}")));
        };
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| BridgeError::Parse(format!("unterminated color: {input}")))?;

        let parts: Vec<f64> = body
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .map_err(|_| BridgeError::Parse(format!("bad color component in {input}")))
            })
            .collect::<Result<_>>()?;

        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(BridgeError::Parse(format!(
                "expected {expected} components in {input}"
            )));
        }
        Self::from_components(&parts)
    }

    fn parse_hex(hex: &str, original: &str) -> Result<Self> {
        if hex.len() != 6 {
            return Err(BridgeError::Parse(format!("bad hex color: {original}")));
        }
        let byte = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| BridgeError::Parse(format!("bad hex color: {original}")))
        };
        Ok(Self::rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?))
    }

    /// The alpha channel, as an opacity value in [0, 1]
    pub fn opacity(&self) -> f64 {
        self.a
    }

    /// Reassembles the color as an alpha-free `rgb(r,g,b)` string
    pub fn to_rgb_string(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Opacity of a CSS color string; colors without alpha report 1.0
pub fn color_opacity(color: &str) -> Result<f64> {
    Ok(Rgba::parse(color)?.opacity())
}

/// Solid (alpha-dropped) rendition of a CSS color string
pub fn solid_color(color: &str) -> Result<String> {
    Ok(Rgba::parse(color)?.to_rgb_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgba() {
        let color = Rgba::parse("rgba(10,20,30,0.5)").unwrap();
        assert_eq!((color.r, color.g, color.b), (10, 20, 30));
        assert_eq!(color.opacity(), 0.5);
    }

    #[test]
    fn test_alpha_dropped_on_reassembly() {
        assert_eq!(color_opacity("rgba(10,20,30,0.5)").unwrap(), 0.5);
        assert_eq!(solid_color("rgba(10,20,30,0.5)").unwrap(), "rgb(10,20,30)");
    }

    #[test]
    fn test_parse_rgb_and_hex() {
        let rgb = Rgba::parse("rgb(255, 128, 0)").unwrap();
        assert_eq!((rgb.r, rgb.g, rgb.b), (255, 128, 0));
        assert_eq!(rgb.opacity(), 1.0);

        let hex = Rgba::parse("#ff8000").unwrap();
        assert_eq!(hex, rgb);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgba::parse("blue-ish").is_err());
        assert!(Rgba::parse("rgba(1,2)").is_err());
        assert!(Rgba::parse("#ff80").is_err());
    }

    #[test]
    fn test_from_components() {
        let color = Rgba::from_components(&[10.0, 20.0, 30.0, 0.25]).unwrap();
        assert_eq!(color, Rgba::new(10, 20, 30, 0.25));
        assert!(Rgba::from_components(&[1.0]).is_err());
    }
}
