use crate::core::color::Rgba;
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// A color as the primary engine hands it out: either parsed components or
/// a raw CSS string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorSpec {
    Rgba(Rgba),
    Css(String),
}

impl ColorSpec {
    pub fn resolve(&self) -> Result<Rgba> {
        match self {
            ColorSpec::Rgba(rgba) => Ok(*rgba),
            ColorSpec::Css(css) => Rgba::parse(css),
        }
    }
}

impl From<Rgba> for ColorSpec {
    fn from(rgba: Rgba) -> Self {
        ColorSpec::Rgba(rgba)
    }
}

impl From<&str> for ColorSpec {
    fn from(css: &str) -> Self {
        ColorSpec::Css(css.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: ColorSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: ColorSpec,
    pub width: f64,
}

/// An icon image with anchor, rotation and opacity. The anchor is a
/// fraction of the icon size, (0.5, 0.5) being the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub anchor_x: f64,
    pub anchor_y: f64,
    /// Rotation in radians, clockwise
    pub rotation: f64,
    pub opacity: f64,
    pub scale: f64,
}

impl Icon {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            src: src.into(),
            width,
            height,
            anchor_x: 0.5,
            anchor_y: 0.5,
            rotation: 0.0,
            opacity: 1.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A text label; `\n` separates explicit lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub text: String,
    pub font: String,
    pub fill: Option<ColorSpec>,
    pub stroke: Option<Stroke>,
    pub align: TextAlign,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl TextStyle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: "10px sans-serif".to_string(),
            fill: None,
            stroke: None,
            align: TextAlign::Center,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }
}

/// The style of a vector feature or layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    pub icon: Option<Icon>,
    pub text: Option<TextStyle>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill(mut self, color: impl Into<ColorSpec>) -> Self {
        self.fill = Some(Fill {
            color: color.into(),
        });
        self
    }

    pub fn with_stroke(mut self, color: impl Into<ColorSpec>, width: f64) -> Self {
        self.stroke = Some(Stroke {
            color: color.into(),
            width,
        });
        self
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_text(mut self, text: TextStyle) -> Self {
        self.text = Some(text);
        self
    }

    /// Fill opacity derived from the fill color's alpha channel
    pub fn fill_opacity(&self) -> Result<f64> {
        self.fill
            .as_ref()
            .ok_or_else(|| BridgeError::Layer("style has no fill".to_string()))?
            .color
            .resolve()
            .map(|c| c.opacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_spec_resolution() {
        let css: ColorSpec = "rgba(10,20,30,0.5)".into();
        assert_eq!(css.resolve().unwrap(), Rgba::new(10, 20, 30, 0.5));

        let direct: ColorSpec = Rgba::rgb(1, 2, 3).into();
        assert_eq!(direct.resolve().unwrap(), Rgba::rgb(1, 2, 3));
    }

    #[test]
    fn test_fill_opacity() {
        let style = Style::new().with_fill("rgba(0,0,0,0.25)");
        assert_eq!(style.fill_opacity().unwrap(), 0.25);
        assert!(Style::new().fill_opacity().is_err());
    }

    #[test]
    fn test_text_lines() {
        let text = TextStyle::new("first\nsecond\nthird");
        assert_eq!(text.lines(), vec!["first", "second", "third"]);
    }
}
