//! Colors and drawing styles for chart figures.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    /// Linear interpolation between two colors.
    pub fn lerp(a: Color, b: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f64 * (1.0 - t) + y as f64 * t).round() as u8;
        Color {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
            a: a.a * (1.0 - t) + b.a * t,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svg_fill())
    }
}

/// Histogram bar fill.
pub const SKY_BLUE: Color = Color::rgb(135, 206, 235);
pub const GRID_GRAY: Color = Color::rgb(176, 176, 176);
pub const TITLE_COLOR: Color = Color::rgb(34, 34, 34);

/// Sequential blues for bar charts; `t` in [0, 1] goes light to dark.
pub fn blues(t: f64) -> Color {
    Color::lerp(Color::rgb(198, 219, 239), Color::rgb(8, 81, 156), t)
}

/// Diverging blue-white-red colormap: -1 is blue, 0 is near-white, +1 is red.
pub fn coolwarm(val: f64) -> Color {
    let v = val.clamp(-1.0, 1.0);
    let center = Color::rgb(221, 221, 221);
    if v < 0.0 {
        Color::lerp(center, Color::rgb(59, 76, 192), -v)
    } else {
        Color::lerp(center, Color::rgb(180, 4, 38), v)
    }
}

/// Fill + stroke style for rectangles.
#[derive(Debug, Clone)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
        }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Default::default()
        }
    }

    pub fn outlined(fill: Color, stroke: Color, width: f64) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            stroke_width: width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub bold: bool,
    pub anchor: Anchor,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 9.0,
            color: Color::BLACK,
            bold: false,
            anchor: Anchor::Start,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}
