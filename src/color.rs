//! Color string parsing
//!
//! Accepts `#rgb`, `#rrggbb`, or a comma-separated `r,g,b` triple of unit-interval
//! reals. Anything else degrades to black instead of failing.

/// An RGB color with each channel in `[0, 1]`
///
/// Only produced by [`parse_color`] / [`try_parse_color`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    r: f32,
    g: f32,
    b: f32,
}

impl RgbColor {
    /// The fallback color for unparseable input
    pub const BLACK: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 0.0 };

    fn clamped(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn b(&self) -> f32 {
        self.b
    }
}

/// Parse a color string, falling back to black on invalid input
///
/// # Example
///
/// ```
/// use pdf_watermark::color::{parse_color, RgbColor};
///
/// assert_eq!(parse_color("#F00"), parse_color("#FF0000"));
/// assert_eq!(parse_color("not-a-color"), RgbColor::BLACK);
/// ```
pub fn parse_color(input: &str) -> RgbColor {
    try_parse_color(input).unwrap_or(RgbColor::BLACK)
}

/// Parse a color string, returning `None` where [`parse_color`] would fall back to black
pub fn try_parse_color(input: &str) -> Option<RgbColor> {
    let input = input.trim();

    if let Some(hex) = input.strip_prefix('#') {
        return parse_hex(hex);
    }

    let values = input
        .split(',')
        .map(|token| token.trim().parse::<f32>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f32>>>()?;

    match values.as_slice() {
        [r, g, b, ..] => Some(RgbColor::clamped(*r, *g, *b)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<RgbColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    // Every char is ASCII from here, so byte slicing is safe
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|v| v as f32 / 255.0);

    match hex.len() {
        3 => {
            let doubled: Vec<String> = hex.chars().map(|c| format!("{c}{c}")).collect();
            Some(RgbColor::clamped(
                channel(&doubled[0])?,
                channel(&doubled[1])?,
                channel(&doubled[2])?,
            ))
        }
        6 => Some(RgbColor::clamped(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
