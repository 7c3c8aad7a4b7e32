//! Watermark option normalization
//!
//! Raw option values arrive as loosely typed strings (from a form or the command
//! line). [`RawOptions::normalize`] is the only place they are coerced, and the
//! resulting [`WatermarkOptions`] is used as-is for rendering.

use crate::layout::Density;

/// Text used when no watermark text is given
pub const DEFAULT_TEXT: &str = "水印文本";
/// Color used when no color is given
pub const DEFAULT_COLOR: &str = "#808080";
pub const DEFAULT_OPACITY: f32 = 0.5;
pub const DEFAULT_FONT_SIZE: u32 = 50;
pub const DEFAULT_ROTATION: i32 = -45;

/// Unvalidated watermark settings, exactly as entered
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub text: Option<String>,
    pub color: Option<String>,
    pub opacity: Option<String>,
    pub font_size: Option<String>,
    pub rotation: Option<String>,
    pub density: Option<String>,
}

/// Normalized watermark settings
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    /// Watermark text, never empty
    pub text: String,
    /// Color string, parsed once per document by [`crate::color::parse_color`]
    pub color: String,
    /// Fill opacity in `[0, 1]`
    pub opacity: f32,
    /// Base font size in points, always positive
    pub font_size: u32,
    /// Counter-clockwise rotation in degrees
    pub rotation: i32,
    pub density: Density,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            color: DEFAULT_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
            font_size: DEFAULT_FONT_SIZE,
            rotation: DEFAULT_ROTATION,
            density: Density::default(),
        }
    }
}

impl RawOptions {
    /// Coerce every field, substituting defaults for missing or invalid values
    ///
    /// - integers accept a leading integer prefix (`"40px"` → 40, `"3.7"` → 3)
    /// - opacity is clamped into `[0, 1]`
    /// - font size must be positive
    /// - density is clamped into `1..=5`
    pub fn normalize(&self) -> WatermarkOptions {
        let text = non_empty(&self.text).unwrap_or(DEFAULT_TEXT).to_string();
        let color = non_empty(&self.color).unwrap_or(DEFAULT_COLOR).to_string();

        let opacity = non_empty(&self.opacity)
            .and_then(parse_real)
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_OPACITY);

        let font_size = non_empty(&self.font_size)
            .and_then(parse_leading_int)
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_FONT_SIZE);

        let rotation = non_empty(&self.rotation)
            .and_then(parse_leading_int)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(DEFAULT_ROTATION);

        let density = non_empty(&self.density)
            .and_then(parse_leading_int)
            .map(Density::saturating)
            .unwrap_or_default();

        let options = WatermarkOptions { text, color, opacity, font_size, rotation, density };
        tracing::debug!(?options, "normalized watermark options");
        options
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_real(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Parse an optionally signed run of leading digits, ignoring anything after it
fn parse_leading_int(value: &str) -> Option<i64> {
    let sign_len = usize::from(value.starts_with(['+', '-']));
    let digits = value[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}
