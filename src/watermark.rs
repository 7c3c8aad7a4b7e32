//! Watermarking a whole document
//!
//! [`apply_watermark`] is the in-memory pipeline: load, pick a font, stamp
//! every page, serialize. [`watermark_file`] wraps it with input validation and
//! delivery of `watermarked_<name>` to an [`OutputSink`].
//!
//! Recoverable problems never abort the operation. They are handled with a
//! fixed fallback and recorded as [`Diagnostic`]s in the returned report.

use std::path::{Path, PathBuf};

use lopdf::{Document, ObjectId};
use rand::Rng;

use crate::color::{parse_color, try_parse_color, RgbColor};
use crate::error::{Error, Result};
use crate::layout::{generate_positions_with_rng, PageGeometry};
use crate::options::WatermarkOptions;
use crate::output::OutputSink;
use crate::pdf::font::{
    embed_shaped_font, embed_standard_bold, encode_win_ansi, EncodedText, FontSource, FALLBACK_FONT,
};
use crate::pdf::stamp::{
    add_opacity_state, generate_stamp_content, page_geometry, stamp_page, DiagnosticStamp, StampStyle,
};

/// Replacement text when the fallback font cannot render the requested text
pub const PLACEHOLDER_TEXT: &str = "CONFIDENTIAL";
/// Text of the opaque stamp marking pages rendered with the fallback font
pub const DIAGNOSTIC_TEXT: &str = "TEST WATERMARK";
/// Prefix of the output file name
pub const OUTPUT_PREFIX: &str = "watermarked_";
pub const PDF_MIME_TYPE: &str = "application/pdf";

const DIAGNOSTIC_SIZE: f64 = 20.0;
const DIAGNOSTIC_COLOR: &str = "#FF0000";

/// A recoverable condition that was handled with a fallback
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The color string was invalid and black was used
    ColorFallback { input: String },
    /// The preferred font could not be loaded or embedded
    FontFallback { cause: String },
    /// The text could not be drawn with the fallback font and was replaced
    TextSubstituted { original: String, replacement: String },
}

/// What was drawn on one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub geometry: PageGeometry,
    /// Number of watermark text runs drawn
    pub stamps: usize,
    /// Whether the fallback-font diagnostic stamp was drawn
    pub diagnostic_stamp: bool,
}

/// Summary of a watermarking run
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkReport {
    /// The text actually drawn, after any substitution
    pub rendered_text: String,
    pub color: RgbColor,
    pub using_fallback_font: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub pages: Vec<PageReport>,
}

/// Serialized watermarked document plus its report
#[derive(Debug, Clone)]
pub struct WatermarkOutput {
    pub bytes: Vec<u8>,
    pub report: WatermarkReport,
}

/// Result of [`watermark_file`]
#[derive(Debug, Clone)]
pub struct WatermarkedFile {
    /// Where the sink put the output
    pub path: PathBuf,
    pub report: WatermarkReport,
}

/// Font chosen for the document, with the text already encoded for it
struct ResolvedFont {
    encoded: EncodedText,
    rendered_text: String,
    /// Set when the standard fallback font is in use
    fallback_font: Option<ObjectId>,
}

/// Watermark an in-memory PDF
///
/// # Example
///
/// ```no_run
/// use pdf_watermark::options::RawOptions;
/// use pdf_watermark::pdf::FileFontSource;
/// use pdf_watermark::watermark::apply_watermark;
///
/// let options = RawOptions {
///     text: Some("DRAFT".to_string()),
///     color: Some("#FF0000".to_string()),
///     ..Default::default()
/// }
/// .normalize();
///
/// let input = std::fs::read("input.pdf").unwrap();
/// let output = apply_watermark(&input, &options, &FileFontSource::default())
///     .expect("Failed to watermark");
/// std::fs::write("output.pdf", output.bytes).unwrap();
/// ```
pub fn apply_watermark(
    bytes: &[u8],
    options: &WatermarkOptions,
    fonts: &dyn FontSource,
) -> Result<WatermarkOutput> {
    apply_watermark_with_rng(bytes, options, fonts, &mut rand::thread_rng())
}

/// Watermark an in-memory PDF, drawing random placements from `rng`
pub fn apply_watermark_with_rng<R: Rng + ?Sized>(
    bytes: &[u8],
    options: &WatermarkOptions,
    fonts: &dyn FontSource,
    rng: &mut R,
) -> Result<WatermarkOutput> {
    let mut doc = Document::load_mem(bytes).map_err(Error::DocumentLoad)?;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::EmptyPdf);
    }

    let mut diagnostics = Vec::new();
    let font = resolve_font(&mut doc, &options.text, fonts, &mut diagnostics);

    let color = try_parse_color(&options.color).unwrap_or_else(|| {
        tracing::warn!(input = %options.color, "invalid color, using black");
        diagnostics.push(Diagnostic::ColorFallback { input: options.color.clone() });
        RgbColor::BLACK
    });

    let style = StampStyle { color, rotation: options.rotation };
    let gstate_id = add_opacity_state(&mut doc, options.opacity);
    let font_size = f64::from(options.font_size);

    let mut pages = Vec::with_capacity(page_ids.len());
    for (index, page_id) in page_ids.into_iter().enumerate() {
        let geometry = page_geometry(&doc, page_id)?;
        let positions = generate_positions_with_rng(geometry, font_size, options.density, rng);

        let diagnostic = font.fallback_font.map(|_| DiagnosticStamp {
            text: DIAGNOSTIC_TEXT.as_bytes(),
            x: geometry.width - 200.0,
            y: geometry.height - 50.0,
            size: DIAGNOSTIC_SIZE,
            color: parse_color(DIAGNOSTIC_COLOR),
        });

        let content = generate_stamp_content(&font.encoded.bytes, &positions, &style, diagnostic.as_ref());
        stamp_page(&mut doc, page_id, content, font.encoded.font_id, gstate_id, font.fallback_font)?;

        tracing::debug!(
            page = index + 1,
            width = geometry.width,
            height = geometry.height,
            stamps = positions.len(),
            "stamped page"
        );

        pages.push(PageReport {
            geometry,
            stamps: positions.len(),
            diagnostic_stamp: diagnostic.is_some(),
        });
    }

    doc.compress();
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::DocumentSave(e.to_string()))?;

    tracing::info!(
        pages = pages.len(),
        fallback_font = font.fallback_font.is_some(),
        diagnostics = diagnostics.len(),
        "watermarked document"
    );

    Ok(WatermarkOutput {
        bytes: output,
        report: WatermarkReport {
            rendered_text: font.rendered_text,
            color,
            using_fallback_font: font.fallback_font.is_some(),
            diagnostics,
            pages,
        },
    })
}

/// Watermark a PDF file and deliver `watermarked_<name>` to `sink`
///
/// Nothing is delivered unless every step succeeds.
pub fn watermark_file(
    input: &Path,
    options: &WatermarkOptions,
    fonts: &dyn FontSource,
    sink: &dyn OutputSink,
) -> Result<WatermarkedFile> {
    validate_input(input)?;

    let bytes = std::fs::read(input).map_err(|source| Error::FileRead {
        path: input.to_path_buf(),
        source,
    })?;

    let output = apply_watermark(&bytes, options, fonts)?;
    let path = sink.deliver(&output.bytes, PDF_MIME_TYPE, &output_file_name(input)?)?;

    Ok(WatermarkedFile { path, report: output.report })
}

/// Check that a selected input looks like a PDF before any processing
pub fn validate_input(input: &Path) -> Result<()> {
    let is_pdf = input
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(Error::InvalidFile(input.to_path_buf()));
    }
    if !input.is_file() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }
    Ok(())
}

/// Name of the output file for `input`: `watermarked_<originalFilename>`
pub fn output_file_name(input: &Path) -> Result<String> {
    let name = input
        .file_name()
        .ok_or_else(|| Error::InvalidFile(input.to_path_buf()))?;
    Ok(format!("{}{}", OUTPUT_PREFIX, name.to_string_lossy()))
}

/// Embed the preferred font, or fall back to the standard bold font
fn resolve_font(
    doc: &mut Document,
    text: &str,
    fonts: &dyn FontSource,
    diagnostics: &mut Vec<Diagnostic>,
) -> ResolvedFont {
    let embedded = fonts
        .load_font()
        .and_then(|data| embed_shaped_font(doc, &data, text));

    let cause = match embedded {
        Ok(encoded) => {
            return ResolvedFont {
                encoded,
                rendered_text: text.to_string(),
                fallback_font: None,
            }
        }
        Err(e) => e.to_string(),
    };

    tracing::warn!(%cause, "preferred font unavailable, falling back to {}", FALLBACK_FONT);
    diagnostics.push(Diagnostic::FontFallback { cause });

    let font_id = embed_standard_bold(doc);
    let (rendered_text, bytes) = match encode_win_ansi(text) {
        Some(bytes) => (text.to_string(), bytes),
        None => {
            tracing::warn!(text, "text not representable in {}, substituting", FALLBACK_FONT);
            diagnostics.push(Diagnostic::TextSubstituted {
                original: text.to_string(),
                replacement: PLACEHOLDER_TEXT.to_string(),
            });
            (PLACEHOLDER_TEXT.to_string(), PLACEHOLDER_TEXT.as_bytes().to_vec())
        }
    };

    ResolvedFont {
        encoded: EncodedText { font_id, bytes },
        rendered_text,
        fallback_font: Some(font_id),
    }
}
