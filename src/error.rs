//! Error types for the PDF watermark library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF watermark library
///
/// Only fatal conditions live here. Recoverable fallbacks (font, glyphs, color)
/// are reported as [`crate::watermark::Diagnostic`] values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Selected input is not a PDF
    #[error("Not a PDF file: {}", .0.display())]
    InvalidFile(PathBuf),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input could not be read
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bytes could not be parsed as a PDF document
    #[error("Failed to load PDF document: {0}")]
    DocumentLoad(#[source] lopdf::Error),

    /// Document has no pages to watermark
    #[error("PDF has no pages")]
    EmptyPdf,

    /// Preferred font could not be fetched or embedded
    #[error("Font error: {0}")]
    FontEmbed(String),

    /// Serialization of the watermarked document failed
    #[error("Failed to save PDF document: {0}")]
    DocumentSave(String),

    /// Page dictionary is missing or has unusable geometry
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// PDF structure error while editing pages
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
