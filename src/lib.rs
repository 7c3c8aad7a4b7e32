//! PDF Watermark Library
//!
//! A cross-platform library for stamping a repeated text watermark onto every
//! page of a PDF. This library provides functionality to:
//! - Normalize loosely typed watermark settings
//! - Parse hex and fractional RGB color strings
//! - Compute stamp positions for a page at a given density
//! - Embed a preferred font (or fall back to a standard one) and draw the stamps
//!
//! # Example
//!
//! ```no_run
//! use pdf_watermark::options::RawOptions;
//! use pdf_watermark::output::DirectorySink;
//! use pdf_watermark::pdf::FileFontSource;
//! use pdf_watermark::watermark::watermark_file;
//! use std::path::Path;
//!
//! let options = RawOptions {
//!     text: Some("DRAFT".to_string()),
//!     density: Some("4".to_string()),
//!     ..Default::default()
//! }
//! .normalize();
//!
//! let result = watermark_file(
//!     Path::new("report.pdf"),
//!     &options,
//!     &FileFontSource::default(),
//!     &DirectorySink::new("."),
//! )
//! .expect("Failed to watermark PDF");
//!
//! println!("Wrote {}", result.path.display());
//! ```

pub mod color;
pub mod error;
pub mod layout;
pub mod options;
pub mod output;
pub mod pdf;
pub mod watermark;

// Re-export commonly used items
pub use error::{Error, Result};
