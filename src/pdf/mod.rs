//! PDF manipulation module

pub mod font;
pub mod metadata;
pub mod stamp;

// Re-export commonly used items
pub use font::{FileFontSource, FontSource};
pub use metadata::{extract_metadata, extract_metadata_from_bytes, PdfMetadata};
