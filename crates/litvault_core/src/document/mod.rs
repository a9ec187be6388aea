//! Document-to-text conversion.
//!
//! # Responsibility
//! - Decide which files count as importable documents.
//! - Convert one document into plain text behind the `DocumentReader` seam.
//!
//! # Invariants
//! - Readers return trimmed text; blank text is reported as `DocumentError::Empty`.
//! - Readers never panic; converter panics are caught and reported as errors.

mod reader;

pub use reader::{
    is_recognized_document, DocumentError, DocumentReader, PdfTextReader, PlainTextReader,
    RECOGNIZED_EXTENSIONS,
};
