use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Extensions imported by directory scans, compared case-insensitively.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["pdf"];

/// Per-document read failure. Never aborts a batch.
#[derive(Debug)]
pub enum DocumentError {
    Io { path: PathBuf, source: std::io::Error },
    Conversion { path: PathBuf, message: String },
    /// The document converted to blank text (e.g. scanned images only).
    Empty(PathBuf),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::Conversion { path, message } => {
                write!(f, "cannot convert `{}` to text: {message}", path.display())
            }
            Self::Empty(path) => write!(f, "no text content in `{}`", path.display()),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Converts one document file into plain text.
pub trait DocumentReader {
    fn read_text(&self, path: &Path) -> Result<String, DocumentError>;
}

impl<R: DocumentReader + ?Sized> DocumentReader for &R {
    fn read_text(&self, path: &Path) -> Result<String, DocumentError> {
        (**self).read_text(path)
    }
}

/// PDF reader backed by `pdf-extract`.
///
/// A converter panic becomes `DocumentError::Conversion` and the batch continues. The process
/// panic hook still runs first, so the panic is logged and the default `thread ... panicked`
/// line still reaches stderr for that document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextReader;

impl DocumentReader for PdfTextReader {
    fn read_text(&self, path: &Path) -> Result<String, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // pdf-extract panics on some malformed inputs.
        let converted = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&bytes)))
            .map_err(|_| DocumentError::Conversion {
                path: path.to_path_buf(),
                message: "pdf converter panicked".to_string(),
            })?
            .map_err(|err| DocumentError::Conversion {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        non_empty(path, converted)
    }
}

/// Reads UTF-8 text files verbatim. Used for text exports and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl DocumentReader for PlainTextReader {
    fn read_text(&self, path: &Path) -> Result<String, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        non_empty(path, text)
    }
}

/// Whether `path` has one of [`RECOGNIZED_EXTENSIONS`].
pub fn is_recognized_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            RECOGNIZED_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn non_empty(path: &Path, text: String) -> Result<String, DocumentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!(
            "event=document_read module=document status=error error_code=empty_text file={}",
            path.display()
        );
        return Err(DocumentError::Empty(path.to_path_buf()));
    }
    Ok(trimmed.to_string())
}
