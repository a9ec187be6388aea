//! Literature record model.
//!
//! # Invariants
//! - `content_hash` identifies document content across every collection.
//! - Text fields the extractor could not determine hold [`UNKNOWN_FIELD`].

use crate::fingerprint::ContentHash;
use crate::model::collection::CollectionId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Database-assigned record identity.
pub type RecordId = i64;

/// Sentinel stored for bibliographic fields the extractor could not resolve.
pub const UNKNOWN_FIELD: &str = "unknown";

/// Bibliographic fields produced by metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperInfo {
    /// `None` when the publication year is unknown.
    pub year: Option<i32>,
    pub journal: String,
    pub title: String,
    /// Free-form author list, e.g. `"A. Smith, B. Jones"`.
    pub authors: String,
    /// Model-written synthesis of the core contribution, not the abstract.
    pub summary: String,
}

impl PaperInfo {
    /// Record with every field unknown.
    pub fn unknown() -> Self {
        Self {
            year: None,
            journal: UNKNOWN_FIELD.to_string(),
            title: UNKNOWN_FIELD.to_string(),
            authors: UNKNOWN_FIELD.to_string(),
            summary: UNKNOWN_FIELD.to_string(),
        }
    }
}

/// Insert payload for one imported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLiteratureRecord {
    pub collection_id: CollectionId,
    pub info: PaperInfo,
    /// Absolute path of the source document.
    pub file_path: String,
    pub content_hash: ContentHash,
}

/// Persisted literature record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteratureRecord {
    pub id: RecordId,
    pub collection_id: CollectionId,
    pub year: Option<i32>,
    pub journal: String,
    pub title: String,
    pub authors: String,
    pub summary: String,
    pub file_path: String,
    pub content_hash: String,
}

impl LiteratureRecord {
    /// Year for display; [`UNKNOWN_FIELD`] when absent.
    pub fn year_label(&self) -> YearLabel {
        YearLabel(self.year)
    }
}

/// Display adapter for an optional year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearLabel(pub Option<i32>);

impl Display for YearLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(year) => write!(f, "{year}"),
            None => f.write_str(UNKNOWN_FIELD),
        }
    }
}
