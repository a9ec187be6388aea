//! Document ingestion use-case service.
//!
//! # Responsibility
//! - Turn documents on disk into stored literature records for one collection.
//! - Skip content that is already stored anywhere, before paying for extraction.
//! - Report every document as imported, skipped, or failed.
//!
//! # Invariants
//! - A per-document failure never aborts the batch; store failures do.
//! - Directory scans are non-recursive and visit files in file-name order.
//! - Re-importing an unchanged directory inserts nothing.

use crate::document::{is_recognized_document, DocumentError, DocumentReader};
use crate::fingerprint::fingerprint_text;
use crate::model::collection::CollectionId;
use crate::model::literature::{NewLiteratureRecord, RecordId};
use crate::repo::collection_store::{CollectionStore, RepoError};
use crate::service::extractor::{ExtractionError, ExtractionOracle};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Batch-level ingestion error. Per-document problems are `ImportOutcome::Failed`.
#[derive(Debug)]
pub enum IngestError {
    DirectoryNotFound(PathBuf),
    NotADirectory(PathBuf),
    FileNotFound(PathBuf),
    Io { path: PathBuf, source: std::io::Error },
    Repo(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryNotFound(path) => {
                write!(f, "directory `{}` does not exist", path.display())
            }
            Self::NotADirectory(path) => write!(f, "`{}` is not a directory", path.display()),
            Self::FileNotFound(path) => write!(f, "file `{}` does not exist", path.display()),
            Self::Io { path, source } => write!(f, "cannot scan `{}`: {source}", path.display()),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Why one document was not imported.
#[derive(Debug)]
pub enum ImportFailure {
    Read(DocumentError),
    Extraction(ExtractionError),
}

impl Display for ImportFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(err) => write!(f, "{err}"),
            Self::Extraction(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read(err) => Some(err),
            Self::Extraction(err) => Some(err),
        }
    }
}

/// Result for one document of an import run.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported {
        path: PathBuf,
        record_id: RecordId,
        title: String,
    },
    SkippedDuplicate {
        path: PathBuf,
        /// `None` only when the owner vanished between detection and lookup.
        existing_record: Option<RecordId>,
        existing_collection: Option<String>,
    },
    Failed {
        path: PathBuf,
        reason: ImportFailure,
    },
}

impl ImportOutcome {
    /// Source document this outcome refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Imported { path, .. }
            | Self::SkippedDuplicate { path, .. }
            | Self::Failed { path, .. } => path,
        }
    }
}

/// Counters plus per-document outcomes for one import run.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportSummary {
    fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Imported { .. } => self.imported += 1,
            ImportOutcome::SkippedDuplicate { .. } => self.duplicates += 1,
            ImportOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Ingestion facade over a store, a document reader and an extraction oracle.
pub struct IngestService<S: CollectionStore, D: DocumentReader, E: ExtractionOracle> {
    store: S,
    reader: D,
    extractor: E,
}

impl<S: CollectionStore, D: DocumentReader, E: ExtractionOracle> IngestService<S, D, E> {
    /// Creates a service over the provided store, reader and extractor.
    pub fn new(store: S, reader: D, extractor: E) -> Self {
        Self {
            store,
            reader,
            extractor,
        }
    }

    /// Imports every recognized document directly inside `dir` into `collection`.
    ///
    /// The collection is created even when the directory holds no documents.
    pub fn import_directory(
        &self,
        collection: &str,
        dir: &Path,
    ) -> Result<ImportSummary, IngestError> {
        if !dir.exists() {
            return Err(IngestError::DirectoryNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(IngestError::NotADirectory(dir.to_path_buf()));
        }

        let documents = scan_documents(dir)?;
        let collection_id = self.store.get_or_create_collection(collection)?;
        info!(
            "event=import_batch module=ingest status=start collection_id={} documents={}",
            collection_id,
            documents.len()
        );

        let mut summary = ImportSummary::default();
        for path in documents {
            let outcome = self.import_document(collection_id, &path)?;
            summary.record(outcome);
        }

        info!(
            "event=import_batch module=ingest status=ok collection_id={} imported={} duplicates={} failed={}",
            collection_id, summary.imported, summary.duplicates, summary.failed
        );
        Ok(summary)
    }

    /// Imports one document into `collection`, whatever its extension.
    pub fn import_file(&self, collection: &str, path: &Path) -> Result<ImportSummary, IngestError> {
        if !path.is_file() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let collection_id = self.store.get_or_create_collection(collection)?;
        let mut summary = ImportSummary::default();
        summary.record(self.import_document(collection_id, path)?);
        Ok(summary)
    }

    /// Runs read, fingerprint, dedup, extract and insert for one document.
    ///
    /// Only store failures other than duplicate content are returned as `Err`.
    pub fn import_document(
        &self,
        collection_id: CollectionId,
        path: &Path,
    ) -> Result<ImportOutcome, IngestError> {
        let path = absolute_path(path);
        let file = file_label(&path);

        let text = match self.reader.read_text(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=import_document module=ingest status=error error_code=read file={} error={}",
                    file, err
                );
                return Ok(ImportOutcome::Failed {
                    path,
                    reason: ImportFailure::Read(err),
                });
            }
        };

        let content_hash = fingerprint_text(&text);
        if let Some(owner) = self.store.find_duplicate_owner(&content_hash)? {
            info!(
                "event=import_document module=ingest status=skip reason=duplicate file={} hash={} existing_record={}",
                file,
                content_hash.short(),
                owner.record_id
            );
            return Ok(ImportOutcome::SkippedDuplicate {
                path,
                existing_record: Some(owner.record_id),
                existing_collection: Some(owner.collection_name),
            });
        }

        let info = match self.extractor.extract(&text) {
            Ok(info) => info,
            Err(err) => {
                error!(
                    "event=import_document module=ingest status=error error_code=extract file={} error={}",
                    file, err
                );
                return Ok(ImportOutcome::Failed {
                    path,
                    reason: ImportFailure::Extraction(err),
                });
            }
        };

        let title = info.title.clone();
        let record = NewLiteratureRecord {
            collection_id,
            info,
            file_path: path.to_string_lossy().into_owned(),
            content_hash,
        };

        match self.store.insert_record(&record) {
            Ok(record_id) => {
                info!(
                    "event=import_document module=ingest status=ok file={} record_id={} collection_id={}",
                    file, record_id, collection_id
                );
                Ok(ImportOutcome::Imported {
                    path,
                    record_id,
                    title,
                })
            }
            // Another writer stored the same content after our lookup.
            Err(RepoError::DuplicateContent { existing, .. }) => {
                info!(
                    "event=import_document module=ingest status=skip reason=duplicate_on_insert file={}",
                    file
                );
                Ok(ImportOutcome::SkippedDuplicate {
                    path,
                    existing_record: existing,
                    existing_collection: None,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn scan_documents(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let io_error = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && is_recognized_document(&path) {
            documents.push(path);
        }
    }
    documents.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(documents)
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_follow_outcomes() {
        let mut summary = ImportSummary::default();
        summary.record(ImportOutcome::Imported {
            path: PathBuf::from("/a.pdf"),
            record_id: 1,
            title: "A".to_string(),
        });
        summary.record(ImportOutcome::SkippedDuplicate {
            path: PathBuf::from("/b.pdf"),
            existing_record: Some(1),
            existing_collection: Some("RL".to_string()),
        });
        summary.record(ImportOutcome::Failed {
            path: PathBuf::from("/c.pdf"),
            reason: ImportFailure::Extraction(ExtractionError::EmptyDocument),
        });

        assert_eq!(
            (summary.imported, summary.duplicates, summary.failed),
            (1, 1, 1)
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.outcomes[2].path(), Path::new("/c.pdf"));
    }

    #[test]
    fn scan_is_sorted_non_recursive_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), "b").unwrap();
        std::fs::write(dir.path().join("A.PDF"), "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.pdf"), "c").unwrap();

        let names: Vec<String> = scan_documents(dir.path())
            .unwrap()
            .iter()
            .map(|path| file_label(path))
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }
}
