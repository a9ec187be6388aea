//! Retrieval context assembly.
//!
//! # Responsibility
//! - Serialize one collection's records into the text block sent to the answering oracle.
//!
//! # Invariants
//! - Records appear in ascending id order; unchanged data yields identical text.
//! - Output never exceeds `max_chars`; records that do not fit are omitted from the tail
//!   and reported through `BuiltContext::truncated`.

use crate::model::literature::{LiteratureRecord, RecordId};
use crate::repo::collection_store::{CollectionStore, RepoError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BLOCK_SEPARATOR_WIDTH: usize = 40;

#[derive(Debug)]
pub enum ContextError {
    UnknownCollection(String),
    /// Not even the first record fits the character budget.
    BudgetTooSmall { budget: usize, required: usize },
    Repo(RepoError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCollection(name) => write!(f, "unknown collection `{name}`"),
            Self::BudgetTooSmall { budget, required } => write!(
                f,
                "context budget of {budget} chars is too small; the first record needs {required}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ContextError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UnknownCollection(name) => Self::UnknownCollection(name),
            other => Self::Repo(other),
        }
    }
}

/// Serialized context plus the records it actually contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltContext {
    pub text: String,
    /// Records included in `text`, ascending id.
    pub records: Vec<LiteratureRecord>,
    /// Records the collection holds, included or not.
    pub total_records: usize,
}

impl BuiltContext {
    /// Ids of the included records, ascending.
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|record| record.id).collect()
    }

    /// Whether record `id` is part of the context.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    /// Some records were left out to fit the budget.
    pub fn truncated(&self) -> bool {
        self.records.len() < self.total_records
    }

    /// Number of records left out.
    pub fn omitted(&self) -> usize {
        self.total_records - self.records.len()
    }

    /// The collection has no records at all.
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Builds size-bounded context text for one collection.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    max_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Loads `collection_name` from `store` and serializes it.
    pub fn build<S: CollectionStore>(
        &self,
        store: &S,
        collection_name: &str,
    ) -> Result<BuiltContext, ContextError> {
        let records = store.list_records(collection_name)?;
        self.build_from_records(collection_name, records)
    }

    /// Serializes `records` (expected in ascending id order) under a collection header.
    pub fn build_from_records(
        &self,
        collection_name: &str,
        records: Vec<LiteratureRecord>,
    ) -> Result<BuiltContext, ContextError> {
        let total_records = records.len();
        let mut text = collection_header(collection_name);
        let mut used_chars = text.chars().count();
        let mut included = Vec::with_capacity(total_records);

        for record in records {
            let block = record_block(&record);
            let block_chars = block.chars().count();
            if used_chars + block_chars > self.max_chars {
                if included.is_empty() {
                    warn!(
                        "event=context_build module=context status=error error_code=budget_too_small budget={} required={}",
                        self.max_chars,
                        used_chars + block_chars
                    );
                    return Err(ContextError::BudgetTooSmall {
                        budget: self.max_chars,
                        required: used_chars + block_chars,
                    });
                }
                break;
            }
            text.push_str(&block);
            used_chars += block_chars;
            included.push(record);
        }

        let built = BuiltContext {
            text,
            records: included,
            total_records,
        };
        if built.truncated() {
            warn!(
                "event=context_build module=context status=ok truncated=true included={} omitted={} budget={}",
                built.records.len(),
                built.omitted(),
                self.max_chars
            );
        } else {
            debug!(
                "event=context_build module=context status=ok included={} chars={}",
                built.records.len(),
                used_chars
            );
        }
        Ok(built)
    }
}

fn collection_header(collection_name: &str) -> String {
    format!("Collection: {collection_name}\n\n")
}

/// One record as it appears in the context.
pub fn record_block(record: &LiteratureRecord) -> String {
    format!(
        "ID: {}\nTitle: {}\nAuthors: {}\nYear: {}\nJournal: {}\nSummary: {}\n{}\n",
        record.id,
        record.title,
        record.authors,
        record.year_label(),
        record.journal,
        record.summary,
        "-".repeat(BLOCK_SEPARATOR_WIDTH)
    )
}
