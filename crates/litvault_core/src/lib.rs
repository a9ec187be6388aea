//! Core domain logic for the literature vault.
//! Import pipeline, collection store and collection-scoped question answering.

pub mod config;
pub mod db;
pub mod document;
pub mod fingerprint;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, OracleConfig};
pub use document::{DocumentError, DocumentReader, PdfTextReader, PlainTextReader};
pub use fingerprint::{fingerprint_text, ContentHash};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{Collection, CollectionId, CollectionSummary};
pub use model::literature::{LiteratureRecord, PaperInfo, RecordId, UNKNOWN_FIELD};
pub use oracle::{OpenAiClient, OracleError, StructuredCompletion};
pub use repo::collection_store::{
    CollectionStore, RepoError, RepoResult, SqliteCollectionStore,
};
pub use service::context_builder::{BuiltContext, ContextBuilder};
pub use service::extractor::{ExtractionError, ExtractionOracle, MetadataExtractor};
pub use service::ingest_service::{ImportOutcome, ImportSummary, IngestError, IngestService};
pub use service::query_service::{
    AnswerSynthesizer, AnsweringOracle, QueryError, QueryService, SearchAnswer,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
