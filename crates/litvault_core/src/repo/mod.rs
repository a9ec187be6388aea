//! Repository layer for collections and literature records.
//!
//! # Responsibility
//! - Define the store contract used by the ingestion and query services.
//! - Keep SQLite query details inside the persistence boundary.
//!
//! # Invariants
//! - Duplicate content is reported as `RepoError::DuplicateContent`, never as a raw
//!   constraint failure.
//! - Unknown collection names are semantic errors, not empty results.

pub mod collection_store;
