//! Collection store contract and SQLite implementation.
//!
//! # Responsibility
//! - Map collection names to ids, creating collections on first reference.
//! - Persist literature records and look them up by content fingerprint.
//!
//! # Invariants
//! - Every write is committed before the call returns.
//! - `literatures.content_hash` is unique across all collections; the UNIQUE index
//!   is the final guard against concurrent duplicate inserts.
//! - Listings are ordered deterministically.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::fingerprint::ContentHash;
use crate::model::collection::{Collection, CollectionId, CollectionSummary};
use crate::model::literature::{LiteratureRecord, NewLiteratureRecord, RecordId};
use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const RECORD_SELECT_SQL: &str = "SELECT
    l.id AS id,
    l.collection_id AS collection_id,
    l.year AS year,
    l.journal AS journal,
    l.title AS title,
    l.authors AS authors,
    l.summary AS summary,
    l.file_path AS file_path,
    l.content_hash AS content_hash
FROM literatures l";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for collection and record operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Content with this fingerprint is already stored.
    DuplicateContent {
        content_hash: ContentHash,
        existing: Option<RecordId>,
    },
    UnknownCollection(String),
    InvalidCollectionName(String),
    /// Connection was not bootstrapped through `db::open_db*`.
    SchemaNotReady { found: u32, expected: u32 },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateContent {
                content_hash,
                existing: Some(id),
            } => write!(
                f,
                "content {} already imported as record {id}",
                content_hash.short()
            ),
            Self::DuplicateContent {
                content_hash,
                existing: None,
            } => write!(f, "content {} already imported", content_hash.short()),
            Self::UnknownCollection(name) => write!(f, "unknown collection `{name}`"),
            Self::InvalidCollectionName(name) => write!(f, "invalid collection name `{name}`"),
            Self::SchemaNotReady { found, expected } => write!(
                f,
                "database schema version {found} does not match expected {expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Where already-imported content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateOwner {
    pub record_id: RecordId,
    pub collection_id: CollectionId,
    pub collection_name: String,
}

/// Durable mapping of collections to their literature records.
pub trait CollectionStore {
    /// Returns the id for `name`, creating the collection if absent.
    fn get_or_create_collection(&self, name: &str) -> RepoResult<CollectionId>;
    fn find_collection(&self, name: &str) -> RepoResult<Option<Collection>>;
    fn find_record_by_hash(&self, hash: &ContentHash) -> RepoResult<Option<RecordId>>;
    fn find_duplicate_owner(&self, hash: &ContentHash) -> RepoResult<Option<DuplicateOwner>>;
    /// Fails with `DuplicateContent` when the fingerprint is already stored.
    fn insert_record(&self, record: &NewLiteratureRecord) -> RepoResult<RecordId>;
    /// Records of one collection in ascending id order.
    fn list_records(&self, collection_name: &str) -> RepoResult<Vec<LiteratureRecord>>;
    /// All collections with record counts, ordered by name.
    fn list_collections(&self) -> RepoResult<Vec<CollectionSummary>>;
}

impl<S: CollectionStore + ?Sized> CollectionStore for &S {
    fn get_or_create_collection(&self, name: &str) -> RepoResult<CollectionId> {
        (**self).get_or_create_collection(name)
    }

    fn find_collection(&self, name: &str) -> RepoResult<Option<Collection>> {
        (**self).find_collection(name)
    }

    fn find_record_by_hash(&self, hash: &ContentHash) -> RepoResult<Option<RecordId>> {
        (**self).find_record_by_hash(hash)
    }

    fn find_duplicate_owner(&self, hash: &ContentHash) -> RepoResult<Option<DuplicateOwner>> {
        (**self).find_duplicate_owner(hash)
    }

    fn insert_record(&self, record: &NewLiteratureRecord) -> RepoResult<RecordId> {
        (**self).insert_record(record)
    }

    fn list_records(&self, collection_name: &str) -> RepoResult<Vec<LiteratureRecord>> {
        (**self).list_records(collection_name)
    }

    fn list_collections(&self) -> RepoResult<Vec<CollectionSummary>> {
        (**self).list_collections()
    }
}

/// SQLite-backed collection store.
pub struct SqliteCollectionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionStore<'conn> {
    /// Wraps a connection returned by `db::open_db` / `db::open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected = latest_version();
        if found != expected {
            return Err(RepoError::SchemaNotReady { found, expected });
        }
        Ok(Self { conn })
    }
}

impl CollectionStore for SqliteCollectionStore<'_> {
    fn get_or_create_collection(&self, name: &str) -> RepoResult<CollectionId> {
        if name.trim().is_empty() {
            return Err(RepoError::InvalidCollectionName(name.to_string()));
        }

        if let Some(existing) = self.find_collection(name)? {
            return Ok(existing.id);
        }

        // OR IGNORE keeps the call idempotent if another writer created it first.
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1);",
            [name],
        )?;
        let id = self
            .find_collection(name)?
            .map(|collection| collection.id)
            .ok_or_else(|| {
                RepoError::InvalidData(format!("collection `{name}` missing after insert"))
            })?;

        if inserted > 0 {
            info!("event=collection_create module=repo status=ok collection_id={id}");
        }
        Ok(id)
    }

    fn find_collection(&self, name: &str) -> RepoResult<Option<Collection>> {
        let collection = self
            .conn
            .query_row(
                "SELECT id, name FROM collections WHERE name = ?1;",
                [name],
                |row| {
                    Ok(Collection {
                        id: row.get("id")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(collection)
    }

    fn find_record_by_hash(&self, hash: &ContentHash) -> RepoResult<Option<RecordId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM literatures WHERE content_hash = ?1;",
                [hash.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_duplicate_owner(&self, hash: &ContentHash) -> RepoResult<Option<DuplicateOwner>> {
        let owner = self
            .conn
            .query_row(
                "SELECT l.id, l.collection_id, c.name
                 FROM literatures l
                 JOIN collections c ON c.id = l.collection_id
                 WHERE l.content_hash = ?1;",
                [hash.as_str()],
                |row| {
                    Ok(DuplicateOwner {
                        record_id: row.get(0)?,
                        collection_id: row.get(1)?,
                        collection_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(owner)
    }

    fn insert_record(&self, record: &NewLiteratureRecord) -> RepoResult<RecordId> {
        let info = &record.info;
        let result = self.conn.execute(
            "INSERT INTO literatures (
                collection_id,
                year,
                journal,
                title,
                authors,
                summary,
                file_path,
                content_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                record.collection_id,
                info.year,
                info.journal.as_str(),
                info.title.as_str(),
                info.authors.as_str(),
                info.summary.as_str(),
                record.file_path.as_str(),
                record.content_hash.as_str(),
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                debug!(
                    "event=record_insert module=repo status=ok record_id={} collection_id={} hash={}",
                    id,
                    record.collection_id,
                    record.content_hash.short()
                );
                Ok(id)
            }
            Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateContent {
                content_hash: record.content_hash.clone(),
                existing: self.find_record_by_hash(&record.content_hash)?,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn list_records(&self, collection_name: &str) -> RepoResult<Vec<LiteratureRecord>> {
        let collection = self
            .find_collection(collection_name)?
            .ok_or_else(|| RepoError::UnknownCollection(collection_name.to_string()))?;

        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE l.collection_id = ?1
             ORDER BY l.id ASC;"
        ))?;
        let mut rows = stmt.query([collection.id])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }

        Ok(records)
    }

    fn list_collections(&self) -> RepoResult<Vec<CollectionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id AS id, c.name AS name, COUNT(l.id) AS record_count
             FROM collections c
             LEFT JOIN literatures l ON l.collection_id = c.id
             GROUP BY c.id, c.name
             ORDER BY c.name ASC, c.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();

        while let Some(row) = rows.next()? {
            let count: i64 = row.get("record_count")?;
            let record_count = u64::try_from(count).map_err(|_| {
                RepoError::InvalidData(format!("negative record count `{count}`"))
            })?;
            summaries.push(CollectionSummary {
                id: row.get("id")?,
                name: row.get("name")?,
                record_count,
            });
        }

        Ok(summaries)
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<LiteratureRecord> {
    let content_hash: String = row.get("content_hash")?;
    // Reject rows that could never deduplicate again.
    ContentHash::from_hex(&content_hash)
        .map_err(|err| RepoError::InvalidData(format!("{err} in literatures.content_hash")))?;

    Ok(LiteratureRecord {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        year: row.get("year")?,
        journal: row.get("journal")?,
        title: row.get("title")?,
        authors: row.get("authors")?,
        summary: row.get("summary")?,
        file_path: row.get("file_path")?,
        content_hash,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
