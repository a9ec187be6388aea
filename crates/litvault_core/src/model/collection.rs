//! Collection model.

use serde::{Deserialize, Serialize};

/// Database-assigned collection identity.
pub type CollectionId = i64;

/// Named topical grouping of literature records.
///
/// `name` is unique and case-sensitive: `RL` and `rl` are two collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
}

/// One row of the collection overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: CollectionId,
    pub name: String,
    /// Zero for collections created by an import that found nothing new.
    pub record_count: u64,
}
