//! Domain model for collections and literature records.
//!
//! # Responsibility
//! - Define the shapes shared by the store, the pipelines and the CLI.
//!
//! # Invariants
//! - Identities are database-assigned integers and never reused.
//! - Records are immutable once persisted.

pub mod collection;
pub mod literature;
