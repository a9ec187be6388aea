//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, document and oracle calls into import and search use-cases.
//! - Keep the CLI decoupled from storage and provider details.

pub mod context_builder;
pub mod extractor;
pub mod ingest_service;
pub mod query_service;
