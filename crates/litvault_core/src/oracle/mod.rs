//! Language-model oracle transport.
//!
//! # Responsibility
//! - Define the one call the services need: a structured (JSON-schema) completion.
//! - Keep HTTP and provider details out of the ingestion and query services.
//!
//! # Invariants
//! - One request per call; no retries.
//! - Callers receive either a JSON value or an `OracleError`, never partial text.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

/// Failure talking to the completion endpoint.
#[derive(Debug)]
pub enum OracleError {
    Http(reqwest::Error),
    Api { status: u16, message: String },
    /// The endpoint answered, but not with the requested structure.
    Malformed(String),
}

impl Display for OracleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "oracle request failed: {err}"),
            Self::Api { status, message } => write!(f, "oracle API error [{status}]: {message}"),
            Self::Malformed(message) => write!(f, "malformed oracle response: {message}"),
        }
    }
}

impl Error for OracleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Named JSON schema requested as the response shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// Blocking structured completion: system instruction + user message in, JSON out.
pub trait StructuredCompletion {
    fn complete_json(
        &self,
        instruction: &str,
        user_message: &str,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, OracleError>;
}

impl<C: StructuredCompletion + ?Sized> StructuredCompletion for &C {
    fn complete_json(
        &self,
        instruction: &str,
        user_message: &str,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, OracleError> {
        (**self).complete_json(instruction, user_message, schema)
    }
}
