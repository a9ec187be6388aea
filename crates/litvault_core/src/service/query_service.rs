//! Question answering over one collection.
//!
//! # Responsibility
//! - Build the collection context and ask the answering oracle.
//! - Return an answer whose citations all point at records in that context.
//!
//! # Invariants
//! - Empty collections are answered locally; the oracle is not called.
//! - `cited_ids` is a subset of the context's record ids, without repeats, in oracle order.
//! - Oracle failures never produce a partial answer.

use crate::model::literature::{LiteratureRecord, RecordId};
use crate::oracle::prompt::{answer_message, search_result_schema, ANSWER_INSTRUCTION};
use crate::oracle::{OracleError, StructuredCompletion};
use crate::repo::collection_store::{CollectionStore, RepoError};
use crate::service::context_builder::{ContextBuilder, ContextError};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Query use-case error.
#[derive(Debug)]
pub enum QueryError {
    EmptyQuestion,
    UnknownCollection(String),
    ContextBudgetTooSmall { budget: usize, required: usize },
    AnswerGeneration(OracleError),
    Repo(RepoError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "question must not be empty"),
            Self::UnknownCollection(name) => write!(f, "unknown collection `{name}`"),
            Self::ContextBudgetTooSmall { budget, required } => write!(
                f,
                "context budget of {budget} chars cannot hold a single record ({required} needed)"
            ),
            Self::AnswerGeneration(err) => write!(f, "answer generation failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AnswerGeneration(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContextError> for QueryError {
    fn from(value: ContextError) -> Self {
        match value {
            ContextError::UnknownCollection(name) => Self::UnknownCollection(name),
            ContextError::BudgetTooSmall { budget, required } => {
                Self::ContextBudgetTooSmall { budget, required }
            }
            ContextError::Repo(err) => Self::Repo(err),
        }
    }
}

/// Raw oracle verdict before citation filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleAnswer {
    /// Ordered by relevance, as returned.
    pub relevant_ids: Vec<RecordId>,
    pub answer: String,
}

/// Answering seam used by the query service.
pub trait AnsweringOracle {
    fn answer(&self, context: &str, question: &str) -> Result<OracleAnswer, OracleError>;
}

impl<A: AnsweringOracle + ?Sized> AnsweringOracle for &A {
    fn answer(&self, context: &str, question: &str) -> Result<OracleAnswer, OracleError> {
        (**self).answer(context, question)
    }
}

/// Language-model backed answering oracle.
pub struct AnswerSynthesizer<C: StructuredCompletion> {
    client: C,
}

impl<C: StructuredCompletion> AnswerSynthesizer<C> {
    /// Creates a synthesizer sending requests through `client`.
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: StructuredCompletion> AnsweringOracle for AnswerSynthesizer<C> {
    fn answer(&self, context: &str, question: &str) -> Result<OracleAnswer, OracleError> {
        let response = self.client.complete_json(
            ANSWER_INSTRUCTION,
            &answer_message(context, question),
            &search_result_schema(),
        )?;
        parse_oracle_answer(&response)
    }
}

/// Reads `{ relevant_ids, answer }`; ids may arrive as numbers or numeric strings.
pub fn parse_oracle_answer(value: &Value) -> Result<OracleAnswer, OracleError> {
    let answer = value
        .get("answer")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|answer| !answer.is_empty())
        .ok_or_else(|| OracleError::Malformed("missing `answer` text".to_string()))?;

    let relevant_ids = match value.get("relevant_ids") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .or_else(|| item.as_str().and_then(|text| text.trim().parse().ok()))
                    .ok_or_else(|| {
                        OracleError::Malformed(format!("`relevant_ids` entry {item} is not an id"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(OracleError::Malformed(format!(
                "`relevant_ids` must be an array, got {other}"
            )))
        }
    };

    Ok(OracleAnswer {
        relevant_ids,
        answer: answer.to_string(),
    })
}

/// Final answer for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAnswer {
    pub collection: String,
    pub answer: String,
    /// Context record ids cited by the oracle, most relevant first.
    pub cited_ids: Vec<RecordId>,
    /// Full records for `cited_ids`, same order.
    pub cited_records: Vec<LiteratureRecord>,
    /// Some records were left out of the context to fit the budget.
    pub context_truncated: bool,
    pub omitted_records: usize,
}

/// Query facade over a store and an answering oracle.
pub struct QueryService<S: CollectionStore, A: AnsweringOracle> {
    store: S,
    oracle: A,
    context_builder: ContextBuilder,
}

impl<S: CollectionStore, A: AnsweringOracle> QueryService<S, A> {
    /// Creates a service using the provided store, oracle and context policy.
    pub fn new(store: S, oracle: A, context_builder: ContextBuilder) -> Self {
        Self {
            store,
            oracle,
            context_builder,
        }
    }

    /// Answers `question` using only records of `collection_name`.
    pub fn search(
        &self,
        collection_name: &str,
        question: &str,
    ) -> Result<SearchAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let context = self.context_builder.build(&self.store, collection_name)?;
        if context.is_empty() {
            info!("event=search module=query status=skip reason=empty_collection");
            return Ok(SearchAnswer {
                collection: collection_name.to_string(),
                answer: format!("No literature available in collection `{collection_name}`."),
                cited_ids: Vec::new(),
                cited_records: Vec::new(),
                context_truncated: false,
                omitted_records: 0,
            });
        }

        let verdict = self
            .oracle
            .answer(&context.text, question)
            .map_err(|err| {
                warn!("event=search module=query status=error error_code=oracle error={err}");
                QueryError::AnswerGeneration(err)
            })?;

        let mut cited_ids: Vec<RecordId> = Vec::new();
        for id in verdict.relevant_ids {
            if !context.contains(id) {
                warn!("event=search module=query status=ok dropped_citation={id}");
                continue;
            }
            if !cited_ids.contains(&id) {
                cited_ids.push(id);
            }
        }

        let cited_records = cited_ids
            .iter()
            .filter_map(|id| context.records.iter().find(|record| record.id == *id))
            .cloned()
            .collect();

        info!(
            "event=search module=query status=ok context_records={} cited={} truncated={}",
            context.records.len(),
            cited_ids.len(),
            context.truncated()
        );
        Ok(SearchAnswer {
            collection: collection_name.to_string(),
            answer: verdict.answer,
            cited_ids,
            cited_records,
            context_truncated: context.truncated(),
            omitted_records: context.omitted(),
        })
    }
}
