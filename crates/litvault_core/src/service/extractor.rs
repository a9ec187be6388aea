//! Metadata extraction over the structured-completion oracle.
//!
//! # Responsibility
//! - Turn document text into `PaperInfo` with a single oracle call.
//! - Apply the input length policy and normalize partial answers.
//!
//! # Invariants
//! - Input longer than `max_document_chars` is truncated at a char boundary, never rejected.
//! - Missing or blank fields become `UNKNOWN_FIELD`; unknown years become `None`.
//! - No retries: a failed document is retried by the next import run.

use crate::model::literature::{PaperInfo, UNKNOWN_FIELD};
use crate::oracle::prompt::{extraction_message, paper_info_schema, EXTRACTION_INSTRUCTION};
use crate::oracle::{OracleError, StructuredCompletion};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MIN_YEAR: i64 = 1000;
const MAX_YEAR: i64 = 2999;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)([12]\d{3})(?:\D|$)").expect("valid year regex"));

/// Extraction failure for one document.
#[derive(Debug)]
pub enum ExtractionError {
    EmptyDocument,
    Oracle(OracleError),
    /// The oracle answered with something that is not a field object.
    Malformed(String),
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDocument => write!(f, "document has no text to extract from"),
            Self::Oracle(err) => write!(f, "extraction failed: {err}"),
            Self::Malformed(message) => write!(f, "unusable extraction response: {message}"),
        }
    }
}

impl Error for ExtractionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Oracle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OracleError> for ExtractionError {
    fn from(value: OracleError) -> Self {
        match value {
            OracleError::Malformed(message) => Self::Malformed(message),
            other => Self::Oracle(other),
        }
    }
}

/// Extraction seam used by the ingestion service.
pub trait ExtractionOracle {
    fn extract(&self, text: &str) -> Result<PaperInfo, ExtractionError>;
}

impl<E: ExtractionOracle + ?Sized> ExtractionOracle for &E {
    fn extract(&self, text: &str) -> Result<PaperInfo, ExtractionError> {
        (**self).extract(text)
    }
}

/// Language-model backed extractor.
pub struct MetadataExtractor<C: StructuredCompletion> {
    client: C,
    max_document_chars: usize,
}

impl<C: StructuredCompletion> MetadataExtractor<C> {
    pub fn new(client: C, max_document_chars: usize) -> Self {
        Self {
            client,
            max_document_chars,
        }
    }
}

impl<C: StructuredCompletion> ExtractionOracle for MetadataExtractor<C> {
    fn extract(&self, text: &str) -> Result<PaperInfo, ExtractionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        let (input, truncated) = truncate_chars(text, self.max_document_chars);
        if truncated {
            debug!(
                "event=extract_truncate module=extractor status=ok limit_chars={}",
                self.max_document_chars
            );
        }

        let response = self.client.complete_json(
            EXTRACTION_INSTRUCTION,
            &extraction_message(input),
            &paper_info_schema(),
        )?;
        normalize_paper_info(&response)
    }
}

/// Returns the first `max_chars` chars of `text` and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

/// Maps a raw oracle object onto `PaperInfo`, filling gaps with the unknown sentinel.
pub fn normalize_paper_info(value: &Value) -> Result<PaperInfo, ExtractionError> {
    let Some(fields) = value.as_object() else {
        return Err(ExtractionError::Malformed(
            "expected a JSON object".to_string(),
        ));
    };

    let info = PaperInfo {
        year: fields.get("year").and_then(parse_year),
        journal: text_field(fields.get("journal")),
        title: text_field(fields.get("title")),
        authors: text_field(fields.get("authors")),
        summary: text_field(fields.get("summary")),
    };

    if info == PaperInfo::unknown() {
        warn!("event=extract_normalize module=extractor status=ok all_fields_unknown=true");
    }
    Ok(info)
}

fn parse_year(value: &Value) -> Option<i32> {
    let year = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(text) => YEAR_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        _ => None,
    }?;

    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        i32::try_from(year).ok()
    } else {
        None
    }
}

fn text_field(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };

    if is_unknown_marker(&text) {
        UNKNOWN_FIELD.to_string()
    } else {
        text
    }
}

fn is_unknown_marker(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case(UNKNOWN_FIELD)
        || text.eq_ignore_ascii_case("n/a")
        || text.eq_ignore_ascii_case("none")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ResponseSchema;
    use serde_json::json;
    use std::cell::RefCell;

    struct ScriptedCompletion {
        response: RefCell<Option<Result<Value, OracleError>>>,
        seen_user_message: RefCell<Option<String>>,
    }

    impl ScriptedCompletion {
        fn returning(response: Result<Value, OracleError>) -> Self {
            Self {
                response: RefCell::new(Some(response)),
                seen_user_message: RefCell::new(None),
            }
        }
    }

    impl StructuredCompletion for ScriptedCompletion {
        fn complete_json(
            &self,
            _instruction: &str,
            user_message: &str,
            schema: &ResponseSchema,
        ) -> Result<Value, OracleError> {
            assert_eq!(schema.name, "paper_info");
            *self.seen_user_message.borrow_mut() = Some(user_message.to_string());
            self.response
                .borrow_mut()
                .take()
                .expect("completion called more than once")
        }
    }

    #[test]
    fn complete_response_maps_to_paper_info() {
        let client = ScriptedCompletion::returning(Ok(json!({
            "year": 2017,
            "journal": "NeurIPS",
            "title": "Attention Is All You Need",
            "authors": "Vaswani, Shazeer",
            "summary": "Introduces the Transformer."
        })));
        let extractor = MetadataExtractor::new(&client, 1000);

        let info = extractor.extract("paper body").unwrap();
        assert_eq!(info.year, Some(2017));
        assert_eq!(info.journal, "NeurIPS");
        assert_eq!(info.authors, "Vaswani, Shazeer");
    }

    #[test]
    fn missing_and_placeholder_fields_become_unknown() {
        let info = normalize_paper_info(&json!({
            "year": "unknown",
            "journal": "",
            "title": "  A Title ",
            "authors": ["A. Smith", "B. Jones"],
            "summary": "N/A"
        }))
        .unwrap();

        assert_eq!(info.year, None);
        assert_eq!(info.journal, UNKNOWN_FIELD);
        assert_eq!(info.title, "A Title");
        assert_eq!(info.authors, "A. Smith, B. Jones");
        assert_eq!(info.summary, UNKNOWN_FIELD);
    }

    #[test]
    fn year_strings_and_out_of_range_values_are_normalized() {
        assert_eq!(parse_year(&json!("Published 2019, revised 2020")), Some(2019));
        assert_eq!(parse_year(&json!(2021.0)), Some(2021));
        assert_eq!(parse_year(&json!("20210")), None);
        assert_eq!(parse_year(&json!(42)), None);
        assert_eq!(parse_year(&json!(null)), None);
    }

    #[test]
    fn non_object_response_is_malformed() {
        assert!(matches!(
            normalize_paper_info(&json!(["not", "an", "object"])),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn oracle_failure_surfaces_as_extraction_error() {
        let client = ScriptedCompletion::returning(Err(OracleError::Api {
            status: 503,
            message: "overloaded".to_string(),
        }));
        let extractor = MetadataExtractor::new(&client, 1000);

        let err = extractor.extract("paper body").unwrap_err();
        assert!(matches!(err, ExtractionError::Oracle(OracleError::Api { status: 503, .. })));
    }

    #[test]
    fn blank_text_is_rejected_without_calling_oracle() {
        let client = ScriptedCompletion::returning(Ok(json!({})));
        let extractor = MetadataExtractor::new(&client, 1000);

        assert!(matches!(
            extractor.extract("  \n "),
            Err(ExtractionError::EmptyDocument)
        ));
        assert!(client.seen_user_message.borrow().is_none());
    }

    #[test]
    fn oversized_input_is_truncated_before_sending() {
        let client = ScriptedCompletion::returning(Ok(json!({ "title": "T" })));
        let extractor = MetadataExtractor::new(&client, 5);

        extractor.extract("αβγδεζηθ").unwrap();
        let sent = client.seen_user_message.borrow().clone().unwrap();
        assert!(sent.ends_with("αβγδε"));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
        assert_eq!(truncate_chars("short", 10), ("short", false));
        assert_eq!(truncate_chars("exact", 5), ("exact", false));
    }
}
