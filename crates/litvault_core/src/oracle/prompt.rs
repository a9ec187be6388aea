//! Fixed instructions and response schemas sent to the oracle.

use super::ResponseSchema;
use serde_json::json;

pub const EXTRACTION_INSTRUCTION: &str = "You are an assistant that catalogues academic literature. \
From the document text, extract:
1. year: publication year as an integer
2. journal: journal or venue name
3. title: document title
4. authors: author list, comma separated
5. summary: a synthesized summary of the document's core contribution, written in your own words. \
Do not copy the abstract verbatim.
Answer \"unknown\" for any field that cannot be determined from the text.";

pub const ANSWER_INSTRUCTION: &str = "You are a literature retrieval assistant. \
You are given a library of records, each starting with `ID: <number>`, and a user question. \
Return:
1. relevant_ids: the IDs of records relevant to the question, most relevant first
2. answer: an answer to the question grounded only in the supplied records
Only cite IDs that appear in the library. If no record is relevant, return an empty list \
and say so in the answer.";

/// Response shape for metadata extraction.
pub fn paper_info_schema() -> ResponseSchema {
    ResponseSchema {
        name: "paper_info",
        schema: json!({
            "type": "object",
            "properties": {
                "year": { "type": ["integer", "string"] },
                "journal": { "type": "string" },
                "title": { "type": "string" },
                "authors": { "type": "string" },
                "summary": { "type": "string" }
            },
            "required": ["year", "journal", "title", "authors", "summary"],
            "additionalProperties": false
        }),
    }
}

/// Response shape for question answering.
pub fn search_result_schema() -> ResponseSchema {
    ResponseSchema {
        name: "search_result",
        schema: json!({
            "type": "object",
            "properties": {
                "relevant_ids": { "type": "array", "items": { "type": "integer" } },
                "answer": { "type": "string" }
            },
            "required": ["relevant_ids", "answer"],
            "additionalProperties": false
        }),
    }
}

pub fn extraction_message(document_text: &str) -> String {
    format!("Document text:\n\n{document_text}")
}

pub fn answer_message(context: &str, question: &str) -> String {
    format!("{context}\n\nQuestion: {question}")
}
