//! OpenAI-compatible chat-completions client.
//!
//! Works against any endpoint exposing `POST {api_base}/chat/completions` with bearer
//! auth and `response_format: json_schema`.

use super::{OracleError, ResponseSchema, StructuredCompletion};
use crate::config::{ApiKey, OracleConfig};
use crate::logging::sanitize_message;
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Instant;

const TEMPERATURE: f32 = 0.1;
const MAX_ERROR_BODY_CHARS: usize = 300;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Blocking client for one OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: ApiKey,
}

impl OpenAiClient {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl StructuredCompletion for OpenAiClient {
    fn complete_json(
        &self,
        instruction: &str,
        user_message: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, OracleError> {
        let started_at = Instant::now();
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [
                { "role": "system", "content": instruction },
                { "role": "user", "content": user_message },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                },
            },
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .map_err(|err| {
                error!(
                    "event=oracle_request module=oracle status=error schema={} duration_ms={} error_code=transport error={}",
                    schema.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                OracleError::from(err)
            })?;

        let status = response.status().as_u16();
        let text = response.text()?;
        if status >= 400 {
            let message = api_error_message(&text);
            error!(
                "event=oracle_request module=oracle status=error schema={} duration_ms={} http_status={} error={}",
                schema.name,
                started_at.elapsed().as_millis(),
                status,
                message
            );
            return Err(OracleError::Api { status, message });
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|err| OracleError::Malformed(format!("response is not JSON: {err}")))?;
        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                OracleError::Malformed("missing choices[0].message.content".to_string())
            })?;

        let parsed = parse_content_json(content)?;
        debug!(
            "event=oracle_request module=oracle status=ok schema={} model={} duration_ms={} prompt_tokens={} completion_tokens={}",
            schema.name,
            self.model,
            started_at.elapsed().as_millis(),
            envelope["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            envelope["usage"]["completion_tokens"].as_u64().unwrap_or(0)
        );
        Ok(parsed)
    }
}

/// Parses the message content as a JSON object, tolerating a Markdown code fence.
pub(crate) fn parse_content_json(content: &str) -> Result<Value, OracleError> {
    let unfenced = CODE_FENCE_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map_or(content, |inner| inner.as_str());

    let value: Value = serde_json::from_str(unfenced.trim())
        .map_err(|err| OracleError::Malformed(format!("content is not JSON: {err}")))?;
    if !value.is_object() {
        return Err(OracleError::Malformed(
            "content is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

fn api_error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        json["error"]["message"]
            .as_str()
            .or_else(|| json["message"].as_str())
            .map(str::to_string)
    });
    let message = from_json.unwrap_or_else(|| body.to_string());
    if message.trim().is_empty() {
        return "unknown API error".to_string();
    }
    sanitize_message(&message, MAX_ERROR_BODY_CHARS)
}
