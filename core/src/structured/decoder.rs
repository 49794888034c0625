//! Structured output decoder
//!
//! A single model call constrained to JSON output, validated against a
//! [`Schema`] and converted into a typed value. Decoding is all-or-nothing:
//! any violation fails the whole decode.

use super::StructuredOutput;
use crate::config::ModelParams;
use crate::error::{DecodeError, LlmError};
use crate::llm::{ChatOptions, LlmClient, LlmMessage, ResponseFormat};
use crate::schema::Schema;
use handlebars::Handlebars;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

const INSTRUCTION_TEMPLATE: &str = "\
You are an AI assistant that always responds in JSON format according to this schema:
{{schema}}

Your response must be valid JSON that conforms to this schema.
Do not add any explanatory text before or after the JSON.
Include the current time in ISO format as the timestamp when the schema asks for one.";

/// Decodes model responses into schema-checked values
pub struct StructuredDecoder {
    client: Arc<dyn LlmClient>,
    options: ChatOptions,
    templates: Handlebars<'static>,
}

impl StructuredDecoder {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        let mut templates = Handlebars::new();
        templates.register_escape_fn(handlebars::no_escape);
        Self {
            client,
            options: ChatOptions {
                max_tokens: Some(1000),
                ..ChatOptions::default()
            },
            templates,
        }
    }

    /// Sampling options for the decode call; the response format is always JSON
    pub fn with_chat_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply configured sampling settings on top of the current options
    pub fn with_model_params(mut self, params: &ModelParams) -> Self {
        self.options = self.options.clone().with_params(params);
        self
    }

    /// System instruction embedding the rendered JSON schema
    pub fn render_instructions(&self, schema: &Schema) -> Result<String, DecodeError> {
        let rendered = serde_json::to_string_pretty(&schema.to_json_schema()).map_err(|e| {
            DecodeError::ModelClient(LlmError::InvalidRequest {
                message: format!("Failed to render schema: {}", e),
            })
        })?;
        self.templates
            .render_template(INSTRUCTION_TEMPLATE, &json!({ "schema": rendered }))
            .map_err(|e| {
                DecodeError::ModelClient(LlmError::InvalidRequest {
                    message: format!("Failed to render instructions: {}", e),
                })
            })
    }

    /// Ask the model and return the validated JSON value
    pub async fn decode_value(&self, prompt: &str, schema: &Schema) -> Result<Value, DecodeError> {
        let messages = vec![
            LlmMessage::system(self.render_instructions(schema)?),
            LlmMessage::user(prompt),
        ];
        let options = ChatOptions {
            response_format: Some(ResponseFormat::JsonObject),
            ..self.options.clone()
        };

        tracing::debug!("Requesting structured output from {}", self.client.model_name());
        let response = self
            .client
            .chat_completion(&messages, &[], &options)
            .await
            .map_err(|e| {
                tracing::error!("Structured output request failed: {}", e);
                DecodeError::ModelClient(e)
            })?;

        let value = parse_value(response.reply.content(), schema)?;
        tracing::info!("Successfully validated structured response");
        Ok(value)
    }

    /// Ask the model and convert the validated value into `T`
    pub async fn decode_as<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &Schema,
    ) -> Result<T, DecodeError> {
        let value = self.decode_value(prompt, schema).await?;
        into_typed(value)
    }

    /// Decode into a type that declares its own schema
    pub async fn decode<T: StructuredOutput>(&self, prompt: &str) -> Result<T, DecodeError> {
        self.decode_as(prompt, &T::schema()).await
    }
}

/// Parse and validate raw model text.
///
/// Pure: the same raw text always yields the same outcome.
pub fn parse_value(raw: &str, schema: &Schema) -> Result<Value, DecodeError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Model response is not valid JSON: {}", e);
        DecodeError::Malformed {
            raw: raw.to_string(),
            message: e.to_string(),
        }
    })?;

    schema.validate(&value).map_err(|violation| {
        tracing::warn!("Validation error: {}", violation);
        DecodeError::SchemaValidation {
            field: violation.field,
            reason: violation.reason,
        }
    })?;
    Ok(value)
}

/// Parse, validate and convert raw model text into `T`
pub fn parse_as<T: DeserializeOwned>(raw: &str, schema: &Schema) -> Result<T, DecodeError> {
    into_typed(parse_value(raw, schema)?)
}

fn into_typed<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::Type {
        message: e.to_string(),
    })
}

/// Trim the text and drop a surrounding markdown code fence
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the language tag on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::schema::ObjectSchema;
    use crate::structured::StructuredResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: u8,
    }

    fn person_schema() -> Schema {
        ObjectSchema::new()
            .required("name", Schema::string_with_length(Some(1), None))
            .required("age", Schema::integer_range(Some(0), Some(150)))
            .into()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```{}"), "```{}");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = r#"{"name": "Alice", "age": 30}"#;
        let first: Person = parse_as(raw, &person_schema()).unwrap();
        let second: Person = parse_as(raw, &person_schema()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.name, "Alice");
    }

    #[test]
    fn test_malformed_response() {
        let err = parse_value("Sure! Here is the JSON: {", &person_schema()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref raw, .. } if raw.starts_with("Sure!")));
    }

    #[test]
    fn test_one_violation_fails_whole_decode() {
        let err = parse_value(r#"{"name": "Alice", "age": 300}"#, &person_schema()).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaValidation { ref field, .. } if field == "age"));

        let err = parse_value(r#"{"name": "Alice"}"#, &person_schema()).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaValidation { ref field, .. } if field == "age"));
    }

    #[test]
    fn test_type_mismatch_after_validation() {
        // the schema allows ages the Rust type cannot hold
        let schema: Schema = ObjectSchema::new()
            .required("name", Schema::string())
            .required("age", Schema::integer())
            .into();
        let err = parse_as::<Person>(r#"{"name": "Old", "age": 1000}"#, &schema).unwrap_err();
        assert!(matches!(err, DecodeError::Type { .. }));
    }

    #[tokio::test]
    async fn test_decode_requests_json_without_tools() {
        let mock = Arc::new(MockLlmClient::new());
        mock.queue_text("```json\n{\"name\": \"Bob\", \"age\": 41}\n```");
        let decoder = StructuredDecoder::new(mock.clone());

        let person: Person = decoder
            .decode_as("Invent a person", &person_schema())
            .await
            .unwrap();
        assert_eq!(
            person,
            Person {
                name: "Bob".to_string(),
                age: 41
            }
        );

        let request = &mock.requests()[0];
        assert!(request.tools.is_empty());
        assert_eq!(request.options.response_format, Some(ResponseFormat::JsonObject));
        assert!(request.messages[0].content.contains("\"required\""));
        assert_eq!(request.messages[1].content, "Invent a person");
    }

    #[tokio::test]
    async fn test_decode_default_response_type() {
        let mock = Arc::new(MockLlmClient::new());
        mock.queue_text(
            r#"{"query": "q", "items": [], "summary": "nothing", "timestamp": "2024-01-01T00:00:00Z"}"#,
        );
        let decoder = StructuredDecoder::new(mock);
        let response: StructuredResponse = decoder.decode("q").await.unwrap();
        assert_eq!(response.summary, "nothing");
    }

    #[tokio::test]
    async fn test_model_params_reach_the_request() {
        let mock = Arc::new(MockLlmClient::new());
        mock.queue_text(r#"{"name": "Ann", "age": 7}"#);
        let params = ModelParams {
            temperature: Some(0.1),
            ..ModelParams::default()
        };
        let decoder = StructuredDecoder::new(mock.clone()).with_model_params(&params);

        let _: Person = decoder
            .decode_as("Invent a child", &person_schema())
            .await
            .unwrap();
        let options = &mock.requests()[0].options;
        assert_eq!(options.temperature, Some(0.1));
        assert_eq!(options.max_tokens, Some(1000));
    }

    #[tokio::test]
    async fn test_model_failure() {
        let mock = Arc::new(MockLlmClient::new());
        mock.queue_error(LlmError::RateLimit {
            message: "slow down".to_string(),
        });
        let decoder = StructuredDecoder::new(mock);
        let err = decoder
            .decode_value("q", &person_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::ModelClient(LlmError::RateLimit { .. })));
    }
}
