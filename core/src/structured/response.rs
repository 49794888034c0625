//! Default structured response shape

use super::StructuredOutput;
use crate::schema::{ObjectSchema, Schema};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single item in a structured response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    pub title: String,
    pub description: String,
    /// Confidence score in `[0.0, 1.0]`
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// General-purpose answer: a list of scored items plus a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    /// The original query
    pub query: String,
    pub items: Vec<ResponseItem>,
    pub summary: String,
    /// ISO 8601 timestamp of the response
    pub timestamp: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StructuredOutput for ResponseItem {
    fn schema() -> Schema {
        ObjectSchema::new()
            .required(
                "title",
                Schema::string().describe("Title or name of the item"),
            )
            .required(
                "description",
                Schema::string().describe("Detailed description"),
            )
            .required(
                "confidence",
                Schema::number_range(Some(0.0), Some(1.0))
                    .describe("Confidence score (0.0-1.0)"),
            )
            .optional(
                "tags",
                Schema::array(Schema::string()).describe("Relevant tags or categories"),
            )
            .optional(
                "metadata",
                Schema::any_object().describe("Additional metadata"),
            )
            .into()
    }
}

impl StructuredOutput for StructuredResponse {
    fn schema() -> Schema {
        ObjectSchema::new()
            .required("query", Schema::string().describe("The original query"))
            .required(
                "items",
                Schema::array(ResponseItem::schema()).describe("List of response items"),
            )
            .required("summary", Schema::string().describe("Overall summary"))
            .required(
                "timestamp",
                Schema::string().describe("ISO format timestamp of the response"),
            )
            .into()
    }
}
