//! Structured output decoding

pub mod decoder;
pub mod response;

pub use decoder::{parse_as, parse_value, StructuredDecoder};
pub use response::{ResponseItem, StructuredResponse};

use crate::schema::Schema;
use serde::de::DeserializeOwned;

/// A type that knows the schema its JSON form must satisfy
pub trait StructuredOutput: DeserializeOwned {
    fn schema() -> Schema;
}
