//! Configuration types for relay core
//!
//! Only exports pure data types. All loading logic is in the CLI layer.

pub mod types;

pub use types::{ModelParams, Protocol, ResolvedLlmConfig, DEFAULT_AZURE_API_VERSION};
