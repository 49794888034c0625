//! Configuration types for relay core
//!
//! Core only accepts fully resolved, validated configuration.
//! All discovery, loading, and merging happens in the CLI layer.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Default API version for Azure OpenAI deployments
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// Supported LLM protocols
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// OpenAI-compatible API (includes OpenAI, many proxies, local models)
    #[serde(rename = "openai_compat")]
    OpenAICompat,
    /// Azure OpenAI API
    #[serde(rename = "azure_openai")]
    AzureOpenAI,
}

impl Protocol {
    /// Get the protocol name as a string
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::OpenAICompat => "openai_compat",
            Protocol::AzureOpenAI => "azure_openai",
        }
    }

    /// Get the default base URL for this protocol
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Protocol::OpenAICompat => Some("https://api.openai.com/v1"),
            Protocol::AzureOpenAI => None, // Requires custom endpoint
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "openai_compat" => Ok(Protocol::OpenAICompat),
            "azure" | "azure_openai" => Ok(Protocol::AzureOpenAI),
            other => Err(ConfigError::UnsupportedProtocol {
                protocol: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model parameters for LLM requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
}

/// A fully resolved LLM configuration ready for use by core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLlmConfig {
    /// The protocol to use
    pub protocol: Protocol,
    /// Base URL for the API (the resource endpoint for Azure)
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Model name/identifier
    pub model: String,
    /// Azure API version
    #[serde(default)]
    pub api_version: Option<String>,
    /// Azure deployment name; defaults to the model name
    #[serde(default)]
    pub deployment: Option<String>,
    /// Model parameters
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers for requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResolvedLlmConfig {
    /// Create a new resolved LLM config
    pub fn new(protocol: Protocol, base_url: String, api_key: String, model: String) -> Self {
        Self {
            protocol,
            base_url,
            api_key,
            model,
            api_version: None,
            deployment: None,
            params: ModelParams::default(),
            headers: HashMap::new(),
        }
    }

    /// Set model parameters
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_api_version<S: Into<String>>(mut self, api_version: S) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_deployment<S: Into<String>>(mut self, deployment: S) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Azure API version, falling back to the default
    pub fn azure_api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION)
    }

    /// Azure deployment, falling back to the model name
    pub fn azure_deployment(&self) -> &str {
        self.deployment.as_deref().unwrap_or(&self.model)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_key".to_string(),
            });
        }

        if self.model.is_empty() {
            return Err(ConfigError::MissingField {
                field: "model".to_string(),
            });
        }

        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "base_url".to_string(),
            });
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(invalid("base_url", "must start with http:// or https://"));
        }

        if let Some(temp) = self.params.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(invalid("temperature", "must be between 0.0 and 2.0"));
            }
        }

        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(invalid("top_p", "must be between 0.0 and 1.0"));
            }
        }

        if matches!(self.api_version.as_deref(), Some("")) {
            return Err(invalid("api_version", "cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolvedLlmConfig {
        ResolvedLlmConfig::new(
            Protocol::AzureOpenAI,
            "https://example.openai.azure.com".to_string(),
            "secret".to_string(),
            "gpt-4o".to_string(),
        )
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = config();
        config.api_key.clear();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::MissingField {
                field: "api_key".to_string()
            }
        );
    }

    #[test]
    fn test_bad_url_and_ranges() {
        let mut bad_url = config();
        bad_url.base_url = "example.com".to_string();
        assert!(bad_url.validate().is_err());

        let hot = config().with_params(ModelParams {
            temperature: Some(3.0),
            ..Default::default()
        });
        assert!(hot.validate().is_err());
    }

    #[test]
    fn test_azure_defaults() {
        let config = config();
        assert_eq!(config.azure_api_version(), DEFAULT_AZURE_API_VERSION);
        assert_eq!(config.azure_deployment(), "gpt-4o");

        let config = config.with_deployment("prod-gpt").with_api_version("2024-06-01");
        assert_eq!(config.azure_deployment(), "prod-gpt");
        assert_eq!(config.azure_api_version(), "2024-06-01");
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("azure".parse::<Protocol>().unwrap(), Protocol::AzureOpenAI);
        assert_eq!("OpenAI".parse::<Protocol>().unwrap(), Protocol::OpenAICompat);
        assert!("anthropic".parse::<Protocol>().is_err());
    }
}
