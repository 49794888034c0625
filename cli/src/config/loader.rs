//! CLI configuration loader for relay
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./relay.json or ./.relay/config.json
//! 3. Git repository root: <repo_root>/.relay/config.json
//! 4. XDG config: $XDG_CONFIG_HOME/relay/config.json or ~/.config/relay/config.json
//! 5. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use relay_core::config::DEFAULT_AZURE_API_VERSION;
use relay_core::{ModelParams, Protocol, ResolvedLlmConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_MODEL: &str = "gpt-4o";

/// Raw configuration file format (simple single-file schema)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use (openai or azure_openai)
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Azure API version
    #[serde(default)]
    pub api_version: Option<String>,
    /// Azure deployment name
    #[serde(default)]
    pub deployment: Option<String>,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// CLI configuration loader
#[derive(Debug, Default)]
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    protocol_override: Option<String>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    api_version_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file/directory override; `~` and `$VAR` are expanded
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        let raw = path.to_string_lossy();
        let expanded = shellexpand::full(&raw)
            .map(|expanded| PathBuf::from(expanded.as_ref()))
            .unwrap_or_else(|_| path.clone());
        self.config_override = Some(expanded);
        self
    }

    /// Override the protocol
    pub fn with_protocol_override(mut self, protocol: String) -> Self {
        self.protocol_override = Some(protocol);
        self
    }

    /// Override the API key
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Override the base URL
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Override the model name
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Override the Azure API version
    pub fn with_api_version_override(mut self, api_version: String) -> Self {
        self.api_version_override = Some(api_version);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<ResolvedLlmConfig> {
        // Step 1: Find and load base configuration
        let config = if let Some(override_path) = &self.config_override {
            load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides, then resolve
        resolve_config(self.apply_overrides(config))
    }

    fn apply_overrides(&self, mut config: RawConfig) -> RawConfig {
        if let Some(protocol) = &self.protocol_override {
            config.protocol = protocol.clone();
        }
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = model.clone();
        }
        if let Some(api_version) = &self.api_version_override {
            config.api_version = Some(api_version.clone());
        }
        config
    }

    /// Search for configuration in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        let cwd = std::env::current_dir()?;

        for candidate in [
            cwd.join("relay.json"),
            cwd.join(".relay").join("config.json"),
        ] {
            if candidate.is_file() {
                tracing::debug!("Using config file {}", candidate.display());
                return load_file(&candidate).await;
            }
        }

        if let Some(git_root) = find_git_root(&cwd) {
            let candidate = git_root.join(".relay").join("config.json");
            if candidate.is_file() {
                tracing::debug!("Using config file {}", candidate.display());
                return load_file(&candidate).await;
            }
        }

        if let Some(config_dir) = xdg_config_dir() {
            let candidate = config_dir.join("relay").join("config.json");
            if candidate.is_file() {
                tracing::debug!("Using config file {}", candidate.display());
                return load_file(&candidate).await;
            }
        }

        tracing::debug!("No config file found, reading environment");
        raw_config_from_env(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }
}

/// Build a configuration from environment variables.
///
/// Azure OpenAI wins when `AZURE_OPENAI_API_KEY` is set; otherwise
/// `OPENAI_API_KEY` selects an OpenAI-compatible endpoint.
pub fn raw_config_from_env<F>(var: F) -> Result<RawConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(api_key) = var("AZURE_OPENAI_API_KEY") {
        let base_url = var("AZURE_OPENAI_ENDPOINT")
            .ok_or_else(|| anyhow!("AZURE_OPENAI_ENDPOINT must be set for Azure OpenAI"))?;
        let model = var("AZURE_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let deployment = var("AZURE_OPENAI_DEPLOYMENT").unwrap_or_else(|| model.clone());

        return Ok(RawConfig {
            protocol: "azure_openai".to_string(),
            api_key,
            base_url: Some(base_url),
            model,
            api_version: Some(
                var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            ),
            deployment: Some(deployment),
            params: ModelParams::default(),
            headers: HashMap::new(),
        });
    }

    if let Some(api_key) = var("OPENAI_API_KEY") {
        return Ok(RawConfig {
            protocol: "openai".to_string(),
            api_key,
            base_url: var("OPENAI_BASE_URL"),
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_version: None,
            deployment: None,
            params: ModelParams::default(),
            headers: HashMap::new(),
        });
    }

    Err(anyhow!(
        "No configuration found. Create relay.json or set AZURE_OPENAI_API_KEY / OPENAI_API_KEY"
    ))
}

/// Load configuration from a specific path (file or directory)
async fn load_from_path(path: &Path) -> Result<RawConfig> {
    if path.is_file() {
        load_file(path).await
    } else if path.is_dir() {
        let config_file = path.join("config.json");
        if config_file.exists() {
            load_file(&config_file).await
        } else {
            Err(anyhow!(
                "No config.json found in directory: {}",
                path.display()
            ))
        }
    } else {
        Err(anyhow!("Config path does not exist: {}", path.display()))
    }
}

/// Load a single config file
async fn load_file(path: &Path) -> Result<RawConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Find the enclosing git repository root
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Get XDG config directory
fn xdg_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

/// Resolve raw config to ResolvedLlmConfig
pub fn resolve_config(config: RawConfig) -> Result<ResolvedLlmConfig> {
    let protocol: Protocol = config.protocol.parse()?;

    // Resolve API key (handle env: prefix)
    let api_key = match config.api_key.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .with_context(|| format!("Environment variable not found: {}", var_name))?,
        None => config.api_key,
    };

    let base_url = match config.base_url {
        Some(base_url) => base_url,
        None => protocol
            .default_base_url()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("base_url is required for protocol {}", protocol))?,
    };

    let mut resolved = ResolvedLlmConfig::new(protocol, base_url, api_key, config.model)
        .with_params(config.params);
    resolved.api_version = config.api_version;
    resolved.deployment = config.deployment;
    resolved.headers = config.headers;

    resolved
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    Ok(resolved)
}
