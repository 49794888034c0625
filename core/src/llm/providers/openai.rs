//! OpenAI and Azure OpenAI client implementation using the async-openai library

use crate::config::{Protocol, ResolvedLlmConfig};
use crate::error::{ConfigError, Error, LlmError, Result};
use crate::llm::{
    ChatOptions, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageRole, ModelReply,
    ResponseFormat, Usage,
};
use crate::tools::{ToolCall, ToolDefinition};
use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionCall, FunctionObject,
        ResponseFormat as OpenAiResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;

/// Chat completion client for OpenAI-compatible and Azure OpenAI endpoints
pub struct OpenAiClient<C: Config = OpenAIConfig> {
    client: Client<C>,
    model: String,
    provider: &'static str,
}

impl OpenAiClient<OpenAIConfig> {
    /// Create a client for an OpenAI-compatible endpoint
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Llm(LlmError::Authentication {
                message: "No API key found for OpenAI".to_string(),
            }));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.trim_end_matches('/'));
        }

        Ok(Self {
            client: with_headers(Client::with_config(openai_config), &config.headers)?,
            model: config.model.clone(),
            provider: "openai",
        })
    }
}

impl OpenAiClient<AzureConfig> {
    /// Create a client for an Azure OpenAI deployment
    pub fn azure(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Llm(LlmError::Authentication {
                message: "No API key found for Azure OpenAI".to_string(),
            }));
        }

        let azure_config = AzureConfig::new()
            .with_api_base(config.base_url.trim_end_matches('/'))
            .with_api_key(&config.api_key)
            .with_api_version(config.azure_api_version())
            .with_deployment_id(config.azure_deployment());

        Ok(Self {
            client: with_headers(Client::with_config(azure_config), &config.headers)?,
            model: config.model.clone(),
            provider: "azure_openai",
        })
    }
}

/// Turn configured extra headers into a header map
fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || {
            Error::Config(ConfigError::InvalidValue {
                field: "headers".to_string(),
                value: name.clone(),
            })
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Send the configured extra headers with every request
fn with_headers<C: Config>(
    client: Client<C>,
    headers: &HashMap<String, String>,
) -> Result<Client<C>> {
    if headers.is_empty() {
        return Ok(client);
    }
    let http_client = reqwest::Client::builder()
        .default_headers(header_map(headers)?)
        .build()
        .map_err(|e| {
            Error::Llm(LlmError::InvalidRequest {
                message: format!("Failed to build HTTP client: {}", e),
            })
        })?;
    Ok(client.with_http_client(http_client))
}

/// Create the client matching the configured protocol
pub fn create_client(config: &ResolvedLlmConfig) -> Result<std::sync::Arc<dyn LlmClient>> {
    config.validate()?;
    let client: std::sync::Arc<dyn LlmClient> = match config.protocol {
        Protocol::OpenAICompat => std::sync::Arc::new(OpenAiClient::new(config)?),
        Protocol::AzureOpenAI => std::sync::Arc::new(OpenAiClient::azure(config)?),
    };
    tracing::debug!(
        "Created {} client for model {}",
        client.provider_name(),
        client.model_name()
    );
    Ok(client)
}

/// Convert our messages to async-openai request messages
fn convert_messages(
    messages: &[LlmMessage],
) -> std::result::Result<Vec<ChatCompletionRequestMessage>, LlmError> {
    messages
        .iter()
        .map(|message| match message.role {
            MessageRole::System => Ok(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: message.content.clone().into(),
                    name: None,
                },
            )),
            MessageRole::User => Ok(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: message.content.clone().into(),
                    name: None,
                },
            )),
            MessageRole::Assistant => {
                let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                    .tool_calls
                    .iter()
                    .map(|call| ChatCompletionMessageToolCall {
                        id: call.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect();

                Ok(ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage {
                        content: if message.content.is_empty() {
                            None
                        } else {
                            Some(ChatCompletionRequestAssistantMessageContent::Text(
                                message.content.clone(),
                            ))
                        },
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                        ..Default::default()
                    },
                ))
            }
            MessageRole::Tool => {
                let tool_call_id = message.tool_call_id.clone().ok_or_else(|| {
                    LlmError::InvalidRequest {
                        message: "Tool message must reference a tool call".to_string(),
                    }
                })?;
                Ok(ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessage {
                        content: ChatCompletionRequestToolMessageContent::Text(
                            message.content.clone(),
                        ),
                        tool_call_id,
                    },
                ))
            }
        })
        .collect()
}

/// Convert our tool definitions to async-openai format
fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.parameters_json()),
                strict: None,
            },
        })
        .collect()
}

/// Map an async-openai error onto the model client error kinds
fn map_error(error: OpenAIError) -> LlmError {
    match error {
        OpenAIError::ApiError(api) => {
            let code = api.code.clone().unwrap_or_default();
            let kind = api.r#type.clone().unwrap_or_default();
            if code == "invalid_api_key" || code == "401" {
                LlmError::Authentication {
                    message: api.message,
                }
            } else if code == "rate_limit_exceeded" || code == "429" || kind == "requests" {
                LlmError::RateLimit {
                    message: api.message,
                }
            } else {
                LlmError::ApiError {
                    status: code.parse().unwrap_or(400),
                    message: api.message,
                }
            }
        }
        OpenAIError::Reqwest(e) => LlmError::Network {
            message: e.to_string(),
        },
        OpenAIError::JSONDeserialize(e) => LlmError::InvalidResponse {
            message: e.to_string(),
        },
        OpenAIError::InvalidArgument(message) => LlmError::InvalidRequest { message },
        other => LlmError::ApiError {
            status: 500,
            message: other.to_string(),
        },
    }
}

/// Convert an async-openai response to our format
fn convert_response(
    response: CreateChatCompletionResponse,
) -> std::result::Result<LlmResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse {
            message: "No choices in response".to_string(),
        })?;

    let content = choice.message.content.unwrap_or_default();
    let calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tool_call| {
            // Unparseable arguments are passed through as a string and rejected by the executor
            let arguments: Value = serde_json::from_str(&tool_call.function.arguments)
                .unwrap_or(Value::String(tool_call.function.arguments));
            ToolCall::with_id(tool_call.id, tool_call.function.name, arguments)
        })
        .collect();

    let reply = if calls.is_empty() {
        ModelReply::Text(content)
    } else {
        ModelReply::ToolCalls { content, calls }
    };

    let usage = response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let finish_reason = choice.finish_reason.map(|reason| match reason {
        async_openai::types::FinishReason::Stop => FinishReason::Stop,
        async_openai::types::FinishReason::Length => FinishReason::Length,
        async_openai::types::FinishReason::ToolCalls => FinishReason::ToolCalls,
        async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
        async_openai::types::FinishReason::FunctionCall => FinishReason::ToolCalls,
    });

    Ok(LlmResponse {
        reply,
        usage,
        model: response.model,
        finish_reason,
    })
}

#[async_trait]
impl<C> LlmClient for OpenAiClient<C>
where
    C: Config + Send + Sync + 'static,
{
    async fn chat_completion(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> std::result::Result<LlmResponse, LlmError> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model);
        request_builder.messages(convert_messages(messages)?);

        if !tools.is_empty() {
            tracing::debug!("{} request with {} tools enabled", self.provider, tools.len());
            request_builder.tools(convert_tools(tools));
            if let Some(parallel) = options.parallel_tool_calls {
                request_builder.parallel_tool_calls(parallel);
            }
        }

        if let Some(max_tokens) = options.max_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            request_builder.top_p(top_p);
        }
        match options.response_format {
            Some(ResponseFormat::JsonObject) => {
                request_builder.response_format(OpenAiResponseFormat::JsonObject);
            }
            Some(ResponseFormat::Text) => {
                request_builder.response_format(OpenAiResponseFormat::Text);
            }
            None => {}
        }

        let request = request_builder.build().map_err(|e| {
            tracing::error!("Failed to build {} request: {}", self.provider, e);
            LlmError::InvalidRequest {
                message: format!("Failed to build request: {}", e),
            }
        })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!("{} API call failed: {}", self.provider, e);
            map_error(e)
        })?;

        let response = convert_response(response)?;
        if let ModelReply::ToolCalls { calls, .. } = &response.reply {
            tracing::debug!("{} response contains {} tool calls", self.provider, calls.len());
            for call in calls {
                tracing::debug!("Tool call: {} (id: {})", call.name, call.id);
            }
        }
        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        self.provider
    }
}
