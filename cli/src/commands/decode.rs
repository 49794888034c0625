//! Structured output command

use anyhow::Result;
use relay_core::{create_client, StructuredDecoder, StructuredResponse};
use tracing::info;

/// Decode a schema-checked response for `prompt` and print it as JSON
pub async fn decode_command(
    prompt: String,
    config_loader: crate::config::CliConfigLoader,
) -> Result<()> {
    let llm_config = config_loader.load().await?;
    info!("Using model: {}", llm_config.model);

    let decoder =
        StructuredDecoder::new(create_client(&llm_config)?).with_model_params(&llm_config.params);
    let response: StructuredResponse = decoder.decode(&prompt).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
