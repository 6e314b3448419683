//! OpenAI client configuration with sensible defaults.

use crate::config::LlmSettings;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client for the configured endpoint.
///
/// Uses a 5-minute timeout by default to prevent hung API calls.
pub fn create_client(settings: &LlmSettings) -> Client<OpenAIConfig> {
    create_client_with_timeout(settings, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(settings: &LlmSettings, timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    Client::with_config(client_config(settings)).with_http_client(http_client)
}

/// Build the client config from the base URL and API key variable.
fn client_config(settings: &LlmSettings) -> OpenAIConfig {
    let mut config = OpenAIConfig::new();

    if let Ok(key) = std::env::var(&settings.api_key_env) {
        config = config.with_api_key(key);
    }

    if let Some(base_url) = settings.base_url.as_deref().filter(|u| !u.is_empty()) {
        config = config.with_api_base(base_url);
    }

    config
}

/// Whether an API key is available for the configured endpoint.
pub fn has_api_key(settings: &LlmSettings) -> bool {
    std::env::var(&settings.api_key_env).is_ok_and(|k| !k.is_empty())
}
