use crate::config::ModelConfig;
use crate::models::ModelResponse;
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Client for the chat-completion endpoint of the model under test
pub struct ModelClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ModelClient {
    /// Create a client with the configured endpoint, token and timeout
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_endpoint);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Send one chat completion and measure its latency
    pub async fn query(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelResponse> {
        let request = self.build_request(system_prompt, user_prompt)?;

        let started = Instant::now();
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .context("Failed to query model")?;
        let response_time = started.elapsed().as_secs_f64();

        Ok(extract_model_response(response, response_time))
    }

    /// Build the chat completion request
    fn build_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CreateChatCompletionRequest> {
        let system_message: ChatCompletionRequestMessage =
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt.to_string())
                .build()
                .context("Failed to build system message")?
                .into();

        let user_message: ChatCompletionRequestMessage =
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt.to_string())
                .build()
                .context("Failed to build user message")?
                .into();

        let max_tokens = u16::try_from(self.max_tokens)
            .with_context(|| format!("max_tokens {} is out of range", self.max_tokens))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([system_message, user_message])
            .temperature(self.temperature as f32)
            .max_tokens(max_tokens)
            .build()
            .context("Failed to build chat completion request")
    }
}

/// Bearer token from the configured environment variable, else the static key
fn resolve_api_key(config: &ModelConfig) -> Result<String> {
    match std::env::var(&config.env_var_api_key) {
        Ok(key) => Ok(key),
        Err(_) => config.api_key.clone().with_context(|| {
            format!(
                "Environment variable {} not found and no api_key configured",
                config.env_var_api_key
            )
        }),
    }
}

/// Render the user prompt for a story
pub fn render_prompt(template: &str, story: &str) -> String {
    template.replace("{story}", story)
}

/// Extract ModelResponse from the API response
fn extract_model_response(response: CreateChatCompletionResponse, response_time: f64) -> ModelResponse {
    let content = match response.choices.first() {
        Some(choice) => match &choice.message.content {
            Some(content) => content.clone(),
            None => String::new(),
        },
        None => String::new(),
    };

    let mut metadata = HashMap::new();
    if let Some(usage) = response.usage {
        metadata.insert("prompt_tokens".to_string(), json!(usage.prompt_tokens));
        metadata.insert("completion_tokens".to_string(), json!(usage.completion_tokens));
        metadata.insert("total_tokens".to_string(), json!(usage.total_tokens));
    }

    ModelResponse {
        content,
        response_time,
        metadata,
    }
}
