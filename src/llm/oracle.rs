use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::OracleError;

/// One language-model call: behavioural rules plus the user-side payload.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// The hosted language model, treated as a black box that returns text.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError>;
}

/// HTTP-backed oracle for Ollama or OpenAI-compatible chat APIs.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Oracle for LlmClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let content = match self.config.provider.as_str() {
            "ollama" => call_ollama(&self.http, &self.config, prompt).await?,
            "openai" => call_openai(&self.http, &self.config, prompt).await?,
            other => return Err(OracleError::UnknownProvider(other.to_string())),
        };

        let content = content.trim();
        if content.is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(content.to_string())
    }
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

fn messages(prompt: &Prompt) -> Vec<Message> {
    vec![
        Message {
            role: "system".to_string(),
            content: prompt.system.clone(),
        },
        Message {
            role: "user".to_string(),
            content: prompt.user.clone(),
        },
    ]
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, OracleError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(OracleError::Status { status, body })
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &Prompt,
) -> Result<String, OracleError> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: messages(prompt),
        stream: false,
        options: OllamaOptions {
            temperature: config.temperature,
            num_predict: prompt.max_tokens,
        },
    };

    let resp = client.post(&url).json(&req).send().await?;
    let body: OllamaChatResponse = error_for_status(resp).await?.json().await?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &Prompt,
) -> Result<String, OracleError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| OracleError::MissingApiKey(config.provider.clone()))?;
    let url = format!("{}/v1/chat/completions", config.base_url);

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: messages(prompt),
        temperature: config.temperature,
        max_tokens: prompt.max_tokens,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await?;

    let body: OpenAiChatResponse = error_for_status(resp).await?.json().await?;
    Ok(body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}
