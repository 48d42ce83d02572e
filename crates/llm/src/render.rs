//! Phrase rendering over an Ollama chat endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use dhvani_core::{Error, PhraseRenderer, Result};

use crate::LlmError;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "gemma2:2b".to_string(),
            timeout: Duration::from_secs(5),
            max_tokens: 128,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    num_predict: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You rephrase one prompt for a phone agent. \
Answer with the rephrased sentence only, same language as the template, \
no preamble, no quotes.";

/// [`PhraseRenderer`] backed by an Ollama chat endpoint.
///
/// Strictly a phrasing capability: template plus context in, one sentence
/// out.
pub struct OllamaPhraseRenderer {
    config: RendererConfig,
    client: reqwest::Client,
}

impl OllamaPhraseRenderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Render(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn chat(&self, prompt: String) -> std::result::Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                num_predict: self.config.max_tokens,
                temperature: 0.3,
            },
        };

        let response: ChatResponse = self
            .client
            .post(format!("{}/api/chat", self.config.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| LlmError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text)
    }
}

#[async_trait]
impl PhraseRenderer for OllamaPhraseRenderer {
    async fn render(&self, template: &str, context: &serde_json::Value) -> Result<String> {
        let prompt = format!("Template: {template}\nContext: {context}");
        self.chat(prompt)
            .await
            .map_err(|e| Error::Render(e.to_string()))
    }
}
