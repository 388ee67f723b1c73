//! HTTP clients for OpenAI-compatible LLM and embedding services

use super::{Embedder, LLMClient};
use crate::config::ServiceConfig;
use crate::error::{PolyseekError, Result};
use crate::limiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completion client for OpenAI-compatible services
pub struct OpenAiClient {
    http_client: reqwest::Client,
    config: ServiceConfig,
}

impl OpenAiClient {
    /// Create from configuration
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PolyseekError::Http)?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from `LLM_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env("LLM")?)
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[async_trait]
impl LLMClient for OpenAiClient {
    async fn complete_json(&self, prompt: &str, max_tokens: u32) -> Result<serde_json::Value> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChatChoiceMessage {
            content: String,
        }

        limiter::channel(crate::LLM_CHANNEL).acquire().await;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.0,
            max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(PolyseekError::Http)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PolyseekError::ExternalService(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(PolyseekError::Http)?;
        let content = &chat_response
            .choices
            .first()
            .ok_or_else(|| PolyseekError::ExternalService("No response from LLM".to_string()))?
            .message
            .content;

        parse_json_object(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Extract and parse the JSON object from a completion (handles markdown
/// code fences and leading prose)
pub(crate) fn parse_json_object(response: &str) -> Result<serde_json::Value> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response,
    };
    serde_json::from_str(json_str).map_err(|e| {
        tracing::debug!("raw LLM response: {}", response);
        PolyseekError::ExternalService(format!("LLM returned invalid JSON: {}", e))
    })
}

/// Embedding client for OpenAI-compatible services
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: ServiceConfig,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Create from configuration with the expected embedding dimension
    pub fn new(config: ServiceConfig, dimensions: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PolyseekError::Http)?;
        Ok(Self {
            http_client,
            config,
            dimensions,
        })
    }

    /// Create from `EMBEDDING_*` environment variables
    pub fn from_env(dimensions: usize) -> Result<Self> {
        Self::new(ServiceConfig::from_env("EMBEDDING")?, dimensions)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| PolyseekError::EmbeddingFailed("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        limiter::channel(crate::EMBEDDING_CHANNEL).acquire().await;

        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
        };

        let url = format!("{}/v1/embeddings", self.config.url);
        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(PolyseekError::Http)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PolyseekError::EmbeddingFailed(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(PolyseekError::Http)?;
        if embed_response.data.len() != texts.len() {
            return Err(PolyseekError::EmbeddingFailed(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embed_response.data.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = embed_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect();
        if let Some(first) = embeddings.first() {
            if first.len() != self.dimensions {
                return Err(PolyseekError::EmbeddingFailed(format!(
                    "Embedding dimension {} does not match configured {}",
                    first.len(),
                    self.dimensions
                )));
            }
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
