//! Service client trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Chat-completion client used for query expansion
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Run one completion and parse the response as a JSON object
    async fn complete_json(&self, prompt: &str, max_tokens: u32) -> Result<serde_json::Value>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Document reranking trait
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score documents against a query; results sorted by descending score
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankResult>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Reranking result referring back to the input document by index
#[derive(Debug, Clone)]
pub struct RerankResult {
    pub index: usize,
    pub relevance_score: f64,
}

/// Translation trait
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate text into the destination language
    async fn translate(&self, text: &str, dest: &str) -> Result<Translation>;
}

/// A completed translation
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub src: String,
    pub dest: String,
    pub origin: String,
}
