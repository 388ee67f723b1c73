//! Polyseek Core Library
//!
//! Core functionality for the polyseek cross-language search engine.
//!
//! # Features
//! - Fuzzy keyword and sentence matching over original and translated text
//! - Vector cosine-distance retrieval over stored chunk embeddings
//! - Snippet highlighting with `<mark>` markers and context windows
//! - Keyset-cursor pagination with a deterministic compound ordering
//! - Rate-limited clients for LLM, embedding, reranker and translator services

pub mod config;
pub mod db;
pub mod error;
pub mod gather;
pub mod limiter;
pub mod llm;
pub mod search;
pub mod text;

pub use config::{RateLimitConfig, SearchConfig, ServiceConfig, TimeUnit};
pub use db::{Database, Item};
pub use error::{Error, PolyseekError, Result};
pub use gather::{gather_with_limit, with_retries};
pub use limiter::RateLimiter;
pub use llm::{
    Embedder, HttpEmbedder, HttpReranker, HttpTranslator, LLMClient, OpenAiClient, RerankResult,
    Reranker, Translation, Translator,
};
pub use search::{
    cross_language_search, Highlight, PageBatch, SearchExpansion, SearchHit, SearchPages,
    SearchRequest, SearchServices,
};

/// Rate-limiter channel name for chat-completion calls
pub const LLM_CHANNEL: &str = "llm";

/// Rate-limiter channel name for embedding calls
pub const EMBEDDING_CHANNEL: &str = "embedding";

/// Rate-limiter channel name for reranker calls
pub const RERANKER_CHANNEL: &str = "reranker";

/// Rate-limiter channel name for translator calls
pub const TRANSLATOR_CHANNEL: &str = "translator";
