//! External inference service clients
//!
//! Provides traits and HTTP implementations for:
//! - Chat completion (query expansion)
//! - Embedding generation
//! - Document reranking
//! - Translation
//!
//! Every HTTP client goes through the process-wide rate limiter on its
//! channel before touching the network.

mod client;
mod reranker;
mod traits;
mod translator;

pub use client::{HttpEmbedder, OpenAiClient};
pub use reranker::HttpReranker;
pub use traits::*;
pub use translator::{translate_batch, HttpTranslator};
