//! HTTP reranker client
//!
//! Speaks the common rerank API shape: POST `{query, documents, model}`,
//! response `{data: [{index, relevance_score}]}`.

use super::{RerankResult, Reranker};
use crate::config::ServiceConfig;
use crate::error::{PolyseekError, Result};
use crate::limiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reranker backed by an external HTTP service
pub struct HttpReranker {
    http_client: reqwest::Client,
    config: ServiceConfig,
}

impl HttpReranker {
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

    /// Create from `RERANKER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env("RERANKER")?)
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        #[derive(Serialize)]
        struct RerankRequest<'a> {
            query: &'a str,
            documents: &'a [String],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct RerankResponse {
            data: Vec<RerankEntry>,
        }

        #[derive(Deserialize)]
        struct RerankEntry {
            index: usize,
            relevance_score: f64,
        }

        limiter::channel(crate::RERANKER_CHANNEL).acquire().await;

        let request = RerankRequest {
            query,
            documents,
            model: &self.config.model,
        };

        let mut req = self.http_client.post(&self.config.url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(PolyseekError::Http)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PolyseekError::RerankFailed(format!(
                "Reranker service error (HTTP {}): {}",
                status, body
            )));
        }

        let rerank_response: RerankResponse =
            response.json().await.map_err(PolyseekError::Http)?;

        let mut results: Vec<RerankResult> = rerank_response
            .data
            .into_iter()
            .filter(|entry| entry.index < documents.len())
            .map(|entry| RerankResult {
                index: entry.index,
                relevance_score: entry.relevance_score,
            })
            .collect();
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
