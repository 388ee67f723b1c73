//! Search command

use crate::app::SearchArgs;
use anyhow::{anyhow, Context, Result};
use polyseek_core::{
    cross_language_search, limiter, Database, Embedder, HttpEmbedder, HttpReranker,
    HttpTranslator, OpenAiClient, RateLimitConfig, Reranker, SearchConfig, SearchRequest,
    SearchServices, ServiceConfig, Translator,
};
use std::sync::Arc;

pub async fn run(args: SearchArgs, db: &Database) -> Result<()> {
    let query = args.query.join(" ");

    let config = if args.no_ai {
        SearchConfig::from_env().unwrap_or_default()
    } else {
        SearchConfig::from_env().context("search service configuration")?
    };
    configure_rate_limits()?;

    let services = if args.no_ai {
        offline_services(&config)?
    } else {
        build_services(&config)?
    };

    let mut request = SearchRequest::new(&args.knowledge_base, &args.workspace, &query);
    request.ai_search = !args.no_ai;
    request.page_size = args.page_size;
    request.page_delta = args.pages;
    request.last_row_cursor = args
        .cursor
        .as_deref()
        .map(parse_cursor)
        .transpose()?;

    let mut pages = cross_language_search(db, &services, &config, request).await?;
    let mut total = 0usize;
    while let Some(batch) = pages.next_page().await? {
        for hit in &batch {
            println!("{}", serde_json::to_string(hit)?);
        }
        total += batch.len();
    }
    tracing::info!(total, "search finished");
    Ok(())
}

fn parse_cursor(raw: &str) -> Result<(String, i64)> {
    let (document_key, chunk_index) = raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("cursor must be <document_key>:<chunk_index>"))?;
    let chunk_index = chunk_index
        .parse()
        .context("cursor chunk index must be an integer")?;
    Ok((document_key.to_string(), chunk_index))
}

fn configure_rate_limits() -> Result<()> {
    for (channel, prefix) in [
        (polyseek_core::LLM_CHANNEL, "LLM"),
        (polyseek_core::EMBEDDING_CHANNEL, "EMBEDDING"),
        (polyseek_core::RERANKER_CHANNEL, "RERANKER"),
        (polyseek_core::TRANSLATOR_CHANNEL, "TRANSLATOR"),
    ] {
        limiter::configure_channel(channel, RateLimitConfig::from_env(prefix)?);
    }
    Ok(())
}

fn build_services(config: &SearchConfig) -> Result<SearchServices> {
    let llm = OpenAiClient::from_env().context("LLM service configuration")?;
    let embedder = HttpEmbedder::from_env(config.embedding_dimension)
        .context("embedding service configuration")?;
    let reranker = HttpReranker::from_env()
        .ok()
        .map(|r| Arc::new(r) as Arc<dyn Reranker>);
    let translator = HttpTranslator::from_env()
        .ok()
        .map(|t| Arc::new(t) as Arc<dyn Translator>);
    Ok(SearchServices {
        llm: Arc::new(llm),
        embedder: Arc::new(embedder) as Arc<dyn Embedder>,
        reranker,
        translator,
    })
}

/// Plain search never calls a service; satisfy the pipeline with inert
/// clients so no endpoint configuration is required.
fn offline_services(config: &SearchConfig) -> Result<SearchServices> {
    let placeholder = ServiceConfig {
        url: "http://127.0.0.1:0".to_string(),
        model: "unconfigured".to_string(),
        api_key: None,
        entry_point: None,
        timeout_secs: 1,
    };
    Ok(SearchServices {
        llm: Arc::new(OpenAiClient::new(placeholder.clone())?),
        embedder: Arc::new(HttpEmbedder::new(placeholder, config.embedding_dimension)?),
        reranker: None,
        translator: None,
    })
}
