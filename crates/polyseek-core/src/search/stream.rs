//! Search entry point: lazy page stream and result assembly

use super::classifier;
use super::cursor::SortKey;
use super::expander::{self, SearchExpansion};
use super::fuzzy::SearchPlan;
use super::highlight::{build_snippet, marked_token_flags, TokenLayout, DEFAULT_CONTEXT_SIZE};
use super::revalidate::revalidate_page;
use super::EMBEDDING_ONLY_MAX_DISTANCE;
use crate::config::SearchConfig;
use crate::db::{CandidateRow, Database, Item, PageFilter, PageFilterMode};
use crate::error::{PolyseekError, Result};
use crate::gather::with_retries;
use crate::llm::{translate_batch, Embedder, LLMClient, Reranker, Translator};
use crate::text;
use futures::Stream;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// External service clients the search pipeline depends on.
///
/// Reranker and translator are optional; without them their enrichment steps
/// are skipped.
#[derive(Clone)]
pub struct SearchServices {
    pub llm: Arc<dyn LLMClient>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub translator: Option<Arc<dyn Translator>>,
}

/// One search invocation
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub knowledge_base_id: String,
    pub workspace_id: String,
    pub search_content: String,
    /// Hybrid fuzzy + vector search; false falls back to plain substring
    pub ai_search: bool,
    /// Rows per store page; defaults to the configured batch size
    pub page_size: Option<usize>,
    /// How many store pages to consume before the stream ends
    pub page_delta: usize,
    /// Resume after this `(document_key, chunk_index)` row
    pub last_row_cursor: Option<(String, i64)>,
}

impl SearchRequest {
    pub fn new(
        knowledge_base_id: impl Into<String>,
        workspace_id: impl Into<String>,
        search_content: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.into(),
            workspace_id: workspace_id.into(),
            search_content: search_content.into(),
            ai_search: true,
            page_size: None,
            page_delta: 1,
            last_row_cursor: None,
        }
    }
}

/// Type-specific projection of a hit's location inside its document
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Highlight {
    Region {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        page_number: Option<i64>,
        width: Option<f64>,
        height: Option<f64>,
    },
    Span {
        from_idx: i64,
        to_idx: i64,
    },
    Cell {
        col: i64,
        row: i64,
    },
}

/// One search hit as delivered to the caller
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub markdown: String,
    pub id: String,
    pub chunk_idx: i64,
    pub file_url: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub file_name: String,
    pub highlight: Option<Highlight>,
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

/// One page of hits
pub type PageBatch = Vec<SearchHit>;

/// Lazy page stream over a search.
///
/// Pull pages with [`next_page`](Self::next_page); iteration is abortable
/// between pages by simply dropping the value.
pub struct SearchPages<'a> {
    db: &'a Database,
    services: SearchServices,
    config: SearchConfig,
    request: SearchRequest,
    plan: Option<Arc<SearchPlan>>,
    sentence_embeddings: Arc<Vec<Vec<f32>>>,
    page_size: usize,
    page_delta: usize,
    cursor: Option<SortKey>,
    pages_fetched: usize,
    finished: bool,
}

/// Run a cross-language search and return its page stream.
///
/// For an AI search this performs the query expansion (one LLM call, one
/// embedding batch) up front; pages are then produced on demand.
pub async fn cross_language_search<'a>(
    db: &'a Database,
    services: &SearchServices,
    config: &SearchConfig,
    request: SearchRequest,
) -> Result<SearchPages<'a>> {
    if request.workspace_id.trim().is_empty() || request.knowledge_base_id.trim().is_empty() {
        return Err(PolyseekError::InvalidRequest(
            "workspace_id and knowledge_base_id are required".to_string(),
        ));
    }
    if request.search_content.trim().is_empty() {
        return Err(PolyseekError::InvalidRequest("empty query".to_string()));
    }
    let page_size = request
        .page_size
        .unwrap_or(config.knowledge_base_search_batch_size);
    if page_size == 0 {
        return Err(PolyseekError::InvalidRequest(
            "page_size must be positive".to_string(),
        ));
    }
    if request.page_delta == 0 {
        return Err(PolyseekError::InvalidRequest(
            "page_delta must be positive".to_string(),
        ));
    }

    let plan = if request.ai_search {
        let mut expansion = expander::expand(
            services.llm.as_ref(),
            services.embedder.as_ref(),
            config,
            &request.search_content,
        )
        .await?;
        supplement_translations(&mut expansion, services, config).await;
        Some(Arc::new(classifier::build_plan(&expansion)))
    } else {
        None
    };
    let sentence_embeddings = Arc::new(
        plan.as_ref()
            .map(|p| p.sentence_embeddings.clone())
            .unwrap_or_default(),
    );

    let cursor = match &request.last_row_cursor {
        Some((document_key, chunk_index)) => {
            let key = db.sort_key_for_document(
                &request.workspace_id,
                &request.knowledge_base_id,
                document_key,
                *chunk_index,
            )?;
            Some(key.ok_or_else(|| {
                PolyseekError::InvalidRequest(format!("unknown cursor row: {}", document_key))
            })?)
        }
        None => None,
    };

    let page_delta = request.page_delta;
    Ok(SearchPages {
        db,
        services: services.clone(),
        config: config.clone(),
        request,
        plan,
        sentence_embeddings,
        page_size,
        page_delta,
        cursor,
        pages_fetched: 0,
        finished: false,
    })
}

/// When the LLM produced no translations for a non-English query, fill the
/// target bucket through the translator service. Fail-open: a missing
/// translation only narrows the search.
async fn supplement_translations(
    expansion: &mut SearchExpansion,
    services: &SearchServices,
    config: &SearchConfig,
) {
    if expansion.is_english || !expansion.translations.is_empty() {
        return;
    }
    let Some(translator) = &services.translator else {
        return;
    };

    let translated = translate_batch(
        Arc::clone(translator),
        &expansion.synonyms,
        "en",
        4,
        config.max_retries,
        config.retry_delay(),
    )
    .await;
    let texts: Vec<String> = translated
        .into_iter()
        .flatten()
        .map(|t| t.text)
        .filter(|t| !t.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if texts.is_empty() {
        return;
    }

    match services.embedder.embed_batch(&texts).await {
        Ok(embeddings) if embeddings.len() == texts.len() => {
            expansion.translations.extend(texts);
            expansion.translation_embeddings.extend(embeddings);
        }
        _ => {
            tracing::warn!("embedding translated queries failed, continuing without translations");
        }
    }
}

impl<'a> SearchPages<'a> {
    /// Fetch, assemble and return the next non-empty page, or `None` when
    /// the scan is exhausted or the page delta is consumed. Store pages that
    /// assemble to zero hits advance the cursor without being yielded.
    pub async fn next_page(&mut self) -> Result<Option<PageBatch>> {
        while !self.finished && self.pages_fetched < self.page_delta {
            let final_delta_page = self.pages_fetched + 1 == self.page_delta;
            // the final page probes one extra row to detect hasMore
            let limit = self.page_size + usize::from(final_delta_page);

            if let Some(plan) = &self.plan {
                self.db.register_match_function(Arc::clone(plan))?;
                if !self.sentence_embeddings.is_empty() {
                    self.db.register_cosine_function(
                        Arc::clone(&self.sentence_embeddings),
                        self.config.use_half_vec,
                    )?;
                }
            }

            let filter = self.page_filter();
            let cursor = self.cursor.clone();
            let db = self.db;
            let mut rows = with_retries(
                || {
                    let outcome = db
                        .fetch_candidate_page(&filter, cursor.as_ref(), limit)
                        .map_err(|e| PolyseekError::StoreUnavailable(e.to_string()));
                    async move { outcome }
                },
                self.config.max_retries,
                self.config.retry_delay(),
            )
            .await?;

            self.pages_fetched += 1;
            if rows.is_empty() {
                self.finished = true;
                break;
            }
            let mut has_more = false;
            if final_delta_page && rows.len() > self.page_size {
                has_more = true;
                rows.truncate(self.page_size);
            } else if rows.len() < limit {
                // short page: nothing left after these rows
                self.finished = true;
            }
            self.cursor = rows.last().map(|row| SortKey::for_item(&row.item));

            tracing::debug!(
                rows = rows.len(),
                page = self.pages_fetched,
                has_more,
                "store page fetched"
            );

            let mut hits = if self.request.ai_search {
                self.assemble_ai(rows).await?
            } else {
                self.assemble_plain(rows)?
            };
            if has_more {
                if let Some(last) = hits.last_mut() {
                    last.has_more = Some(true);
                }
            }
            if !hits.is_empty() {
                return Ok(Some(hits));
            }
        }
        Ok(None)
    }

    /// Adapt the pull-based pager into a `futures::Stream` of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<PageBatch>> + 'a {
        futures::stream::unfold(self, |mut pages| async move {
            match pages.next_page().await {
                Ok(Some(batch)) => Some((Ok(batch), pages)),
                Ok(None) => None,
                Err(e) => {
                    pages.finished = true;
                    Some((Err(e), pages))
                }
            }
        })
    }

    fn page_filter(&self) -> PageFilter {
        let mode = if self.request.ai_search {
            PageFilterMode::Fuzzy {
                with_cosine: !self.sentence_embeddings.is_empty(),
            }
        } else {
            PageFilterMode::substring(&self.request.search_content)
        };
        PageFilter {
            workspace_id: self.request.workspace_id.clone(),
            knowledge_base_id: self.request.knowledge_base_id.clone(),
            mode,
        }
    }

    async fn assemble_ai(&self, mut rows: Vec<CandidateRow>) -> Result<Vec<SearchHit>> {
        let Some(plan) = &self.plan else {
            return Ok(vec![]);
        };
        revalidate_page(&mut rows, plan, self.services.embedder.as_ref()).await;

        let mut exact: Vec<SearchHit> = Vec::new();
        let mut similar: Vec<(SearchHit, f64)> = Vec::new();
        for row in &rows {
            if let Some(snippet) = snippet_for_row(row) {
                exact.push(self.make_hit(&row.item, snippet));
            } else if let Some(distance) = row.cosine_distance {
                if distance < EMBEDDING_ONLY_MAX_DISTANCE && embedding_only_eligible(&row.item) {
                    similar.push((
                        self.make_hit(&row.item, row.item.text_normalized.clone()),
                        distance,
                    ));
                }
            }
        }
        similar.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        self.rerank_similar(&mut similar).await;

        exact.extend(similar.into_iter().map(|(hit, _)| hit));
        Ok(exact)
    }

    /// Optional post-filter: reorder the embedding-only tail by reranker
    /// relevance when a reranker is configured. Failures keep the cosine
    /// ordering.
    async fn rerank_similar(&self, similar: &mut Vec<(SearchHit, f64)>) {
        let Some(reranker) = &self.services.reranker else {
            return;
        };
        if similar.len() < 2 {
            return;
        }
        let documents: Vec<String> = similar.iter().map(|(hit, _)| hit.markdown.clone()).collect();
        let outcome = with_retries(
            || reranker.rerank(&self.request.search_content, &documents),
            self.config.max_retries,
            self.config.retry_delay(),
        )
        .await;
        match outcome {
            Ok(results) => {
                let mut reordered: Vec<(SearchHit, f64)> = Vec::with_capacity(similar.len());
                let mut taken = vec![false; similar.len()];
                for result in results {
                    if result.index < similar.len() && !taken[result.index] {
                        taken[result.index] = true;
                        reordered.push(similar[result.index].clone());
                    }
                }
                for (index, pair) in similar.iter().enumerate() {
                    if !taken[index] {
                        reordered.push(pair.clone());
                    }
                }
                *similar = reordered;
            }
            Err(e) => {
                tracing::warn!(error = %e, "rerank failed, keeping cosine-distance order");
            }
        }
    }

    fn assemble_plain(&self, rows: Vec<CandidateRow>) -> Result<Vec<SearchHit>> {
        let pattern = regex::RegexBuilder::new(&regex::escape(
            &self.request.search_content.to_lowercase(),
        ))
        .case_insensitive(true)
        .build()?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let markdown = pattern
                    .replace_all(&row.item.text_normalized, "<mark>${0}</mark>")
                    .into_owned();
                self.make_hit(&row.item, markdown)
            })
            .collect())
    }

    fn make_hit(&self, item: &Item, markdown: String) -> SearchHit {
        let markdown = if item.has_traditional_chinese {
            text::to_traditional_hk(&markdown)
        } else {
            markdown
        };
        SearchHit {
            markdown,
            id: item.document_key.clone(),
            chunk_idx: item.chunk_index,
            file_url: item.uri.clone(),
            file_type: file_extension(&item.uri, &item.item_type),
            file_name: item.file_name.clone(),
            highlight: highlight_for(item),
            has_more: None,
        }
    }
}

/// Highlighted snippet for a row, preferring the original column
fn snippet_for_row(row: &CandidateRow) -> Option<String> {
    let matches = row.matches.as_ref()?;
    let item = &row.item;

    let original = {
        let layout = TokenLayout {
            tokens: &item.token_list,
            starts: &item.token_start_index_list,
            ends: &item.token_end_index_list,
        };
        let keyword_indices = matches.original_token_indices.as_deref().unwrap_or(&[]);
        let spans = matches.original_spans.as_deref().unwrap_or(&[]);
        if keyword_indices.is_empty() && spans.is_empty() {
            None
        } else {
            let marked = marked_token_flags(layout, keyword_indices, spans);
            build_snippet(&item.text_normalized, layout, &marked, DEFAULT_CONTEXT_SIZE)
        }
    };
    if original.is_some() {
        return original;
    }

    let layout = TokenLayout {
        tokens: &item.translation_token_list,
        starts: &item.translation_token_start_index_list,
        ends: &item.translation_token_end_index_list,
    };
    let keyword_indices = matches.translation_token_indices.as_deref().unwrap_or(&[]);
    let spans = matches.translation_spans.as_deref().unwrap_or(&[]);
    if keyword_indices.is_empty() && spans.is_empty() {
        return None;
    }
    let marked = marked_token_flags(layout, keyword_indices, spans);
    build_snippet(&item.translation_normalized, layout, &marked, DEFAULT_CONTEXT_SIZE)
}

fn embedding_only_eligible(item: &Item) -> bool {
    matches!(item.chunk_type.as_str(), "text" | "list" | "table")
        && item.token_list.len() > 1
        && item.text_normalized.chars().count() > 6
        && !is_all_numeric(&item.text_normalized)
}

fn is_all_numeric(text: &str) -> bool {
    let stripped: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    !stripped.is_empty() && stripped.iter().all(|c| c.is_numeric())
}

fn file_extension(uri: &str, fallback: &str) -> String {
    uri.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, extension)| extension.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn highlight_for(item: &Item) -> Option<Highlight> {
    let bbox = item.bbox.as_ref()?;
    match item.item_type.as_str() {
        "pdf" | "image" => {
            if bbox.len() < 4 {
                return None;
            }
            Some(Highlight::Region {
                x1: bbox[0],
                y1: bbox[1],
                x2: bbox[2],
                y2: bbox[3],
                page_number: item.page_number,
                width: item.page_width,
                height: item.page_height,
            })
        }
        "md" | "txt" => {
            if bbox.len() < 2 {
                return None;
            }
            Some(Highlight::Span {
                from_idx: bbox[0] as i64,
                to_idx: bbox[1] as i64,
            })
        }
        "xlsx" => {
            if bbox.len() < 2 {
                return None;
            }
            Some(Highlight::Cell {
                col: bbox[0] as i64,
                row: bbox[1] as i64,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_extension_from_uri() {
        assert_eq!(file_extension("s3://bucket/report.pdf", "pdf"), "pdf");
        assert_eq!(file_extension("https://host/a/b/notes.md", "txt"), "md");
        assert_eq!(file_extension("s3://bucket/no-extension", "image"), "image");
    }

    #[test]
    fn numeric_text_detection() {
        assert!(is_all_numeric("123 456"));
        assert!(is_all_numeric(" 42\t7 "));
        assert!(!is_all_numeric("12a"));
        assert!(!is_all_numeric("   "));
    }

    #[test]
    fn embedding_only_gate() {
        let mut item = Item::fixture();
        item.chunk_type = "text".to_string();
        assert!(embedding_only_eligible(&item));

        item.chunk_type = "excel_sheet".to_string();
        assert!(!embedding_only_eligible(&item));

        let mut short = Item::fixture();
        let (normalized, tokens, starts, ends) = crate::text::normalize_tokenize("a b");
        short.text_normalized = normalized;
        short.token_list = tokens;
        short.token_start_index_list = starts;
        short.token_end_index_list = ends;
        assert!(!embedding_only_eligible(&short));

        let mut numeric = Item::fixture();
        let (normalized, tokens, starts, ends) = crate::text::normalize_tokenize("123 456 789");
        numeric.text_normalized = normalized;
        numeric.token_list = tokens;
        numeric.token_start_index_list = starts;
        numeric.token_end_index_list = ends;
        assert!(!embedding_only_eligible(&numeric));
    }

    #[test]
    fn highlight_projection_by_type() {
        let mut item = Item::fixture();
        item.item_type = "pdf".to_string();
        item.bbox = Some(vec![0.1, 0.2, 0.3, 0.4]);
        item.page_number = Some(2);
        assert!(matches!(
            highlight_for(&item),
            Some(Highlight::Region { page_number: Some(2), .. })
        ));

        item.item_type = "md".to_string();
        item.bbox = Some(vec![5.0, 90.0]);
        assert!(matches!(
            highlight_for(&item),
            Some(Highlight::Span { from_idx: 5, to_idx: 90 })
        ));

        item.item_type = "xlsx".to_string();
        item.bbox = Some(vec![2.0, 14.0]);
        assert!(matches!(
            highlight_for(&item),
            Some(Highlight::Cell { col: 2, row: 14 })
        ));

        item.bbox = None;
        assert!(highlight_for(&item).is_none());
    }
}
