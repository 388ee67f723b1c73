//! End-to-end search pipeline tests over an in-memory store with mock
//! inference services

use async_trait::async_trait;
use polyseek_core::search::SortKey;
use polyseek_core::{
    cross_language_search, text, Database, Embedder, Item, LLMClient, PolyseekError, RerankResult,
    Reranker, Result, SearchConfig, SearchRequest, SearchServices,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

struct MockLlm {
    response: serde_json::Value,
}

#[async_trait]
impl LLMClient for MockLlm {
    async fn complete_json(&self, _prompt: &str, _max_tokens: u32) -> Result<serde_json::Value> {
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

struct MockEmbedder {
    overrides: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
}

impl MockEmbedder {
    fn uniform() -> Self {
        Self {
            overrides: HashMap::new(),
            default: vec![1.0, 0.0, 0.0, 0.0],
        }
    }

    fn lookup(&self, item_text: &str) -> Vec<f32> {
        self.overrides
            .get(item_text)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, item_text: &str) -> Result<Vec<f32>> {
        Ok(self.lookup(item_text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

struct ReversingReranker;

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(&self, _query: &str, documents: &[String]) -> Result<Vec<RerankResult>> {
        Ok((0..documents.len())
            .map(|i| RerankResult {
                index: documents.len() - 1 - i,
                relevance_score: 1.0 - 0.1 * i as f64,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-rerank"
    }
}

fn make_item(document_key: &str, chunk_index: i64, raw_text: &str) -> Item {
    let has_traditional = text::has_traditional_chinese(raw_text);
    let (normalized, tokens, starts, ends) = text::normalize_tokenize(raw_text);
    Item {
        document_key: document_key.to_string(),
        chunk_index,
        workspace_id: "ws".to_string(),
        knowledge_base_id: "kb".to_string(),
        file_name: format!("{}.md", document_key),
        uri: format!("s3://corpus/{}.md", document_key),
        item_type: "md".to_string(),
        chunk_type: "text".to_string(),
        page_number: None,
        page_width: None,
        page_height: None,
        bbox: None,
        text_normalized: normalized,
        has_traditional_chinese: has_traditional,
        token_list: tokens,
        token_start_index_list: starts,
        token_end_index_list: ends,
        translation_normalized: String::new(),
        translation_token_list: vec![],
        translation_token_start_index_list: vec![],
        translation_token_end_index_list: vec![],
        vector: None,
    }
}

fn with_translation(mut item: Item, raw_translation: &str) -> Item {
    let (normalized, tokens, starts, ends) = text::normalize_tokenize(raw_translation);
    item.translation_normalized = normalized;
    item.translation_token_list = tokens;
    item.translation_token_start_index_list = starts;
    item.translation_token_end_index_list = ends;
    item
}

fn test_config() -> SearchConfig {
    SearchConfig {
        embedding_dimension: 4,
        use_half_vec: true,
        knowledge_base_search_batch_size: 100,
        max_retries: 1,
        retry_delay_seconds: 0.01,
    }
}

fn mock_services(llm_response: serde_json::Value) -> SearchServices {
    SearchServices {
        llm: Arc::new(MockLlm {
            response: llm_response,
        }),
        embedder: Arc::new(MockEmbedder::uniform()),
        reranker: None,
        translator: None,
    }
}

fn no_expansion_response() -> serde_json::Value {
    json!({ "synonym_list": [], "is_english": true, "translation_list": [] })
}

/// Unit vector at the given cosine distance from [1, 0, 0, 0]
fn vec_at_distance(distance: f32) -> Vec<f32> {
    let c = 1.0 - distance;
    vec![c, (1.0 - c * c).max(0.0).sqrt(), 0.0, 0.0]
}

fn seeded_db(items: &[Item], use_half_vec: bool) -> Database {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    for item in items {
        db.insert_item(item, use_half_vec).unwrap();
    }
    db
}

#[tokio::test]
async fn fuzzy_keyword_typo_produces_highlighted_snippet() {
    let item = make_item("fox-1", 0, "The quick brown fox!");
    let db = seeded_db(&[item], true);
    let services = mock_services(json!({
        "synonym_list": ["speedy", "rapid"],
        "is_english": true,
        "translation_list": []
    }));

    let request = SearchRequest::new("kb", "ws", "quik");
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].markdown, "the <mark>quick</mark> brown fox");
    assert_eq!(page[0].id, "fox-1");
    assert_eq!(page[0].chunk_idx, 0);
    assert_eq!(page[0].file_type, "md");
    assert_eq!(page[0].file_name, "fox-1.md");
    assert!(page[0].highlight.is_none());
    assert!(page[0].has_more.is_none());
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn chinese_query_converts_snippet_back_to_traditional() {
    let item = make_item("zh-1", 0, "機器學習簡介");
    assert!(item.has_traditional_chinese);
    let db = seeded_db(&[item], true);
    let services = mock_services(json!({
        "synonym_list": [],
        "is_english": false,
        "translation_list": ["machine learning"]
    }));

    let request = SearchRequest::new("kb", "ws", "機器學習");
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].markdown, "<mark>機器學習</mark>簡介");
}

#[tokio::test]
async fn english_query_matches_translation_column() {
    let item = with_translation(
        make_item("trans-1", 0, "翻译测试文本"),
        "Translation test text!",
    );
    let db = seeded_db(&[item], true);
    let services = mock_services(json!({
        "synonym_list": ["translation test"],
        "is_english": true,
        "translation_list": []
    }));

    let request = SearchRequest::new("kb", "ws", "translation test");
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].markdown, "<mark>translation test</mark> text");
}

#[tokio::test]
async fn embedding_only_rows_gate_and_sort_by_distance() {
    // Store order (by file name) carries distances out of order; the
    // assembler must reorder by ascending distance and the 0.4 gate must
    // drop the last row.
    let mut a = make_item("sim-a", 0, "alpha beta gamma one");
    a.vector = Some(vec_at_distance(0.39));
    let mut b = make_item("sim-b", 0, "delta epsilon omega two");
    b.vector = Some(vec_at_distance(0.10));
    let mut c = make_item("sim-c", 0, "theta iota kappa three");
    c.vector = Some(vec_at_distance(0.41));
    let mut d = make_item("sim-d", 0, "lambda mu nu four");
    d.vector = Some(vec_at_distance(0.25));
    let db = seeded_db(&[a, b, c, d], true);

    let services = mock_services(no_expansion_response());
    let mut request = SearchRequest::new("kb", "ws", "q");
    request.page_size = Some(3);
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    let ids: Vec<&str> = page.iter().map(|hit| hit.id.as_str()).collect();
    assert_eq!(ids, vec!["sim-b", "sim-d", "sim-a"]);
    assert!(page.last().unwrap().has_more.is_none());
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn pages_follow_canonical_order_without_duplicates() {
    let mut items = Vec::new();

    let mut pdf_high = make_item("pdf-high", 0, "portable document upper block");
    pdf_high.item_type = "pdf".to_string();
    pdf_high.file_name = "report.pdf".to_string();
    pdf_high.page_number = Some(1);
    pdf_high.bbox = Some(vec![0.1, 0.6, 0.4, 0.9]);
    items.push(pdf_high);

    let mut pdf_low = make_item("pdf-low", 1, "portable document lower block");
    pdf_low.item_type = "pdf".to_string();
    pdf_low.file_name = "report.pdf".to_string();
    pdf_low.page_number = Some(1);
    pdf_low.bbox = Some(vec![0.1, 0.2, 0.4, 0.5]);
    items.push(pdf_low);

    let mut md_one = make_item("md-one", 0, "first markdown section body");
    md_one.file_name = "notes.md".to_string();
    md_one.bbox = Some(vec![0.0, 40.0]);
    items.push(md_one);

    let mut md_two = make_item("md-two", 1, "second markdown section body");
    md_two.file_name = "notes.md".to_string();
    md_two.bbox = Some(vec![50.0, 90.0]);
    items.push(md_two);

    let mut image = make_item("img-one", 0, "caption under the figure");
    image.item_type = "image".to_string();
    image.file_name = "figure.png".to_string();
    image.bbox = Some(vec![0.2, 0.3, 0.8, 0.7]);
    items.push(image);

    let mut txt_one = make_item("txt-one", 0, "plain body paragraph one");
    txt_one.item_type = "txt".to_string();
    txt_one.file_name = "body.txt".to_string();
    items.push(txt_one);

    let mut txt_two = make_item("txt-two", 1, "plain body paragraph two");
    txt_two.item_type = "txt".to_string();
    txt_two.file_name = "body.txt".to_string();
    items.push(txt_two);

    let mut sheet = make_item("sheet-one", 0, "quarterly revenue summary table");
    sheet.item_type = "xlsx".to_string();
    sheet.file_name = "numbers.xlsx".to_string();
    sheet.bbox = Some(vec![2.0, 14.0]);
    items.push(sheet);

    for item in items.iter_mut() {
        item.vector = Some(vec![1.0, 0.0, 0.0, 0.0]);
    }
    let db = seeded_db(&items, true);
    let by_key: HashMap<String, Item> = items
        .iter()
        .map(|item| (item.document_key.clone(), item.clone()))
        .collect();

    let services = mock_services(no_expansion_response());
    let mut request = SearchRequest::new("kb", "ws", "zzz");
    request.page_size = Some(3);
    request.page_delta = 5;
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();

    let mut page_sizes = Vec::new();
    let mut all_ids: Vec<String> = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        page_sizes.push(page.len());
        all_ids.extend(page.iter().map(|hit| hit.id.clone()));
    }
    assert_eq!(page_sizes, vec![3, 3, 2]);
    assert_eq!(all_ids.len(), items.len());

    // no duplicates
    let unique: std::collections::HashSet<&String> = all_ids.iter().collect();
    assert_eq!(unique.len(), all_ids.len());

    // strictly increasing under the 8-key comparator across page boundaries
    let keys: Vec<SortKey> = all_ids
        .iter()
        .map(|id| SortKey::for_item(&by_key[id]))
        .collect();
    for pair in keys.windows(2) {
        assert_eq!(
            pair[0].compare(&pair[1]),
            std::cmp::Ordering::Less,
            "ordering violated around {:?}",
            pair
        );
    }

    // PDF reading order: the block higher on the page (larger y) first
    let high_pos = all_ids.iter().position(|id| id == "pdf-high").unwrap();
    let low_pos = all_ids.iter().position(|id| id == "pdf-low").unwrap();
    assert!(high_pos < low_pos);
}

#[tokio::test]
async fn cursor_round_trip_resumes_at_second_page() {
    let mut items = Vec::new();
    for index in 0..5 {
        let mut item = make_item(
            &format!("doc-{}", index),
            index,
            &format!("common topic number {}", index),
        );
        item.file_name = "shared.md".to_string();
        item.bbox = Some(vec![index as f64 * 10.0, index as f64 * 10.0 + 5.0]);
        items.push(item);
    }
    let db = seeded_db(&items, true);
    let services = mock_services(no_expansion_response());
    let config = test_config();

    // Uncursored scan of two pages
    let mut request = SearchRequest::new("kb", "ws", "common");
    request.ai_search = false;
    request.page_size = Some(2);
    request.page_delta = 2;
    let mut pages = cross_language_search(&db, &services, &config, request)
        .await
        .unwrap();
    let first = pages.next_page().await.unwrap().unwrap();
    let second = pages.next_page().await.unwrap().unwrap();
    assert!(pages.next_page().await.unwrap().is_none());
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    // delta boundary probe marks continuation on the very last hit
    assert_eq!(second.last().unwrap().has_more, Some(true));

    // One page, then resume from its last row
    let mut request = SearchRequest::new("kb", "ws", "common");
    request.ai_search = false;
    request.page_size = Some(2);
    let mut pages = cross_language_search(&db, &services, &config, request)
        .await
        .unwrap();
    let page_one = pages.next_page().await.unwrap().unwrap();
    assert_eq!(
        page_one.iter().map(|h| h.id.clone()).collect::<Vec<_>>(),
        first.iter().map(|h| h.id.clone()).collect::<Vec<_>>()
    );
    let last = page_one.last().unwrap();
    assert_eq!(last.has_more, Some(true));

    let mut resumed = SearchRequest::new("kb", "ws", "common");
    resumed.ai_search = false;
    resumed.page_size = Some(2);
    resumed.last_row_cursor = Some((last.id.clone(), last.chunk_idx));
    let mut pages = cross_language_search(&db, &services, &config, resumed)
        .await
        .unwrap();
    let resumed_page = pages.next_page().await.unwrap().unwrap();
    assert_eq!(
        resumed_page.iter().map(|h| h.id.clone()).collect::<Vec<_>>(),
        second.iter().map(|h| h.id.clone()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn plain_search_wraps_every_occurrence() {
    let item = make_item("plain-1", 0, "Common things in a common place");
    let db = seeded_db(&[item], true);
    let services = mock_services(no_expansion_response());

    let mut request = SearchRequest::new("kb", "ws", "common");
    request.ai_search = false;
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    assert_eq!(
        page[0].markdown,
        "<mark>common</mark> things in a <mark>common</mark> place"
    );
}

#[tokio::test]
async fn reranker_reorders_embedding_only_tail() {
    let mut a = make_item("rr-a", 0, "first semantic candidate text");
    a.vector = Some(vec_at_distance(0.10));
    let mut b = make_item("rr-b", 0, "second semantic candidate text");
    b.vector = Some(vec_at_distance(0.20));
    let mut c = make_item("rr-c", 0, "third semantic candidate text");
    c.vector = Some(vec_at_distance(0.30));
    let db = seeded_db(&[a, b, c], true);

    let mut services = mock_services(no_expansion_response());
    services.reranker = Some(Arc::new(ReversingReranker));

    let request = SearchRequest::new("kb", "ws", "zzz");
    let mut pages = cross_language_search(&db, &services, &test_config(), request)
        .await
        .unwrap();
    let page = pages.next_page().await.unwrap().unwrap();
    let ids: Vec<&str> = page.iter().map(|hit| hit.id.as_str()).collect();
    assert_eq!(ids, vec!["rr-c", "rr-b", "rr-a"]);
}

#[tokio::test]
async fn invalid_requests_fail_fast() {
    let db = seeded_db(&[], true);
    let services = mock_services(no_expansion_response());
    let config = test_config();

    let request = SearchRequest::new("kb", "ws", "   ");
    let err = cross_language_search(&db, &services, &config, request)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PolyseekError::InvalidRequest(_)));

    let request = SearchRequest::new("kb", "", "query");
    let err = cross_language_search(&db, &services, &config, request)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PolyseekError::InvalidRequest(_)));

    let mut request = SearchRequest::new("kb", "ws", "query");
    request.page_delta = 0;
    let err = cross_language_search(&db, &services, &config, request)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PolyseekError::InvalidRequest(_)));

    let mut request = SearchRequest::new("kb", "ws", "query");
    request.ai_search = false;
    request.last_row_cursor = Some(("ghost".to_string(), 0));
    let err = cross_language_search(&db, &services, &config, request)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PolyseekError::InvalidRequest(_)));
}
