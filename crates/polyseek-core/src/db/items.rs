//! Item storage and the paged hybrid query

use super::vectors;
use crate::db::Database;
use crate::error::Result;
use crate::search::cursor::{sort_key_columns, sort_key_projection, SortKey, SORT_KEY_SQL};
use crate::search::fuzzy::MatchColumns;
use crate::search::EMBEDDING_ONLY_MAX_DISTANCE;
use chrono::Utc;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// One stored document chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub document_key: String,
    pub chunk_index: i64,
    pub workspace_id: String,
    pub knowledge_base_id: String,
    pub file_name: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub chunk_type: String,
    pub page_number: Option<i64>,
    pub page_width: Option<f64>,
    pub page_height: Option<f64>,
    pub bbox: Option<Vec<f64>>,
    pub text_normalized: String,
    pub has_traditional_chinese: bool,
    pub token_list: Vec<String>,
    pub token_start_index_list: Vec<usize>,
    pub token_end_index_list: Vec<usize>,
    #[serde(default)]
    pub translation_normalized: String,
    #[serde(default)]
    pub translation_token_list: Vec<String>,
    #[serde(default)]
    pub translation_token_start_index_list: Vec<usize>,
    #[serde(default)]
    pub translation_token_end_index_list: Vec<usize>,
    #[serde(skip)]
    pub vector: Option<Vec<f32>>,
}

/// A row admitted by the paged query, with its match metadata
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub item: Item,
    pub matches: Option<MatchColumns>,
    pub cosine_distance: Option<f64>,
}

/// Tenant scope plus the per-request filter mode
#[derive(Debug, Clone)]
pub struct PageFilter {
    pub workspace_id: String,
    pub knowledge_base_id: String,
    pub mode: PageFilterMode,
}

/// How rows are admitted into a page
#[derive(Debug, Clone)]
pub enum PageFilterMode {
    /// AI search: in-database fuzzy match plus optional cosine filter.
    /// The match and cosine functions must be registered on the connection.
    Fuzzy { with_cosine: bool },
    /// Plain search: case-insensitive substring filter
    Substring { pattern: String },
}

impl PageFilterMode {
    /// Build a substring filter from a raw query, LIKE-escaped
    pub fn substring(query: &str) -> Self {
        let escaped = query
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Self::Substring {
            pattern: format!("%{}%", escaped),
        }
    }
}

struct RawRow {
    document_key: String,
    chunk_index: i64,
    workspace_id: String,
    knowledge_base_id: String,
    file_name: String,
    uri: String,
    item_type: String,
    chunk_type: String,
    page_number: Option<i64>,
    page_width: Option<f64>,
    page_height: Option<f64>,
    bbox: Option<String>,
    text_normalized: String,
    has_traditional_chinese: bool,
    token_list: String,
    token_start_index_list: String,
    token_end_index_list: String,
    translation_normalized: String,
    translation_token_list: String,
    translation_token_start_index_list: String,
    translation_token_end_index_list: String,
    match_result: Option<String>,
    cosine_distance: Option<f64>,
}

impl RawRow {
    fn into_candidate(self) -> Result<CandidateRow> {
        let item = Item {
            document_key: self.document_key,
            chunk_index: self.chunk_index,
            workspace_id: self.workspace_id,
            knowledge_base_id: self.knowledge_base_id,
            file_name: self.file_name,
            uri: self.uri,
            item_type: self.item_type,
            chunk_type: self.chunk_type,
            page_number: self.page_number,
            page_width: self.page_width,
            page_height: self.page_height,
            bbox: self.bbox.as_deref().map(serde_json::from_str).transpose()?,
            text_normalized: self.text_normalized,
            has_traditional_chinese: self.has_traditional_chinese,
            token_list: serde_json::from_str(&self.token_list)?,
            token_start_index_list: serde_json::from_str(&self.token_start_index_list)?,
            token_end_index_list: serde_json::from_str(&self.token_end_index_list)?,
            translation_normalized: self.translation_normalized,
            translation_token_list: serde_json::from_str(&self.translation_token_list)?,
            translation_token_start_index_list: serde_json::from_str(
                &self.translation_token_start_index_list,
            )?,
            translation_token_end_index_list: serde_json::from_str(
                &self.translation_token_end_index_list,
            )?,
            vector: None,
        };
        let matches = self
            .match_result
            .as_deref()
            .map(serde_json::from_str::<MatchColumns>)
            .transpose()?;
        Ok(CandidateRow {
            item,
            matches,
            cosine_distance: self.cosine_distance,
        })
    }
}

const ITEM_COLUMNS: &str = "document_key, chunk_index, workspace_id, knowledge_base_id, \
     file_name, uri, type, chunk_type, page_number, page_width, page_height, bbox, \
     text_normalized, has_traditional_chinese, token_list, token_start_index_list, \
     token_end_index_list, translation_normalized, translation_token_list, \
     translation_token_start_index_list, translation_token_end_index_list";

impl Database {
    /// Insert or replace an item (corpus loading; the search path never writes)
    pub fn insert_item(&self, item: &Item, use_half_vec: bool) -> Result<()> {
        let bbox_json = item
            .bbox
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let vector_blob = item
            .vector
            .as_ref()
            .map(|v| vectors::encode_vector(v, use_half_vec));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO items ({}, vector, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
                ITEM_COLUMNS
            ),
            rusqlite::params![
                item.document_key,
                item.chunk_index,
                item.workspace_id,
                item.knowledge_base_id,
                item.file_name,
                item.uri,
                item.item_type,
                item.chunk_type,
                item.page_number,
                item.page_width,
                item.page_height,
                bbox_json,
                item.text_normalized,
                item.has_traditional_chinese,
                serde_json::to_string(&item.token_list)?,
                serde_json::to_string(&item.token_start_index_list)?,
                serde_json::to_string(&item.token_end_index_list)?,
                item.translation_normalized,
                serde_json::to_string(&item.translation_token_list)?,
                serde_json::to_string(&item.translation_token_start_index_list)?,
                serde_json::to_string(&item.translation_token_end_index_list)?,
                vector_blob,
                now,
            ],
        )?;
        Ok(())
    }

    /// Fetch one page of admitted candidate rows in canonical order.
    ///
    /// For `Fuzzy` mode the match (and optionally cosine) functions must be
    /// registered on this connection for the current request. The keyset
    /// predicate and the ordering use the same sort-key expressions, so a
    /// cursored fetch resumes exactly after the cursor row.
    pub fn fetch_candidate_page(
        &self,
        filter: &PageFilter,
        cursor: Option<&SortKey>,
        limit: usize,
    ) -> Result<Vec<CandidateRow>> {
        let (match_expr, cosine_expr) = match &filter.mode {
            PageFilterMode::Fuzzy { with_cosine } => (
                "search_match(text_normalized, translation_normalized, token_list, \
                 token_start_index_list, token_end_index_list, translation_token_list, \
                 translation_token_start_index_list, translation_token_end_index_list)",
                if *with_cosine {
                    "query_cosine_distance(vector)"
                } else {
                    "NULL"
                },
            ),
            PageFilterMode::Substring { .. } => ("NULL", "NULL"),
        };

        let mut inner_where = String::from("workspace_id = ? AND knowledge_base_id = ?");
        if matches!(filter.mode, PageFilterMode::Substring { .. }) {
            inner_where.push_str(" AND text_normalized LIKE ? ESCAPE '\\'");
        }

        let mut outer_conditions: Vec<String> = Vec::new();
        if matches!(filter.mode, PageFilterMode::Fuzzy { .. }) {
            outer_conditions.push(format!(
                "(match_result IS NOT NULL OR (cosine_distance IS NOT NULL AND cosine_distance < {}))",
                EMBEDDING_ONLY_MAX_DISTANCE
            ));
        }
        if cursor.is_some() {
            outer_conditions.push(format!(
                "({}) > (?, ?, ?, ?, ?, ?, ?, ?)",
                sort_key_columns()
            ));
        }
        let outer_where = if outer_conditions.is_empty() {
            "1=1".to_string()
        } else {
            outer_conditions.join(" AND ")
        };

        let sql = format!(
            "SELECT {columns}, match_result, cosine_distance FROM ( \
                SELECT {columns}, {match_expr} AS match_result, \
                       {cosine_expr} AS cosine_distance, {projection} \
                FROM items WHERE {inner_where} \
             ) WHERE {outer_where} \
             ORDER BY {order} \
             LIMIT ?",
            columns = ITEM_COLUMNS,
            match_expr = match_expr,
            cosine_expr = cosine_expr,
            projection = sort_key_projection(),
            inner_where = inner_where,
            outer_where = outer_where,
            order = sort_key_columns(),
        );

        let mut params: Vec<Value> = vec![
            Value::Text(filter.workspace_id.clone()),
            Value::Text(filter.knowledge_base_id.clone()),
        ];
        if let PageFilterMode::Substring { pattern } = &filter.mode {
            params.push(Value::Text(pattern.clone()));
        }
        if let Some(cursor_key) = cursor {
            params.extend(cursor_key.to_sql_values());
        }
        params.push(Value::Integer(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok(RawRow {
                    document_key: row.get(0)?,
                    chunk_index: row.get(1)?,
                    workspace_id: row.get(2)?,
                    knowledge_base_id: row.get(3)?,
                    file_name: row.get(4)?,
                    uri: row.get(5)?,
                    item_type: row.get(6)?,
                    chunk_type: row.get(7)?,
                    page_number: row.get(8)?,
                    page_width: row.get(9)?,
                    page_height: row.get(10)?,
                    bbox: row.get(11)?,
                    text_normalized: row.get(12)?,
                    has_traditional_chinese: row.get(13)?,
                    token_list: row.get(14)?,
                    token_start_index_list: row.get(15)?,
                    token_end_index_list: row.get(16)?,
                    translation_normalized: row.get(17)?,
                    translation_token_list: row.get(18)?,
                    translation_token_start_index_list: row.get(19)?,
                    translation_token_end_index_list: row.get(20)?,
                    match_result: row.get(21)?,
                    cosine_distance: row.get(22)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(RawRow::into_candidate)
            .collect()
    }

    /// Resolve the sort key of a known row, for cursor resumption
    pub fn sort_key_for_document(
        &self,
        workspace_id: &str,
        knowledge_base_id: &str,
        document_key: &str,
        chunk_index: i64,
    ) -> Result<Option<SortKey>> {
        let sql = format!(
            "SELECT {} FROM items \
             WHERE workspace_id = ?1 AND knowledge_base_id = ?2 \
               AND document_key = ?3 AND chunk_index = ?4",
            SORT_KEY_SQL.join(", ")
        );
        let result = self.conn.query_row(
            &sql,
            rusqlite::params![workspace_id, knowledge_base_id, document_key, chunk_index],
            |row| {
                Ok(SortKey {
                    item_type: row.get(0)?,
                    file_name: row.get(1)?,
                    page_number: row.get(2)?,
                    bbox_major: row.get(3)?,
                    bbox_minor: row.get(4)?,
                    bbox_end_desc: row.get(5)?,
                    bbox_end_asc: row.get(6)?,
                    chunk_index: row.get(7)?,
                })
            },
        );
        match result {
            Ok(key) => Ok(Some(key)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
impl Item {
    /// Minimal valid item for unit tests; override fields as needed
    pub fn fixture() -> Self {
        use crate::text;
        let text = "fixture text body";
        let (normalized, tokens, starts, ends) = text::normalize_tokenize(text);
        Self {
            document_key: "doc-fixture".to_string(),
            chunk_index: 0,
            workspace_id: "ws".to_string(),
            knowledge_base_id: "kb".to_string(),
            file_name: "fixture.md".to_string(),
            uri: "s3://bucket/fixture.md".to_string(),
            item_type: "md".to_string(),
            chunk_type: "text".to_string(),
            page_number: None,
            page_width: None,
            page_height: None,
            bbox: None,
            text_normalized: normalized,
            has_traditional_chinese: false,
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
}
