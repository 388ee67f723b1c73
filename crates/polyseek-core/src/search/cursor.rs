//! Canonical result ordering and keyset cursor
//!
//! Rows sort by an 8-key compound tuple: `(type, file_name, page_number,
//! bbox_major, bbox_minor, bbox_end_desc, bbox_end_asc, chunk_index)`. For
//! PDF and image chunks the bbox keys encode reading order in page
//! coordinates (descending y1, then ascending x1 — PDF y grows upward, so
//! descending y is top of page first); for other types they fall back to the
//! raw bbox prefix. The cursor is the last row's key; the next page applies
//! a strict row-value `>` over the same expressions, so pagination is
//! stateless and immune to offset drift.

use crate::db::Item;
use rusqlite::types::Value;
use std::cmp::Ordering;

/// SQL expressions for the eight sort keys, in order. The same expressions
/// back ORDER BY, the keyset predicate and cursor resolution, so the store
/// and `SortKey::for_item` can never disagree.
pub const SORT_KEY_SQL: [&str; 8] = [
    "type",
    "file_name",
    "COALESCE(page_number, -1)",
    "CASE WHEN type IN ('pdf','image') \
       THEN -COALESCE(CAST(json_extract(bbox,'$[1]') AS REAL), -1.0) \
       ELSE COALESCE(CAST(json_extract(bbox,'$[0]') AS REAL), -1.0) END",
    "CASE WHEN type IN ('pdf','image') \
       THEN COALESCE(CAST(json_extract(bbox,'$[0]') AS REAL), -1.0) \
       ELSE COALESCE(CAST(json_extract(bbox,'$[1]') AS REAL), -1.0) END",
    "-COALESCE(CAST(json_extract(bbox,'$[3]') AS REAL), -1.0)",
    "COALESCE(CAST(json_extract(bbox,'$[2]') AS REAL), -1.0)",
    "chunk_index",
];

/// One row's position in the canonical ordering
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub item_type: String,
    pub file_name: String,
    pub page_number: i64,
    pub bbox_major: f64,
    pub bbox_minor: f64,
    pub bbox_end_desc: f64,
    pub bbox_end_asc: f64,
    pub chunk_index: i64,
}

fn bbox_value(bbox: &Option<Vec<f64>>, index: usize) -> f64 {
    bbox.as_ref()
        .and_then(|b| b.get(index))
        .copied()
        .unwrap_or(-1.0)
}

impl SortKey {
    /// Compute the key for an item, mirroring `SORT_KEY_SQL` exactly
    pub fn for_item(item: &Item) -> Self {
        let pdf_like = matches!(item.item_type.as_str(), "pdf" | "image");
        let (bbox_major, bbox_minor) = if pdf_like {
            (-bbox_value(&item.bbox, 1), bbox_value(&item.bbox, 0))
        } else {
            (bbox_value(&item.bbox, 0), bbox_value(&item.bbox, 1))
        };
        Self {
            item_type: item.item_type.clone(),
            file_name: item.file_name.clone(),
            page_number: item.page_number.unwrap_or(-1),
            bbox_major,
            bbox_minor,
            bbox_end_desc: -bbox_value(&item.bbox, 3),
            bbox_end_asc: bbox_value(&item.bbox, 2),
            chunk_index: item.chunk_index,
        }
    }

    /// Lexicographic comparison over the eight keys
    pub fn compare(&self, other: &Self) -> Ordering {
        self.item_type
            .cmp(&other.item_type)
            .then_with(|| self.file_name.cmp(&other.file_name))
            .then_with(|| self.page_number.cmp(&other.page_number))
            .then_with(|| cmp_f64(self.bbox_major, other.bbox_major))
            .then_with(|| cmp_f64(self.bbox_minor, other.bbox_minor))
            .then_with(|| cmp_f64(self.bbox_end_desc, other.bbox_end_desc))
            .then_with(|| cmp_f64(self.bbox_end_asc, other.bbox_end_asc))
            .then_with(|| self.chunk_index.cmp(&other.chunk_index))
    }

    /// Key values as SQL parameters for the keyset predicate
    pub fn to_sql_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.item_type.clone()),
            Value::Text(self.file_name.clone()),
            Value::Integer(self.page_number),
            Value::Real(self.bbox_major),
            Value::Real(self.bbox_minor),
            Value::Real(self.bbox_end_desc),
            Value::Real(self.bbox_end_asc),
            Value::Integer(self.chunk_index),
        ]
    }
}

// SQLite REAL comparison treats -0.0 == 0.0 and never sees NaN here, so
// partial_cmp with an Equal fallback matches the store.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Comma-joined sort expressions aliased `sort_1..sort_8` for a subquery
/// projection
pub fn sort_key_projection() -> String {
    SORT_KEY_SQL
        .iter()
        .enumerate()
        .map(|(i, expr)| format!("{} AS sort_{}", expr, i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `sort_1, ..., sort_8` column list for ORDER BY and row-value predicates
pub fn sort_key_columns() -> String {
    (1..=8)
        .map(|i| format!("sort_{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
