//! Database schema and initialization

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

/// Main database handle
pub struct Database {
    pub(crate) conn: Connection,
}

const CREATE_TABLES: &str = r#"
-- Document chunks with precomputed normalization, tokenization and embedding
CREATE TABLE IF NOT EXISTS items (
    document_key TEXT PRIMARY KEY,
    chunk_index INTEGER NOT NULL,
    workspace_id TEXT NOT NULL,
    knowledge_base_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    uri TEXT NOT NULL,
    type TEXT NOT NULL,
    chunk_type TEXT NOT NULL,
    page_number INTEGER,
    page_width REAL,
    page_height REAL,
    bbox TEXT,
    text_normalized TEXT NOT NULL,
    has_traditional_chinese INTEGER NOT NULL DEFAULT 0,
    token_list TEXT NOT NULL DEFAULT '[]',
    token_start_index_list TEXT NOT NULL DEFAULT '[]',
    token_end_index_list TEXT NOT NULL DEFAULT '[]',
    translation_normalized TEXT NOT NULL DEFAULT '',
    translation_token_list TEXT NOT NULL DEFAULT '[]',
    translation_token_start_index_list TEXT NOT NULL DEFAULT '[]',
    translation_token_end_index_list TEXT NOT NULL DEFAULT '[]',
    vector BLOB,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_scope
    ON items(workspace_id, knowledge_base_id);
"#;

impl Database {
    /// Open a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests and ephemeral corpora)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create tables and indexes if missing
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_TABLES)?;
        Ok(())
    }

    /// Number of items in a tenant scope
    pub fn count_items(&self, workspace_id: &str, knowledge_base_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE workspace_id = ?1 AND knowledge_base_id = ?2",
            rusqlite::params![workspace_id, knowledge_base_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
