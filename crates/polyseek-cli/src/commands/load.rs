//! Corpus loading from JSON lines
//!
//! A fixture loader for local corpora: normalization, tokenization and the
//! Traditional-Chinese flag are derived here with the same pipeline the
//! search engine matches against. Embeddings must be precomputed.

use crate::app::LoadArgs;
use anyhow::{Context, Result};
use polyseek_core::text;
use polyseek_core::{Database, Item};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(Debug, Deserialize)]
struct ItemInput {
    document_key: String,
    chunk_index: i64,
    file_name: String,
    uri: String,
    #[serde(rename = "type")]
    item_type: String,
    chunk_type: String,
    #[serde(default)]
    page_number: Option<i64>,
    #[serde(default)]
    page_width: Option<f64>,
    #[serde(default)]
    page_height: Option<f64>,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    text: String,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

pub async fn run(args: LoadArgs, db: &Database) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("open {}", args.file.display()))?;
    let reader = BufReader::new(file);

    let mut loaded = 0usize;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let input: ItemInput = serde_json::from_str(&line)
            .with_context(|| format!("line {}", line_number + 1))?;
        let item = build_item(input, &args.workspace, &args.knowledge_base);
        db.insert_item(&item, !args.full_precision)?;
        loaded += 1;
    }

    println!("loaded {} items into {}", loaded, args.knowledge_base);
    Ok(())
}

fn build_item(input: ItemInput, workspace_id: &str, knowledge_base_id: &str) -> Item {
    let has_traditional = text::has_traditional_chinese(&input.text);
    let (text_normalized, token_list, token_start_index_list, token_end_index_list) =
        text::normalize_tokenize(&input.text);
    let (
        translation_normalized,
        translation_token_list,
        translation_token_start_index_list,
        translation_token_end_index_list,
    ) = match &input.translation {
        Some(translation) => text::normalize_tokenize(translation),
        None => (String::new(), vec![], vec![], vec![]),
    };

    Item {
        document_key: input.document_key,
        chunk_index: input.chunk_index,
        workspace_id: workspace_id.to_string(),
        knowledge_base_id: knowledge_base_id.to_string(),
        file_name: input.file_name,
        uri: input.uri,
        item_type: input.item_type,
        chunk_type: input.chunk_type,
        page_number: input.page_number,
        page_width: input.page_width,
        page_height: input.page_height,
        bbox: input.bbox,
        text_normalized,
        has_traditional_chinese: has_traditional,
        token_list,
        token_start_index_list,
        token_end_index_list,
        translation_normalized,
        translation_token_list,
        translation_token_start_index_list,
        translation_token_end_index_list,
        vector: input.vector,
    }
}
