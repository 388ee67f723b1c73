//! HTTP translator client
//!
//! Header-addressed service: the model and entry point travel as headers,
//! the payload is a chat-style message list.

use super::{Translation, Translator};
use crate::config::ServiceConfig;
use crate::error::{PolyseekError, Result};
use crate::gather::gather_with_limit;
use crate::limiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh", "Chinese"),
    ("zh-t-hk", "Traditional Chinese - Hong Kong"),
    ("zh-s", "Simplified Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
];

fn language_name(code: &str) -> &str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Translator backed by an external HTTP service
pub struct HttpTranslator {
    http_client: reqwest::Client,
    config: ServiceConfig,
}

impl HttpTranslator {
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

    /// Create from `TRANSLATOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env("TRANSLATOR")?)
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, dest: &str) -> Result<Translation> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'static str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct TranslateRequest<'a> {
            messages: Vec<Message<'a>>,
        }

        #[derive(Deserialize)]
        struct TranslateResponse {
            text: String,
            #[serde(default)]
            src: Option<String>,
        }

        limiter::channel(crate::TRANSLATOR_CHANNEL).acquire().await;

        let prompt = format!(
            "Translate the following text into {}. Reply with the translation only.\n\n{}",
            language_name(dest),
            text
        );
        let request = TranslateRequest {
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        let mut req = self
            .http_client
            .post(&self.config.url)
            .header("Model-Name", &self.config.model)
            .json(&request);
        if let Some(ref entry_point) = self.config.entry_point {
            req = req.header("Entry-Point", entry_point);
        }
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(PolyseekError::Http)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PolyseekError::ExternalService(format!(
                "Translator service error (HTTP {}): {}",
                status, body
            )));
        }

        let translate_response: TranslateResponse =
            response.json().await.map_err(PolyseekError::Http)?;

        Ok(Translation {
            text: translate_response.text,
            src: translate_response.src.unwrap_or_else(|| "auto".to_string()),
            dest: dest.to_string(),
            origin: text.to_string(),
        })
    }
}

/// Translate a batch of texts with bounded concurrency.
///
/// A text whose translation permanently fails gets `None` in its slot.
pub async fn translate_batch(
    translator: Arc<dyn Translator>,
    texts: &[String],
    dest: &str,
    concurrency: usize,
    max_retries: u32,
    retry_delay: Duration,
) -> Vec<Option<Translation>> {
    let factories: Vec<_> = texts
        .iter()
        .map(|text| {
            let translator = Arc::clone(&translator);
            let text = text.clone();
            let dest = dest.to_string();
            move || {
                let translator = Arc::clone(&translator);
                let text = text.clone();
                let dest = dest.clone();
                async move { translator.translate(&text, &dest).await }
            }
        })
        .collect();
    gather_with_limit(factories, concurrency, max_retries, retry_delay).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names_resolve() {
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("zh-t-hk"), "Traditional Chinese - Hong Kong");
        assert_eq!(language_name("xx"), "xx");
    }
}
