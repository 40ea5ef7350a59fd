use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};

const TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
const MIN_TRANSLATION_LEN: usize = 10;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Passes text through untouched.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Uses the public Google Translate endpoint, source language auto-detected.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(TRANSLATE_API_URL)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Translation(format!("HTTP {}", response.status())));
        }

        let body: Value = response.json().await?;
        parse_translation(&body)
            .ok_or_else(|| AppError::Translation("unexpected response shape".to_string()))
    }
}

/// Joins the translated segments of a `translate_a/single` response.
fn parse_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Translates `text`, falling back to the original on any failure or on a
/// suspiciously short result. Never fails.
pub async fn translate_or_original(
    translator: &dyn Translator,
    text: &str,
    target_language: &str,
) -> String {
    match translator.translate(text, target_language).await {
        Ok(translated) if translated.trim().chars().count() >= MIN_TRANSLATION_LEN => translated,
        Ok(_) => {
            tracing::warn!("Translation to '{}' was too short, keeping original", target_language);
            text.to_string()
        }
        Err(e) => {
            tracing::error!("Translation to '{}' failed: {}", target_language, e);
            text.to_string()
        }
    }
}
