use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bulle_types::{LanguageCode, ResolvedPair};
use serde::Deserialize;

use crate::{LanguageIdentifier, TranslateError, Translation, Translator, TranslatorFactory};

const PROVIDER: &str = "deepl";

/// Languages DeepL accepts on both sides
const SUPPORTED: &[&str] = &[
    "ar", "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja",
    "ko", "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh",
];

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
    detected_source_language: Option<String>,
}

fn base_language(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

pub fn supports(pair: &ResolvedPair) -> bool {
    let source = base_language(&pair.source);
    let target = base_language(&pair.target);
    source != target && SUPPORTED.contains(&source) && SUPPORTED.contains(&target)
}

fn parse_response(body: &str) -> Result<DeepLTranslation, TranslateError> {
    let response: DeepLResponse = serde_json::from_str(body)
        .map_err(|e| TranslateError::ApiError(format!("Failed to parse response: {}", e)))?;

    response
        .translations
        .into_iter()
        .next()
        .ok_or_else(|| TranslateError::ApiError("No translation in response".to_string()))
}

/// 456 is DeepL's "quota exceeded"
fn status_error(status: reqwest::StatusCode) -> Option<TranslateError> {
    match status.as_u16() {
        429 | 456 => Some(TranslateError::RateLimitExceeded),
        403 => Some(TranslateError::AuthenticationError),
        _ if !status.is_success() => Some(TranslateError::ApiError(format!("HTTP {}", status))),
        _ => None,
    }
}

async fn post(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    params: &[(&str, &str)],
) -> Result<DeepLTranslation, TranslateError> {
    if api_key.is_empty() {
        return Err(TranslateError::AuthenticationError);
    }

    let response = client
        .post(api_url)
        .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
        .form(params)
        .send()
        .await?;

    if let Some(error) = status_error(response.status()) {
        return Err(error);
    }

    let body = response.text().await?;
    parse_response(&body)
}

/// DeepL client bound to one language pair
pub struct DeepLTranslator {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    pair: ResolvedPair,
    closed: AtomicBool,
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(&self, text: &str) -> Result<Translation, TranslateError> {
        if self.is_closed() {
            return Err(TranslateError::Closed);
        }

        let source = base_language(&self.pair.source).to_uppercase();
        let target = self.pair.target.to_uppercase();
        let params = [
            ("text", text),
            ("source_lang", source.as_str()),
            ("target_lang", target.as_str()),
        ];

        let translated = post(&self.client, &self.api_url, &self.api_key, &params).await?;

        Ok(Translation {
            text: translated.text,
            from: self.pair.source.clone(),
            to: self.pair.target.clone(),
            provider: PROVIDER.to_string(),
        })
    }

    fn pair(&self) -> &ResolvedPair {
        &self.pair
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("closed DeepL translator {}", self.pair);
        }
    }
}

/// Hands out [`DeepLTranslator`]s sharing one HTTP client
#[derive(Clone)]
pub struct DeepLFactory {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl DeepLFactory {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
        }
    }

    pub fn identifier(&self) -> DeepLIdentifier {
        DeepLIdentifier {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

#[async_trait]
impl TranslatorFactory for DeepLFactory {
    async fn create(&self, pair: &ResolvedPair) -> Result<Arc<dyn Translator>, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::AuthenticationError);
        }
        if !supports(pair) {
            return Err(TranslateError::UnsupportedLanguagePair {
                from: pair.source.clone(),
                to: pair.target.clone(),
            });
        }

        tracing::info!("configured DeepL translator {}", pair);
        Ok(Arc::new(DeepLTranslator {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            api_url: self.api_url.clone(),
            pair: pair.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Uses the source language DeepL detects while translating to English
pub struct DeepLIdentifier {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

#[async_trait]
impl LanguageIdentifier for DeepLIdentifier {
    async fn identify(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        let params = [("text", text), ("target_lang", "EN")];
        let translated = post(&self.client, &self.api_url, &self.api_key, &params).await?;

        translated
            .detected_source_language
            .map(|code| code.to_lowercase())
            .ok_or_else(|| TranslateError::Undetermined("No detected language".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{"translations":[{"detected_source_language":"FR","text":"Hello"}]}"#;
        let translation = parse_response(body).unwrap();
        assert_eq!(translation.text, "Hello");
        assert_eq!(translation.detected_source_language.as_deref(), Some("FR"));
    }

    #[test]
    fn test_parse_response_without_translations() {
        assert!(matches!(
            parse_response(r#"{"translations":[]}"#),
            Err(TranslateError::ApiError(_))
        ));
        assert!(matches!(
            parse_response("<html>"),
            Err(TranslateError::ApiError(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        let status = |code| status_error(reqwest::StatusCode::from_u16(code).unwrap());
        assert!(status(200).is_none());
        assert!(matches!(status(429), Some(TranslateError::RateLimitExceeded)));
        assert!(matches!(status(456), Some(TranslateError::RateLimitExceeded)));
        assert!(matches!(status(403), Some(TranslateError::AuthenticationError)));
        assert!(matches!(status(500), Some(TranslateError::ApiError(msg)) if msg.contains("500")));
    }

    #[test]
    fn test_supported_pairs() {
        assert!(supports(&ResolvedPair::new("fr", "en")));
        assert!(supports(&ResolvedPair::new("pt-br", "en")));
        assert!(!supports(&ResolvedPair::new("en", "en")));
        assert!(!supports(&ResolvedPair::new("xx", "en")));
    }

    #[tokio::test]
    async fn test_factory_requires_api_key() {
        let factory = DeepLFactory::new(String::new(), "http://localhost:1".to_string());
        let result = factory.create(&ResolvedPair::new("fr", "en")).await;
        assert!(matches!(result, Err(TranslateError::AuthenticationError)));
    }

    #[tokio::test]
    async fn test_closed_translator_rejects_calls() {
        let factory = DeepLFactory::new("key".to_string(), "http://localhost:1".to_string());
        let translator = factory.create(&ResolvedPair::new("fr", "en")).await.unwrap();
        assert_eq!(translator.pair(), &ResolvedPair::new("fr", "en"));

        translator.close();
        assert!(translator.is_closed());
        assert!(matches!(
            translator.translate("Bonjour").await,
            Err(TranslateError::Closed)
        ));
    }
}
