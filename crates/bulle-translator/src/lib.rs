use std::sync::Arc;

use bulle_types::{LanguageCode, ResolvedPair};

pub mod deepl;
pub mod identify;

pub use deepl::{DeepLFactory, DeepLIdentifier, DeepLTranslator};
pub use identify::WhatlangIdentifier;

/// A translator instance bound to one source -> target pair
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text from the configured source into the configured target
    async fn translate(&self, text: &str) -> Result<Translation, TranslateError>;

    /// Pair this instance was created for
    fn pair(&self) -> &ResolvedPair;

    /// A closed translator rejects every call with [`TranslateError::Closed`]
    fn is_closed(&self) -> bool {
        false
    }

    /// Release the underlying model or connection
    fn close(&self) {}
}

/// Creates translators; creation may download models and is therefore async
#[async_trait::async_trait]
pub trait TranslatorFactory: Send + Sync {
    async fn create(&self, pair: &ResolvedPair) -> Result<Arc<dyn Translator>, TranslateError>;
}

/// Identifies the language of a text sample
#[async_trait::async_trait]
pub trait LanguageIdentifier: Send + Sync {
    async fn identify(&self, text: &str) -> Result<LanguageCode, TranslateError>;
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub from: LanguageCode,
    pub to: LanguageCode,
    pub provider: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unsupported language pair: {from} -> {to}")]
    UnsupportedLanguagePair { from: String, to: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication error")]
    AuthenticationError,

    /// The translator was closed and must be recreated
    #[error("Translator closed")]
    Closed,

    #[error("Language could not be identified: {0}")]
    Undetermined(String),
}
