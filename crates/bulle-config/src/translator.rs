use bulle_types::{LanguageCode, LanguagePair, SourceLanguage};
use serde::{Deserialize, Serialize};

fn default_provider() -> String {
    "deepl".to_string()
}

fn default_source() -> SourceLanguage {
    SourceLanguage::Auto
}

fn default_target() -> LanguageCode {
    "en".to_string()
}

fn default_fallback_source() -> LanguageCode {
    "en".to_string()
}

fn default_identifier() -> String {
    "whatlang".to_string()
}

fn default_api_url() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TranslatorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_source")]
    pub source: SourceLanguage,
    #[serde(default = "default_target")]
    pub target: LanguageCode,
    /// Source language used for `auto` when no identifier is available
    #[serde(default = "default_fallback_source")]
    pub fallback_source: LanguageCode,
    /// Language identifier for `auto`: `whatlang` (offline), `deepl` or `none`
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl TranslatorConfig {
    pub fn language_pair(&self) -> LanguagePair {
        LanguagePair::new(self.source.clone(), self.target.clone())
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            source: default_source(),
            target: default_target(),
            fallback_source: default_fallback_source(),
            identifier: default_identifier(),
            api_key: String::new(),
            api_url: default_api_url(),
        }
    }
}
