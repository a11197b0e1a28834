use std::env;

use bulle_types::{parse_code, SourceLanguage};
use serde::{Deserialize, Serialize};

use self::capture::CaptureConfig;
use self::overlay::OverlayConfig;
use self::translator::TranslatorConfig;

pub mod capture;
pub mod overlay;
pub mod translator;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub translator: TranslatorConfig,
    pub overlay: OverlayConfig,
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Override fields from `lookup`; unparsable values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(ms) = number("STUCK_THRESHOLD_MS") {
            self.capture.stuck_threshold_ms = ms;
        }
        if let Some(ms) = number("CAPTURE_DELAY_MS") {
            self.capture.capture_delay_ms = ms;
        }
        if let Some(ms) = number("AUTO_CAPTURE_MS") {
            self.capture.auto_interval_ms = (ms > 0).then_some(ms);
        }
        if let Some(ms) = number("LABEL_TTL_MS") {
            self.overlay.label_ttl_ms = ms;
        }

        if let Some(source) = lookup("SOURCE_LANG").and_then(|v| v.parse::<SourceLanguage>().ok()) {
            self.translator.source = source;
        }
        if let Some(target) = lookup("TARGET_LANG").and_then(|v| parse_code(&v).ok()) {
            self.translator.target = target;
        }
        if let Some(key) = lookup("DEEPL_API_KEY") {
            self.translator.api_key = key;
        }
        if let Some(url) = lookup("DEEPL_API_URL") {
            self.translator.api_url = url;
        }
    }
}
