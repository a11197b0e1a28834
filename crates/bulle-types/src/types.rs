use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type LanguageCode = String;

/// Screen-space rectangle, top-left origin, size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Anchor point for anything rendered next to this rectangle
    pub fn top_left(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Smallest rectangle covering both
    pub fn union(self, other: Rect) -> Self {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width as i32).max(other.x + other.width as i32);
        let bottom = (self.y + self.height as i32).max(other.y + other.height as i32);

        Self {
            x: left,
            y: top,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// One captured screen buffer.
///
/// Deliberately not `Clone`: a frame belongs to exactly one capture cycle and
/// is dropped as soon as the detector has consumed it.
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Screen position of the frame's top-left pixel
    origin: (i32, i32),
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
            origin: (0, 0),
        }
    }

    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() >= self.stride() * self.height as usize
    }

    /// Consume the frame, returning tightly packed RGBA pixels
    pub fn into_rgba(self) -> Vec<u8> {
        let mut data = self.data;
        if self.format == PixelFormat::Bgra8 {
            for px in data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        data
    }
}

/// Text fragment as reported by a detector; geometry may be missing
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBlock {
    pub text: String,
    pub bounds: Option<Rect>,
}

impl DetectedBlock {
    pub fn new(text: impl Into<String>, bounds: Option<Rect>) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// A detected block that is worth translating: non-empty text with real geometry
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    text: String,
    bounds: Rect,
}

impl TextBlock {
    /// Returns `None` for empty text or a zero-area rectangle
    pub fn new(text: impl Into<String>, bounds: Rect) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() || bounds.is_empty() {
            return None;
        }
        Some(Self { text, bounds })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceLanguage {
    /// Identify the language of each capture before translating
    Auto,
    Code(LanguageCode),
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLanguage::Auto => f.write_str("auto"),
            SourceLanguage::Code(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid language identifier: {0:?}")]
pub struct ParseLanguageError(pub String);

impl FromStr for SourceLanguage {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(SourceLanguage::Auto);
        }
        parse_code(s).map(SourceLanguage::Code)
    }
}

impl TryFrom<String> for SourceLanguage {
    type Error = ParseLanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceLanguage> for String {
    fn from(value: SourceLanguage) -> Self {
        value.to_string()
    }
}

/// Lowercased language tag, e.g. `fr`, `zh`, `pt-br`
pub fn parse_code(s: &str) -> Result<LanguageCode, ParseLanguageError> {
    let s = s.trim();
    let valid = !s.is_empty()
        && s.len() <= 16
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ParseLanguageError(s.to_string()));
    }
    Ok(s.to_ascii_lowercase())
}

/// User-facing language configuration; the source may still be `auto`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: SourceLanguage,
    pub target: LanguageCode,
}

impl LanguagePair {
    pub fn new(source: SourceLanguage, target: impl Into<LanguageCode>) -> Self {
        Self {
            source,
            target: target.into(),
        }
    }

    pub fn fixed(source: impl Into<LanguageCode>, target: impl Into<LanguageCode>) -> Self {
        Self::new(SourceLanguage::Code(source.into()), target)
    }

    pub fn auto(target: impl Into<LanguageCode>) -> Self {
        Self::new(SourceLanguage::Auto, target)
    }

    /// Concrete pair, using `detected` only when the source is `auto`
    pub fn resolve(&self, detected: &str) -> ResolvedPair {
        let source = match &self.source {
            SourceLanguage::Auto => detected.to_string(),
            SourceLanguage::Code(code) => code.clone(),
        };
        ResolvedPair {
            source,
            target: self.target.clone(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// Concrete pair a translator instance is configured for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPair {
    pub source: LanguageCode,
    pub target: LanguageCode,
}

impl ResolvedPair {
    pub fn new(source: impl Into<LanguageCode>, target: impl Into<LanguageCode>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for ResolvedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// Translation of one block, correlated back to where the block was found
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub request: u64,
    pub bounds: Rect,
    pub outcome: TranslationOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome {
    Translated(String),
    Failed(String),
}

/// Non-fatal signals reported by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStatus {
    CaptureUnavailable { request: u64 },
    RecognitionFailed { request: u64, reason: String },
    NoTextDetected { request: u64 },
    LanguageUnidentified { request: u64, reason: String },
    TranslatorUnavailable { pair: ResolvedPair, reason: String },
    TranslationFailed { request: u64, bounds: Rect, reason: String },
    SourceLost { reason: String },
}

impl PipelineStatus {
    /// Informational statuses are not failures
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            PipelineStatus::CaptureUnavailable { .. } | PipelineStatus::NoTextDetected { .. }
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::CaptureUnavailable { .. } => f.write_str("Capture unavailable"),
            PipelineStatus::RecognitionFailed { reason, .. } => {
                write!(f, "Recognition failed: {reason}")
            }
            PipelineStatus::NoTextDetected { .. } => f.write_str("No text detected"),
            PipelineStatus::LanguageUnidentified { reason, .. } => {
                write!(f, "Language not identified: {reason}")
            }
            PipelineStatus::TranslatorUnavailable { pair, reason } => {
                write!(f, "Translator {pair} unavailable: {reason}")
            }
            PipelineStatus::TranslationFailed { reason, .. } => {
                write!(f, "Translation failed: {reason}")
            }
            PipelineStatus::SourceLost { reason } => write!(f, "Screen capture stopped: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Trigger control tapped, or the auto-capture timer fired
    TriggerTap,
    SetLanguagePair(LanguagePair),
    /// Trigger control dragged to a new position
    MoveTrigger { x: i32, y: i32 },
    Status(PipelineStatus),
    Shutdown,
}
