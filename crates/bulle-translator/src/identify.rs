use async_trait::async_trait;
use bulle_types::LanguageCode;

use crate::{LanguageIdentifier, TranslateError};

/// Offline identification with whatlang, reported as ISO 639-1 codes.
///
/// Screen text is short, so whatlang rarely calls it reliable. A guess is
/// only refused when it is both unreliable and under `min_confidence`.
pub struct WhatlangIdentifier {
    min_confidence: f64,
}

impl WhatlangIdentifier {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn detect(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        let info = whatlang::detect(text)
            .ok_or_else(|| TranslateError::Undetermined("no language signal".to_string()))?;

        if !info.is_reliable() && info.confidence() < self.min_confidence {
            return Err(TranslateError::Undetermined(format!(
                "{} below confidence threshold ({:.2})",
                info.lang().code(),
                info.confidence()
            )));
        }

        to_639_1(info.lang().code()).ok_or_else(|| {
            TranslateError::Undetermined(format!("no two-letter code for {}", info.lang().code()))
        })
    }
}

impl Default for WhatlangIdentifier {
    fn default() -> Self {
        Self::new(0.1)
    }
}

fn to_639_1(code: &str) -> Option<LanguageCode> {
    // whatlang reports Mandarin, which has no 639-1 code of its own
    if code == "cmn" {
        return Some("zh".to_string());
    }
    isolang::Language::from_639_3(code)
        .and_then(|lang| lang.to_639_1())
        .map(str::to_string)
}

#[async_trait]
impl LanguageIdentifier for WhatlangIdentifier {
    async fn identify(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        self.detect(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_french() {
        let identifier = WhatlangIdentifier::default();
        let code = identifier
            .detect("Bonjour à tous, je voudrais réserver une table pour ce soir dans votre restaurant.")
            .unwrap();
        assert_eq!(code, "fr");
    }

    #[test]
    fn test_short_screen_text_is_accepted() {
        let identifier = WhatlangIdentifier::default();
        let code = identifier
            .detect("Der schnelle braune Fuchs springt über den faulen Hund")
            .unwrap();
        assert_eq!(code, "de");
    }

    #[test]
    fn test_floor_refuses_weak_guesses() {
        let identifier = WhatlangIdentifier::new(1.01);
        assert!(matches!(
            identifier.detect("Ouvrir le fichier"),
            Err(TranslateError::Undetermined(_))
        ));
    }

    #[test]
    fn test_empty_text_is_undetermined() {
        let identifier = WhatlangIdentifier::default();
        assert!(matches!(
            identifier.detect(""),
            Err(TranslateError::Undetermined(_))
        ));
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(to_639_1("eng").as_deref(), Some("en"));
        assert_eq!(to_639_1("jpn").as_deref(), Some("ja"));
        assert_eq!(to_639_1("cmn").as_deref(), Some("zh"));
    }

    #[tokio::test]
    async fn test_identify_through_trait() {
        let identifier: Box<dyn LanguageIdentifier> = Box::new(WhatlangIdentifier::default());
        let code = identifier
            .identify("Der schnelle braune Fuchs springt über den faulen Hund und läuft davon.")
            .await
            .unwrap();
        assert_eq!(code, "de");
    }
}
