use std::sync::Arc;

use anyhow::Context;
use bulle_config::Config;
use bulle_config::translator::TranslatorConfig;
use bulle_core::Collaborators;
use bulle_ocr::{FrameSource, TextDetector};
use bulle_translator::{DeepLFactory, LanguageIdentifier, TranslatorFactory, WhatlangIdentifier};
use bulle_ui::SurfacePresenter;

/// Wire the platform capture stack and the configured translation services
pub fn collaborators(
    config: &Config,
    presenter: Arc<dyn SurfacePresenter>,
) -> anyhow::Result<Collaborators> {
    let (frame_source, detector) = capture_stack(config)?;
    Ok(Collaborators {
        frame_source,
        detector,
        translators: translator_factory(&config.translator)?,
        identifier: language_identifier(&config.translator)?,
        presenter,
    })
}

pub fn translator_factory(config: &TranslatorConfig) -> anyhow::Result<Arc<dyn TranslatorFactory>> {
    match config.provider.as_str() {
        "deepl" => {
            if config.api_key.is_empty() {
                tracing::warn!("DEEPL_API_KEY is not set, translations will fail");
            }
            Ok(Arc::new(DeepLFactory::new(
                config.api_key.clone(),
                config.api_url.clone(),
            )))
        }
        other => anyhow::bail!("Unknown translation provider {:?}", other),
    }
}

pub fn language_identifier(
    config: &TranslatorConfig,
) -> anyhow::Result<Option<Arc<dyn LanguageIdentifier>>> {
    let identifier: Arc<dyn LanguageIdentifier> = match config.identifier.as_str() {
        "whatlang" => Arc::new(WhatlangIdentifier::default()),
        "deepl" => Arc::new(
            DeepLFactory::new(config.api_key.clone(), config.api_url.clone()).identifier(),
        ),
        "none" => return Ok(None),
        other => anyhow::bail!("Unknown language identifier {:?}", other),
    };
    Ok(Some(identifier))
}

#[cfg(windows)]
fn capture_stack(config: &Config) -> anyhow::Result<(Arc<dyn FrameSource>, Arc<dyn TextDetector>)> {
    use bulle_ocr::{ScreenFrameSource, WinOcrDetector};
    use bulle_types::SourceLanguage;

    let source = ScreenFrameSource::primary().context("Failed to set up screen capture")?;

    let detector = match &config.translator.source {
        SourceLanguage::Code(code) => WinOcrDetector::new(code).or_else(|e| {
            tracing::warn!("No OCR language pack for {}: {:#}, using profile languages", code, e);
            WinOcrDetector::for_user_languages()
        })?,
        SourceLanguage::Auto => WinOcrDetector::for_user_languages()?,
    };

    Ok((Arc::new(source), Arc::new(detector)))
}

#[cfg(not(windows))]
fn capture_stack(_config: &Config) -> anyhow::Result<(Arc<dyn FrameSource>, Arc<dyn TextDetector>)> {
    Err(bulle_ocr::CaptureError::Setup(
        "screen capture is only implemented for Windows".into(),
    ))
    .context("Failed to set up screen capture")
}
