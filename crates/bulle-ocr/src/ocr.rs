use anyhow::{Context, Result};
use bulle_types::{DetectedBlock, Frame};

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("invalid frame {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },

    #[error("recognition failed: {0}")]
    Backend(String),
}

/// Converts a frame into text blocks with screen-space geometry
#[async_trait::async_trait]
pub trait TextDetector: Send + Sync {
    /// Takes ownership of the frame; its buffer is freed once detection ends
    async fn detect(&self, frame: Frame) -> Result<Vec<DetectedBlock>, DetectError>;

    /// Release the recognition model
    fn close(&self) {}
}

/// Encode a frame as PNG bytes
pub fn encode_png(frame: Frame) -> Result<Vec<u8>> {
    use image::ImageEncoder;

    let (width, height) = (frame.width(), frame.height());
    if !frame.is_valid() {
        anyhow::bail!("invalid frame {}x{}", width, height);
    }

    let len = frame.stride() * height as usize;
    let mut rgba = frame.into_rgba();
    rgba.truncate(len);

    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

#[cfg(windows)]
pub use winrt::WinOcrDetector;

#[cfg(windows)]
mod winrt {
    use anyhow::{Context, Result};
    use bulle_types::{DetectedBlock, Frame, Rect};
    use windows::{
        Globalization::Language,
        Graphics::Imaging::BitmapDecoder,
        Media::Ocr::OcrEngine as WinOcrEngine,
        Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
        Win32::System::Com::{COINIT_MULTITHREADED, CoInitializeEx, CoUninitialize},
        core::{HRESULT, HSTRING},
    };

    use super::{DetectError, TextDetector, encode_png};

    /// The thread already belongs to a single-threaded apartment
    const RPC_E_CHANGED_MODE: HRESULT = HRESULT(0x8001_0106_u32 as i32);

    /// Membership of the multithreaded apartment for one recognition.
    /// Blocking-pool threads are reused, so every call joins and leaves.
    struct Apartment {
        joined: bool,
    }

    impl Apartment {
        fn enter() -> Result<Self> {
            let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
            if hr == RPC_E_CHANGED_MODE {
                return Ok(Self { joined: false });
            }
            hr.ok().context("Failed to initialize COM")?;
            Ok(Self { joined: true })
        }
    }

    impl Drop for Apartment {
        fn drop(&mut self) {
            if self.joined {
                unsafe { CoUninitialize() };
            }
        }
    }

    fn in_apartment<T>(work: impl FnOnce() -> Result<T>) -> Result<T> {
        let _apartment = Apartment::enter()?;
        work()
    }

    /// Windows.Media.Ocr, one block per recognized line
    pub struct WinOcrDetector {
        engine: WinOcrEngine,
    }

    impl WinOcrDetector {
        /// Create a detector for the specified language (e.g., "ja", "en")
        pub fn new(language_code: &str) -> Result<Self> {
            let language = Language::CreateLanguage(&HSTRING::from(language_code))
                .context("Failed to create language")?;

            let engine = WinOcrEngine::TryCreateFromLanguage(&language)
                .context("Failed to create OCR engine for language")?;

            Ok(Self { engine })
        }

        /// Detector for the user's profile languages
        pub fn for_user_languages() -> Result<Self> {
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
                .context("Failed to create OCR engine for user languages")?;
            Ok(Self { engine })
        }
    }

    fn recognize_blocks(engine: &WinOcrEngine, frame: Frame) -> Result<Vec<DetectedBlock>> {
        let (origin_x, origin_y) = frame.origin();
        let png = encode_png(frame)?;

        let stream = InMemoryRandomAccessStream::new().context("Failed to create stream")?;
        let writer = DataWriter::CreateDataWriter(&stream).context("Failed to create writer")?;

        writer
            .WriteBytes(&png)
            .context("Failed to write image bytes")?;
        writer
            .StoreAsync()
            .context("Failed to store async")?
            .get()
            .context("Failed to store data")?;
        writer.FlushAsync().context("Failed to flush")?.get()?;

        stream.Seek(0).context("Failed to seek")?;

        let decoder = BitmapDecoder::CreateAsync(&stream)
            .context("Failed to create decoder async")?
            .get()
            .context("Failed to get decoder")?;

        let bitmap = decoder
            .GetSoftwareBitmapAsync()
            .context("Failed to get bitmap async")?
            .get()
            .context("Failed to get software bitmap")?;

        let result = engine
            .RecognizeAsync(&bitmap)
            .context("Failed to recognize async")?
            .get()
            .context("Failed to get OCR result")?;

        let lines = result.Lines().context("Failed to get lines")?;
        let mut blocks = Vec::new();

        for i in 0..lines.Size()? {
            let line = lines.GetAt(i)?;
            let text = line.Text()?.to_string();

            let words = line.Words()?;
            let mut bounds: Option<Rect> = None;
            for j in 0..words.Size()? {
                let r = words.GetAt(j)?.BoundingRect()?;
                let rect = Rect::new(
                    r.X.round() as i32,
                    r.Y.round() as i32,
                    r.Width.round() as u32,
                    r.Height.round() as u32,
                )
                .offset(origin_x, origin_y);
                bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
            }

            blocks.push(DetectedBlock::new(text, bounds));
        }

        Ok(blocks)
    }

    #[async_trait::async_trait]
    impl TextDetector for WinOcrDetector {
        async fn detect(&self, frame: Frame) -> Result<Vec<DetectedBlock>, DetectError> {
            if !frame.is_valid() {
                return Err(DetectError::InvalidFrame {
                    width: frame.width(),
                    height: frame.height(),
                });
            }

            let engine = self.engine.clone();
            tokio::task::spawn_blocking(move || in_apartment(|| recognize_blocks(&engine, frame)))
            .await
            .map_err(|e| DetectError::Backend(format!("OCR task error: {e}")))?
            .map_err(|e| DetectError::Backend(format!("{e:#}")))
        }
    }

    #[cfg(test)]
    mod tests {
        use windows::Win32::System::Com::COINIT_APARTMENTTHREADED;

        use super::*;

        #[tokio::test]
        async fn test_blocking_threads_rejoin_per_recognition() {
            for round in 0..3 {
                let value = tokio::task::spawn_blocking(move || in_apartment(|| Ok(round)))
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(value, round);
            }
        }

        #[test]
        fn test_single_threaded_caller_is_accepted() {
            unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok().unwrap() };
            assert!(in_apartment(|| Ok(())).is_ok());
            unsafe { CoUninitialize() };
        }
    }
}

#[cfg(test)]
mod tests {
    use bulle_types::PixelFormat;

    use super::*;

    #[test]
    fn test_encode_png_roundtrips_pixels() {
        let frame = Frame::new(
            vec![
                0, 0, 255, 255, /**/ 0, 255, 0, 255, //
                255, 0, 0, 255, /**/ 9, 9, 9, 255,
            ],
            2,
            2,
            PixelFormat::Bgra8,
        );

        let png = encode_png(frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let frame = Frame::new(vec![0; 7], 2, 1, PixelFormat::Rgba8);
        assert!(encode_png(frame).is_err());
    }
}
