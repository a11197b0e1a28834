mod capture;
#[cfg(windows)]
mod hotkey;
mod ocr;

pub use capture::{CaptureError, FrameSource, frame_from_rgba};
#[cfg(windows)]
pub use capture::ScreenFrameSource;
#[cfg(windows)]
pub use hotkey::HotkeyManager;
pub use ocr::{DetectError, TextDetector, encode_png};
#[cfg(windows)]
pub use ocr::WinOcrDetector;
