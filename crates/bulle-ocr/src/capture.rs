use bulle_types::{Frame, PixelFormat};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture surface could not be created
    #[error("capture setup failed: {0}")]
    Setup(String),

    /// The capture surface went away after setup
    #[error("capture source stopped: {0}")]
    Stopped(String),

    #[error("capture failed: {0}")]
    Backend(String),
}

impl CaptureError {
    /// Fatal errors are outside the pipeline's retry domain
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::Setup(_) | CaptureError::Stopped(_))
    }
}

/// Produces one frame per request from a live screen surface
pub trait FrameSource: Send + Sync {
    /// Latest frame, or `Ok(None)` when the surface has nothing to deliver.
    /// May block briefly; callers run it off the control thread.
    fn acquire(&self) -> Result<Option<Frame>, CaptureError>;

    /// Release the capture surface
    fn close(&self) {}
}

/// Wrap an RGBA image captured at `origin` (screen coordinates)
pub fn frame_from_rgba(image: image::RgbaImage, origin: (i32, i32)) -> Frame {
    let (width, height) = image.dimensions();
    Frame::new(image.into_raw(), width, height, PixelFormat::Rgba8).with_origin(origin.0, origin.1)
}

#[cfg(windows)]
pub use screen::ScreenFrameSource;

#[cfg(windows)]
mod screen {
    use std::sync::atomic::{AtomicBool, Ordering};

    use bulle_types::Frame;
    use xcap::Monitor;

    use super::{CaptureError, FrameSource, frame_from_rgba};

    /// Captures a whole monitor with xcap
    pub struct ScreenFrameSource {
        monitor_id: u32,
        closed: AtomicBool,
    }

    impl ScreenFrameSource {
        /// Attach to the primary monitor
        pub fn primary() -> Result<Self, CaptureError> {
            let monitors = Monitor::all().map_err(|e| CaptureError::Setup(e.to_string()))?;
            let monitor = monitors
                .first()
                .ok_or_else(|| CaptureError::Setup("No monitor found".to_string()))?;

            tracing::info!(
                "capturing monitor {} ({}x{})",
                monitor.id(),
                monitor.width(),
                monitor.height()
            );

            Ok(Self {
                monitor_id: monitor.id(),
                closed: AtomicBool::new(false),
            })
        }
    }

    impl FrameSource for ScreenFrameSource {
        fn acquire(&self) -> Result<Option<Frame>, CaptureError> {
            if self.closed.load(Ordering::Acquire) {
                return Err(CaptureError::Stopped("source closed".to_string()));
            }

            let monitors = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
            let monitor = monitors
                .into_iter()
                .find(|m| m.id() == self.monitor_id)
                .ok_or_else(|| CaptureError::Stopped("monitor disconnected".to_string()))?;

            let image = monitor
                .capture_image()
                .map_err(|e| CaptureError::Backend(e.to_string()))?;

            if image.width() == 0 || image.height() == 0 {
                return Ok(None);
            }

            Ok(Some(frame_from_rgba(image, (monitor.x(), monitor.y()))))
        }

        fn close(&self) {
            self.closed.store(true, Ordering::Release);
        }
    }
}
