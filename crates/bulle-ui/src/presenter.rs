use std::time::Duration;

use bulle_types::Rect;

/// Sink for everything the pipeline puts on screen
pub trait SurfacePresenter: Send + Sync {
    /// Render `text` anchored at `bounds.top_left()` and remove it after `ttl`,
    /// independently of other labels. Must never block.
    fn show(&self, bounds: Rect, text: &str, ttl: Duration);

    /// Short transient notice, e.g. "No text detected"
    fn notify(&self, _message: &str) {}
}
