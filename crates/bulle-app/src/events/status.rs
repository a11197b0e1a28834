use std::sync::Arc;

use bulle_types::{AppEvent, PipelineStatus};
use bulle_ui::SurfacePresenter;
use kanal::AsyncReceiver;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::status::CaptureStats;

/// Tallies pipeline statuses and turns the user-facing ones into notices
pub async fn status_loop(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    stats: Arc<RwLock<CaptureStats>>,
    presenter: Arc<dyn SurfacePresenter>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = app_to_ui_rx.recv() => event?,
        };

        let AppEvent::Status(status) = event else {
            continue;
        };

        stats.write().await.record(&status);
        if let Some(notice) = notice(&status) {
            presenter.notify(&notice);
        }
    }
    Ok(())
}

/// Per-block failures stay in the log; everything else is shown
fn notice(status: &PipelineStatus) -> Option<String> {
    match status {
        PipelineStatus::TranslationFailed { .. } => None,
        other => Some(other.to_string()),
    }
}
