use bulle_core::PipelineHandle;
use bulle_types::AppEvent;
use bulle_ui::OverlayPresenter;
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

pub mod status;

pub use status::status_loop;

/// Routes UI events to the pipeline until shutdown
pub async fn event_loop(
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    pipeline: PipelineHandle,
    overlay: OverlayPresenter,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = ui_to_app_rx.recv() => event?,
        };

        tracing::debug!("[EVENT_LOOP] {:?}", event);
        if !handle_event(&pipeline, &overlay, event)? {
            break;
        }
    }

    tracing::info!("[EVENT_LOOP] stopping");
    Ok(())
}

/// Returns false once the app should stop
fn handle_event(
    pipeline: &PipelineHandle,
    overlay: &OverlayPresenter,
    event: AppEvent,
) -> anyhow::Result<bool> {
    match event {
        AppEvent::TriggerTap => pipeline.on_trigger_tap()?,
        AppEvent::SetLanguagePair(pair) => pipeline.set_language_pair(pair.source, pair.target)?,
        AppEvent::MoveTrigger { x, y } => overlay.move_trigger(x, y),
        AppEvent::Status(_) => {
            // Statuses travel on the app -> ui channel
        }
        AppEvent::Shutdown => {
            pipeline.shutdown()?;
            return Ok(false);
        }
    }
    Ok(true)
}
