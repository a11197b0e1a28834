use std::time::Duration;

use bulle_config::capture::CaptureConfig;
use bulle_types::AppEvent;
use kanal::AsyncSender;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Trigger sources outside the overlay: the global hotkey and the auto-capture timer
pub async fn watcher_io(
    capture: CaptureConfig,
    cancel: CancellationToken,
    event_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    if capture.hotkey {
        spawn_hotkey_listener(cancel.clone(), event_tx.clone());
    }

    match capture.auto_interval_ms {
        Some(ms) => auto_trigger(Duration::from_millis(ms), cancel, event_tx).await,
        None => {
            cancel.cancelled().await;
            Ok(())
        }
    }
}

/// Fire a trigger every `period` until cancelled
pub async fn auto_trigger(
    period: Duration,
    cancel: CancellationToken,
    event_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::info!("Auto capture every {:?}", period);

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Auto capture stopping");
                return Ok(());
            }
            _ = interval.tick() => send_trigger(&event_tx),
        }
    }
}

fn send_trigger(event_tx: &AsyncSender<AppEvent>) {
    match event_tx.try_send(AppEvent::TriggerTap) {
        Ok(true) => {}
        Ok(false) => tracing::debug!("event queue full, trigger dropped"),
        Err(e) => tracing::error!("Failed to send trigger: {}", e),
    }
}

#[cfg(windows)]
fn spawn_hotkey_listener(cancel: CancellationToken, event_tx: AsyncSender<AppEvent>) {
    tokio::task::spawn_blocking(move || {
        let hotkey_manager = match bulle_ocr::HotkeyManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                tracing::error!("Failed to register capture hotkey: {}", e);
                return;
            }
        };

        tracing::info!("Capture hotkey registered (Ctrl+Shift+S)");

        while !cancel.is_cancelled() {
            if hotkey_manager.poll() {
                tracing::debug!("Capture hotkey pressed");
                send_trigger(&event_tx);
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        tracing::info!("Capture hotkey listener stopping");
    });
}

#[cfg(not(windows))]
fn spawn_hotkey_listener(_cancel: CancellationToken, _event_tx: AsyncSender<AppEvent>) {
    tracing::warn!("Global capture hotkey is only available on Windows");
}
