use std::sync::Arc;

use bulle_core::{Collaborators, Pipeline, PipelineSettings};
use bulle_types::AppEvent;
use bulle_ui::{
    OverlayCommand, OverlayPresenter, PointerEvent, TracingSurface, TriggerGesture, overlay_loop,
    pointer_loop,
};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::{event_loop, status_loop};
use crate::io::watcher_io;
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    pub app_to_ui: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub ui_to_app: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub pointer: (AsyncSender<PointerEvent>, AsyncReceiver<PointerEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            app_to_ui: kanal::bounded_async(256), // pipeline statuses
            ui_to_app: kanal::bounded_async(64),  // taps, picker, hotkey, timer
            pointer: kanal::bounded_async(64),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Where UI components post their events
    pub fn ui_sender(&self) -> AsyncSender<AppEvent> {
        self.channels.ui_to_app.0.clone()
    }

    /// Where a windowing backend feeds raw pointer input on the trigger
    pub fn pointer_sender(&self) -> AsyncSender<PointerEvent> {
        self.channels.pointer.0.clone()
    }

    pub async fn spawn_tasks(
        &self,
        collaborators: Collaborators,
        overlay: OverlayPresenter,
        overlay_rx: AsyncReceiver<OverlayCommand>,
    ) -> JoinSet<anyhow::Result<()>> {
        let config = self.state.config.read().await.clone();
        let mut tasks = JoinSet::new();

        // Pipeline
        let (pipeline, inbox) = Pipeline::new(
            PipelineSettings::from_config(&config),
            config.translator.language_pair(),
            collaborators,
            self.channels.app_to_ui.0.clone(),
        );
        let handle = pipeline.handle();
        let cancel = self.cancel_token.child_token();
        tasks.spawn(async move {
            pipeline.run(inbox, cancel).await?;
            Ok(())
        });

        // Event loop
        tasks.spawn(event_loop(
            self.channels.ui_to_app.1.clone(),
            handle,
            overlay.clone(),
            self.cancel_token.child_token(),
        ));

        // Status loop
        tasks.spawn(status_loop(
            self.channels.app_to_ui.1.clone(),
            self.state.stats.clone(),
            Arc::new(overlay.clone()),
            self.cancel_token.child_token(),
        ));

        // Overlay
        overlay.move_trigger(config.overlay.trigger_x, config.overlay.trigger_y);
        tasks.spawn(overlay_loop(
            overlay_rx,
            TracingSurface,
            self.cancel_token.child_token(),
        ));

        // Trigger gestures
        let pointer_rx = self.channels.pointer.1.clone();
        let ui_to_app_tx = self.channels.ui_to_app.0.clone();
        let gesture = TriggerGesture::new(&config.overlay);
        let cancel = self.cancel_token.child_token();
        tasks.spawn(async move {
            tokio::select! {
                result = pointer_loop(pointer_rx, ui_to_app_tx, gesture) => result,
                _ = cancel.cancelled() => Ok(()),
            }
        });

        // Watcher IO
        tasks.spawn(watcher_io(
            config.capture.clone(),
            self.cancel_token.child_token(),
            self.channels.ui_to_app.0.clone(),
        ));

        tasks
    }

    /// Token cancelled by [`AppController::shutdown`]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
