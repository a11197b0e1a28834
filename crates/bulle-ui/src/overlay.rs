use std::collections::HashSet;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use bulle_types::Rect;

use crate::presenter::SurfacePresenter;

pub type LabelId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Show {
        anchor: (i32, i32),
        text: String,
        ttl: Duration,
    },
    Notify(String),
    MoveTrigger {
        x: i32,
        y: i32,
    },
}

/// Windowing backend the overlay loop draws on
pub trait LabelSurface: Send {
    fn add_label(&mut self, id: LabelId, anchor: (i32, i32), text: &str);
    fn remove_label(&mut self, id: LabelId);
    fn show_notice(&mut self, message: &str);
    fn move_trigger(&mut self, x: i32, y: i32);
}

/// Surface that only logs what would be drawn
#[derive(Default)]
pub struct TracingSurface;

impl LabelSurface for TracingSurface {
    fn add_label(&mut self, id: LabelId, anchor: (i32, i32), text: &str) {
        tracing::info!("[OVERLAY] label {} at {:?}: {}", id, anchor, text);
    }

    fn remove_label(&mut self, id: LabelId) {
        tracing::debug!("[OVERLAY] label {} removed", id);
    }

    fn show_notice(&mut self, message: &str) {
        tracing::info!("[OVERLAY] notice: {}", message);
    }

    fn move_trigger(&mut self, x: i32, y: i32) {
        tracing::debug!("[OVERLAY] trigger moved to ({}, {})", x, y);
    }
}

/// Presenter handle feeding [`overlay_loop`]; cheap to clone
#[derive(Clone)]
pub struct OverlayPresenter {
    tx: AsyncSender<OverlayCommand>,
}

impl OverlayPresenter {
    pub fn new(capacity: usize) -> (Self, AsyncReceiver<OverlayCommand>) {
        let (tx, rx) = kanal::bounded_async(capacity);
        (Self { tx }, rx)
    }

    pub fn move_trigger(&self, x: i32, y: i32) {
        self.push(OverlayCommand::MoveTrigger { x, y });
    }

    fn push(&self, command: OverlayCommand) {
        match self.tx.try_send(command) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("[OVERLAY] queue full, dropping command"),
            Err(_) => tracing::debug!("[OVERLAY] overlay closed, dropping command"),
        }
    }
}

impl SurfacePresenter for OverlayPresenter {
    fn show(&self, bounds: Rect, text: &str, ttl: Duration) {
        self.push(OverlayCommand::Show {
            anchor: bounds.top_left(),
            text: text.to_string(),
            ttl,
        });
    }

    fn notify(&self, message: &str) {
        self.push(OverlayCommand::Notify(message.to_string()));
    }
}

/// Owns the surface: adds labels, removes each one when its own TTL runs out
pub async fn overlay_loop<S: LabelSurface>(
    rx: AsyncReceiver<OverlayCommand>,
    mut surface: S,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut labels: HashSet<LabelId> = HashSet::new();
    let mut timers: JoinSet<LabelId> = JoinSet::new();
    let mut next_id: LabelId = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("[OVERLAY] stopping");
                break;
            }
            Some(expired) = timers.join_next(), if !timers.is_empty() => {
                if let Ok(id) = expired
                    && labels.remove(&id)
                {
                    surface.remove_label(id);
                }
            }
            command = rx.recv() => {
                let Ok(command) = command else {
                    break;
                };
                match command {
                    OverlayCommand::Show { anchor, text, ttl } => {
                        next_id += 1;
                        let id = next_id;
                        surface.add_label(id, anchor, &text);
                        labels.insert(id);
                        timers.spawn(async move {
                            tokio::time::sleep(ttl).await;
                            id
                        });
                    }
                    OverlayCommand::Notify(message) => surface.show_notice(&message),
                    OverlayCommand::MoveTrigger { x, y } => surface.move_trigger(x, y),
                }
            }
        }
    }

    for id in labels.drain() {
        surface.remove_label(id);
    }
    timers.abort_all();

    Ok(())
}
