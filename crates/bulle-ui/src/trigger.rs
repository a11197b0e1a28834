use std::time::{Duration, Instant};

use bulle_config::overlay::OverlayConfig;
use bulle_types::AppEvent;
use kanal::{AsyncReceiver, AsyncSender};

/// Raw pointer input on the trigger control, screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, at: Instant },
    Move { x: f32, y: f32 },
    Up { at: Instant },
}

struct Press {
    origin: (i32, i32),
    pointer: (f32, f32),
    started_at: Instant,
    dragging: bool,
}

/// Tells a tap on the trigger apart from a drag that repositions it
pub struct TriggerGesture {
    position: (i32, i32),
    drag_slop: f32,
    tap_max: Duration,
    press: Option<Press>,
}

impl TriggerGesture {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            position: (config.trigger_x, config.trigger_y),
            drag_slop: config.drag_slop_px as f32,
            tap_max: Duration::from_millis(config.tap_max_ms),
            press: None,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// Feed one pointer event; returns the app event it produces, if any
    pub fn handle(&mut self, event: PointerEvent) -> Option<AppEvent> {
        match event {
            PointerEvent::Down { x, y, at } => {
                self.press = Some(Press {
                    origin: self.position,
                    pointer: (x, y),
                    started_at: at,
                    dragging: false,
                });
                None
            }
            PointerEvent::Move { x, y } => {
                let press = self.press.as_mut()?;
                let dx = x - press.pointer.0;
                let dy = y - press.pointer.1;

                if !press.dragging && (dx.abs() > self.drag_slop || dy.abs() > self.drag_slop) {
                    press.dragging = true;
                }
                if !press.dragging {
                    return None;
                }

                self.position = (press.origin.0 + dx as i32, press.origin.1 + dy as i32);
                Some(AppEvent::MoveTrigger {
                    x: self.position.0,
                    y: self.position.1,
                })
            }
            PointerEvent::Up { at } => {
                let press = self.press.take()?;
                let quick = at.saturating_duration_since(press.started_at) < self.tap_max;
                (!press.dragging && quick).then_some(AppEvent::TriggerTap)
            }
        }
    }
}

/// Turn pointer input from the surface backend into app events
pub async fn pointer_loop(
    pointer_rx: AsyncReceiver<PointerEvent>,
    ui_to_app_tx: AsyncSender<AppEvent>,
    mut gesture: TriggerGesture,
) -> anyhow::Result<()> {
    while let Ok(event) = pointer_rx.recv().await {
        if let Some(app_event) = gesture.handle(event) {
            ui_to_app_tx.send(app_event).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gesture() -> TriggerGesture {
        TriggerGesture::new(&OverlayConfig::default())
    }

    #[test]
    fn test_quick_press_is_a_tap() {
        let mut g = gesture();
        let t0 = Instant::now();

        assert!(g.handle(PointerEvent::Down { x: 110.0, y: 110.0, at: t0 }).is_none());
        assert!(g.handle(PointerEvent::Move { x: 112.0, y: 109.0 }).is_none());
        let event = g.handle(PointerEvent::Up {
            at: t0 + Duration::from_millis(120),
        });

        assert!(matches!(event, Some(AppEvent::TriggerTap)));
        assert_eq!(g.position(), (100, 100));
    }

    #[test]
    fn test_long_press_is_not_a_tap() {
        let mut g = gesture();
        let t0 = Instant::now();

        g.handle(PointerEvent::Down { x: 0.0, y: 0.0, at: t0 });
        let event = g.handle(PointerEvent::Up {
            at: t0 + Duration::from_millis(450),
        });
        assert!(event.is_none());
    }

    #[test]
    fn test_drag_moves_trigger_and_suppresses_tap() {
        let mut g = gesture();
        let t0 = Instant::now();

        g.handle(PointerEvent::Down { x: 110.0, y: 110.0, at: t0 });
        let moved = g.handle(PointerEvent::Move { x: 150.0, y: 90.0 });
        assert!(matches!(moved, Some(AppEvent::MoveTrigger { x: 140, y: 80 })));

        let event = g.handle(PointerEvent::Up {
            at: t0 + Duration::from_millis(50),
        });
        assert!(event.is_none());
        assert_eq!(g.position(), (140, 80));
    }

    #[tokio::test]
    async fn test_pointer_loop_forwards_taps() {
        let (pointer_tx, pointer_rx) = kanal::unbounded_async();
        let (app_tx, app_rx) = kanal::unbounded_async();
        let handle = tokio::spawn(pointer_loop(pointer_rx, app_tx, gesture()));

        let t0 = Instant::now();
        pointer_tx
            .send(PointerEvent::Down { x: 1.0, y: 1.0, at: t0 })
            .await
            .unwrap();
        pointer_tx
            .send(PointerEvent::Up {
                at: t0 + Duration::from_millis(10),
            })
            .await
            .unwrap();
        drop(pointer_tx);

        let event = tokio::time::timeout(Duration::from_secs(1), app_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::TriggerTap));
        handle.await.unwrap().unwrap();
    }
}
