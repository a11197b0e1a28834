pub mod overlay;
pub mod presenter;
pub mod trigger;

pub use overlay::{LabelId, LabelSurface, OverlayCommand, OverlayPresenter, TracingSurface, overlay_loop};
pub use presenter::SurfacePresenter;
pub use trigger::{PointerEvent, TriggerGesture, pointer_loop};
