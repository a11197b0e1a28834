pub mod error;
pub mod gate;
pub mod pipeline;
pub mod preprocess;
pub mod slot;

pub use error::PipelineError;
pub use gate::{CaptureGate, CaptureRequest, PipelineState, STUCK_THRESHOLD};
pub use pipeline::{
    Collaborators, PendingTranslation, Pipeline, PipelineHandle, PipelineMessage,
    PipelineSettings, TranslationCompletion,
};
pub use slot::TranslatorSlot;

#[cfg(test)]
mod tests;
