use bulle_ocr::CaptureError;

/// Errors that end the pipeline loop; everything else is reported as a status
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("screen capture source lost: {0}")]
    SourceLost(#[source] CaptureError),

    #[error("pipeline channel closed")]
    ChannelClosed,
}
