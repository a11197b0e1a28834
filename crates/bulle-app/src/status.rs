use std::time::SystemTime;

use bulle_types::PipelineStatus;

/// Running tally of what the pipeline has reported
#[derive(Clone, Debug, Default)]
pub struct CaptureStats {
    pub reported: u64,
    pub error_count: u64,
    pub no_text_count: u64,
    pub unavailable_count: u64,
    pub translation_failures: u64,
    pub source_lost: bool,
    pub last_status_time: Option<SystemTime>,
    pub current_message: String,
}

impl CaptureStats {
    pub fn record(&mut self, status: &PipelineStatus) {
        self.reported += 1;
        if status.is_error() {
            self.error_count += 1;
        }

        match status {
            PipelineStatus::NoTextDetected { .. } => self.no_text_count += 1,
            PipelineStatus::CaptureUnavailable { .. } => self.unavailable_count += 1,
            PipelineStatus::TranslationFailed { .. } => self.translation_failures += 1,
            PipelineStatus::SourceLost { .. } => self.source_lost = true,
            _ => {}
        }

        self.last_status_time = Some(SystemTime::now());
        self.current_message = status.to_string();
    }
}
