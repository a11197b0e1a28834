use serde::{Deserialize, Serialize};

fn default_stuck_threshold_ms() -> u64 {
    5000
}

fn default_capture_delay_ms() -> u64 {
    100
}

fn default_hotkey() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CaptureConfig {
    /// A cycle in flight longer than this is considered stuck and replaced
    #[serde(default = "default_stuck_threshold_ms")]
    pub stuck_threshold_ms: u64,
    /// Pause before pulling a frame, lets the trigger tap settle on screen
    #[serde(default = "default_capture_delay_ms")]
    pub capture_delay_ms: u64,
    /// Fire a trigger periodically
    pub auto_interval_ms: Option<u64>,
    /// Register the global capture hotkey (Ctrl+Shift+S)
    #[serde(default = "default_hotkey")]
    pub hotkey: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stuck_threshold_ms: default_stuck_threshold_ms(),
            capture_delay_ms: default_capture_delay_ms(),
            auto_interval_ms: None,
            hotkey: default_hotkey(),
        }
    }
}
