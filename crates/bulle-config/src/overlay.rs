use serde::{Deserialize, Serialize};

fn default_label_ttl_ms() -> u64 {
    5000
}

fn default_trigger_position() -> i32 {
    100
}

fn default_drag_slop_px() -> u32 {
    5
}

fn default_tap_max_ms() -> u64 {
    200
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct OverlayConfig {
    /// How long a translation label stays on screen
    #[serde(default = "default_label_ttl_ms")]
    pub label_ttl_ms: u64,
    #[serde(default = "default_trigger_position")]
    pub trigger_x: i32,
    #[serde(default = "default_trigger_position")]
    pub trigger_y: i32,
    /// Pointer travel that turns a press into a drag
    #[serde(default = "default_drag_slop_px")]
    pub drag_slop_px: u32,
    /// Longest press still counted as a tap
    #[serde(default = "default_tap_max_ms")]
    pub tap_max_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            label_ttl_ms: default_label_ttl_ms(),
            trigger_x: default_trigger_position(),
            trigger_y: default_trigger_position(),
            drag_slop_px: default_drag_slop_px(),
            tap_max_ms: default_tap_max_ms(),
        }
    }
}
