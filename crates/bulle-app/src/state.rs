use std::sync::Arc;

use bulle_config::Config;
use tokio::sync::RwLock;

use crate::status::CaptureStats;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub stats: Arc<RwLock<CaptureStats>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            stats: Arc::new(RwLock::new(CaptureStats::default())),
        }
    }
}
