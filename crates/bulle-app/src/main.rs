use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bulle_config::Config;
use bulle_types::{LanguageCode, SourceLanguage, parse_code};
use bulle_ui::OverlayPresenter;
use clap::Parser;
use tokio::signal;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

pub mod controller;
pub mod events;
pub mod io;
pub mod platform;
pub mod profile;
pub mod state;
pub mod status;

use self::controller::AppController;
use self::state::AppState;

/// Translate text on screen in place
#[derive(Parser, Debug)]
#[command(name = "bulle", version, about)]
struct Args {
    /// JSON config file; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source language, or `auto` to identify it per capture
    #[arg(long)]
    source: Option<SourceLanguage>,

    /// Target language
    #[arg(long, value_parser = parse_code)]
    target: Option<LanguageCode>,

    /// Trigger a capture every MS milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    auto_interval: Option<u64>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.translator.source = source.clone();
        }
        if let Some(target) = &self.target {
            config.translator.target = target.clone();
        }
        if let Some(ms) = self.auto_interval {
            config.capture.auto_interval_ms = (ms > 0).then_some(ms);
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = profile::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    tracing::info!(
        "Translating {} (auto capture: {:?})",
        config.translator.language_pair(),
        config.capture.auto_interval_ms
    );

    let (overlay, overlay_rx) = OverlayPresenter::new(256);
    let collaborators = platform::collaborators(&config, Arc::new(overlay.clone()))?;

    let controller = AppController::new(Arc::new(AppState::new(config)));
    let tasks = controller
        .spawn_tasks(collaborators, overlay, overlay_rx)
        .await;

    // Shutdown future (Ctrl+C)
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    };

    run(controller, tasks, shutdown).await
}

/// Wait for Ctrl+C or the first task to end, then stop the rest
async fn run(
    controller: AppController,
    mut tasks: JoinSet<anyhow::Result<()>>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let outcome = tokio::select! {
        _ = shutdown => {
            tracing::info!("Shutdown requested");
            Ok(())
        }
        Some(result) = tasks.join_next() => match result {
            Ok(Ok(())) => {
                tracing::info!("task exited, shutting down");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("task failed: {e:#}");
                Err(e)
            }
            Err(e) => {
                tracing::error!("task panicked: {e}");
                Err(e.into())
            }
        },
    };

    controller.shutdown();
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("tasks did not stop in time, aborting");
        tasks.abort_all();
    }

    outcome
}
