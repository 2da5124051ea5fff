//! Engine daemon entry point: bring up the manager, restore persisted
//! sessions, and run until interrupted.

use std::sync::Arc;

use tracing::{error, info, warn};
use weft_server::pty::PtyWindow;
use weft_server::{EngineConfig, Manager, ToolRegistry};
use weft_utils::{init_logging_with_config, LogConfig, Result, WeftError};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging_with_config(LogConfig::server())?;
    weft_utils::ensure_all_dirs().map_err(WeftError::Io)?;

    let config = EngineConfig::load(&weft_utils::engine_config_file())?;
    let tools = ToolRegistry::with_defaults(&config.tools);
    let manager = Manager::new(
        config,
        tools,
        Arc::new(|options| {
            PtyWindow::spawn(options).map(|w| w as Arc<dyn weft_server::TerminalWindow>)
        }),
    );

    restore_sessions(&manager).await;
    drain_notifications(&manager);

    info!("engine running");
    tokio::signal::ctrl_c().await.map_err(WeftError::Io)?;
    info!("shutting down");
    manager.close();
    Ok(())
}

/// Bring back every persisted session. One bad session never blocks the
/// rest.
async fn restore_sessions(manager: &Arc<Manager>) {
    let specs = match weft_server::load_restore_specs(&weft_utils::restore_dir()) {
        Ok(specs) => specs,
        Err(e) => {
            error!(error = %e, "failed to read restore directory");
            return;
        }
    };
    for spec in specs {
        let name = spec.name.clone();
        if let Err(e) = manager.restore_session(spec).await {
            warn!(session = %name, error = %e, "session restore failed");
        }
    }
}

/// No client transport is attached here, so keep the notification
/// channels flowing into the log instead of filling up.
fn drain_notifications(manager: &Arc<Manager>) {
    if let Some(mut events) = manager.take_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::trace!(pane_id = %event.pane_id, "pane event");
            }
        });
    }
    if let Some(mut toasts) = manager.take_toasts() {
        tokio::spawn(async move {
            while let Some(toast) = toasts.recv().await {
                info!(pane_id = %toast.pane_id, message = %toast.message, "toast");
            }
        });
    }
}
