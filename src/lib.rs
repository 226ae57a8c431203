pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::AppState;
use infrastructure::config::resolve_bind_address;
use std::sync::Arc;

/// Boots the workspace in the current directory and serves the API until the
/// server task ends.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let workspace_root = std::env::current_dir()?;
    let state = AppState::new(workspace_root)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&state.config().log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();

    let bind_address = resolve_bind_address(state.config(), |key| std::env::var(key).ok());
    tracing::info!(
        app = %state.config().app_name,
        addr = %bind_address,
        logs = %state.logs_dir().display(),
        "starting day planner server"
    );

    let (bound_addr, handle) = api::start_server(&bind_address, Arc::new(state)).await?;
    tracing::info!(addr = %bound_addr, "day planner server listening");
    handle.await?;
    Ok(())
}
