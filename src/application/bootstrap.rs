use crate::infrastructure::config::{ensure_default_configs, load_app_config, AppConfig};
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub config: AppConfig,
    pub storage_dir: PathBuf,
    pub logs_dir: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let logs_dir = workspace_root.join("logs");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;

    let storage_dir = resolve_storage_dir(workspace_root, &config.storage_dir);
    fs::create_dir_all(&storage_dir)?;

    Ok(BootstrapResult {
        config,
        storage_dir,
        logs_dir,
    })
}

fn resolve_storage_dir(workspace_root: &Path, configured: &str) -> PathBuf {
    let configured = Path::new(configured.trim());
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        workspace_root.join(configured)
    }
}
