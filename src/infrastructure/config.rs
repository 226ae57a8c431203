use crate::domain::layout::{DEFAULT_SLOT_HEIGHT, MAX_SLOT_HEIGHT, MIN_SLOT_HEIGHT};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const BIND_ADDRESS_KEYS: [&str; 2] = ["DAYPLANNER_BIND_ADDRESS", "BIND_ADDRESS"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub bind_address: String,
    /// Relative paths resolve against the workspace root.
    pub storage_dir: String,
    pub default_slot_height: u32,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: "DayPlanner".to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
            storage_dir: "storage".to_string(),
            default_slot_height: DEFAULT_SLOT_HEIGHT,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.app_name.trim().is_empty() {
            return Err(InfraError::InvalidConfig("appName must not be empty".to_string()));
        }
        if self.bind_address.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "bindAddress must not be empty".to_string(),
            ));
        }
        if self.storage_dir.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "storageDir must not be empty".to_string(),
            ));
        }
        if !(MIN_SLOT_HEIGHT..=MAX_SLOT_HEIGHT).contains(&self.default_slot_height) {
            return Err(InfraError::InvalidConfig(format!(
                "defaultSlotHeight must be within {MIN_SLOT_HEIGHT}..={MAX_SLOT_HEIGHT}"
            )));
        }
        Ok(())
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

/// Reads `app.json`, filling absent keys with defaults.
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let mut merged = serde_json::to_value(AppConfig::default())?;
    let parsed = read_config(&path)?;
    let (Some(target), Some(source)) = (merged.as_object_mut(), parsed.as_object()) else {
        return Err(InfraError::InvalidConfig(format!(
            "invalid object structure in {}",
            path.display()
        )));
    };
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }

    let config: AppConfig = serde_json::from_value(merged)?;
    config.validate()?;
    Ok(config)
}

/// Environment override for the listen address, falling back to the config.
pub fn resolve_bind_address<F>(config: &AppConfig, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(&lookup, &BIND_ADDRESS_KEYS)
        .unwrap_or_else(|| config.bind_address.trim().to_string())
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
