use anyhow::Result;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "TreeCopy";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "treecopy", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
///
/// `dir_override` replaces the platform directory (tests, `--config-dir`).
pub fn get_config_file_path(dir_override: Option<&Path>) -> Option<PathBuf> {
    resolve_directory(dir_override).map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_directory(dir_override: Option<&Path>) -> Option<PathBuf> {
    match dir_override {
        Some(dir) => Some(dir.to_path_buf()),
        None => get_config_directory(),
    }
}

/// Loads the application configuration from the config file.
/// If the file doesn't exist, it creates a default one.
/// If the file is corrupted or cannot be parsed, it logs a warning
/// and falls back to the default configuration to prevent a crash.
pub fn load_config(dir_override: Option<&Path>) -> Result<AppConfig> {
    let config_path = get_config_file_path(dir_override)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, dir_override)?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            migrate_legacy_config(&config_content).or_else(|_| Ok(AppConfig::default()))
        }
    }
}

/// Fills fields missing from an older config file with their defaults.
///
/// Also accepts the bare `pathHistory` array and `theme` string that earlier
/// front ends kept as separate key-value entries.
fn migrate_legacy_config(config_content: &str) -> Result<AppConfig> {
    let mut value: Value = serde_json::from_str(config_content)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Config is not a JSON object"))?;

    if let Some(history) = obj.remove("pathHistory") {
        obj.entry("path_history").or_insert(history);
    }

    let defaults = serde_json::to_value(AppConfig::default())?;
    let default_obj = defaults
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("Default config is not a JSON object"))?;

    // Insert a default wherever the key is missing or null.
    for (key, default_val) in default_obj {
        if obj.get(key).is_none_or(Value::is_null) {
            obj.insert(key.clone(), default_val.clone());
        }
    }

    let migrated_config: AppConfig = serde_json::from_value(Value::Object(obj.clone()))?;
    tracing::info!("Successfully migrated legacy config");
    Ok(migrated_config)
}

/// Saves the provided configuration to the config file.
pub fn save_config(config: &AppConfig, dir_override: Option<&Path>) -> Result<()> {
    let config_dir = resolve_directory(dir_override)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        tracing::info!("Created config directory: {:?}", config_dir);
    }

    let config_path = config_dir.join(CONFIG_FILE);
    let config_json = serde_json::to_string_pretty(config)?;

    fs::write(&config_path, config_json)?;
    tracing::debug!("Saved config to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.treecopy.TreeCopy/
// Linux:   ~/.config/treecopy/
// Windows: %APPDATA%/treecopy/TreeCopy/config/
