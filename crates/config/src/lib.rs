//! Mailsheet config directory
//!
//! Everything mailsheet keeps between runs lives in `~/.config/mailsheet/`:
//! - `settings.json`: sync settings (page size, budget, run token, listener)
//! - `google-credentials.json`: OAuth client ID and secret
//! - `gmail-tokens.json`: access and refresh tokens from the OAuth flow
//! - `mailsheet.db`: the default SQLite sheet
//!
//! The relay binary calls [`init`] at startup so the directory exists before
//! tokens or the database are written.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Create the config directory if needed and return its path
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the mailsheet config directory (~/.config/mailsheet/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mailsheet"))
}

/// Path of `filename` inside the config directory, e.g. `settings.json`
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Read `settings.json` or another JSON file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Read a JSON file from anywhere, such as a credentials file named by the user
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Whether `filename` is present, e.g. before falling back to defaults
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Ensure the mailsheet config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Write `value` as pretty JSON into the config directory, creating it first
pub fn save_json<T: serde::Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = ensure_config_dir()?;
    let path = dir.join(filename);
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("mailsheet"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("settings.json");
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("mailsheet/settings.json"));
    }

    #[test]
    fn test_load_json_file() {
        let dir = std::env::temp_dir().join(format!("mailsheet-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("google-credentials.json");
        std::fs::write(&path, r#"{"client_id":"abc"}"#).unwrap();

        let value: serde_json::Value = load_json_file(&path).unwrap();
        assert_eq!(value["client_id"], "abc");
        assert!(load_json_file::<serde_json::Value>(&dir.join("missing.json")).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
