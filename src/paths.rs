//! Common paths for SocialDesk data storage
//!
//! All data is stored under ~/.config/socialdesk/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted session and secrets
//! - socialdesk.sqlite - Document store

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the SocialDesk data directory (~/.config/socialdesk/)
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("socialdesk");
    fs::create_dir_all(&dir).context("Failed to create socialdesk directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/socialdesk/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/socialdesk/socialdesk.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("socialdesk.sqlite"))
}

/// Get the credentials file path (~/.config/socialdesk/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("credentials.enc"))
}
