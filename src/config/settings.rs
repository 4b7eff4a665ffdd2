//! Service settings loaded from config.toml
//!
//! Every field has a default, so a missing or partial file still yields a
//! usable configuration. Roles and categories listed here are seeded into the
//! database at startup when they are missing.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// HTTP server settings
    pub server: ServerSettings,
    /// Listing settings
    pub listing: ListingSettings,
    /// Operator roles to seed
    pub roles: Vec<RoleSeed>,
    /// Product categories to seed
    pub categories: Vec<CategorySeed>,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `0.0.0.0:3000`
    pub address: String,
}

/// Pagination settings for list endpoints
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ListingSettings {
    /// Rows per page
    pub page_size: u64,
}

/// A role that must exist
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RoleSeed {
    /// Role name
    pub name: String,
}

/// A category that must exist
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategorySeed {
    /// Category name
    pub name: String,
}

/// Name of the role with full access.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";
/// Role given to newly registered operators.
pub const EMPLOYEE_ROLE: &str = "Employee";

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            listing: ListingSettings::default(),
            roles: vec![
                RoleSeed {
                    name: ADMINISTRATOR_ROLE.to_string(),
                },
                RoleSeed {
                    name: EMPLOYEE_ROLE.to_string(),
                },
            ],
            categories: Vec::new(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - `listing.page_size` is zero
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_settings(&contents)
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if settings.listing.page_size == 0 {
        return Err(Error::Config {
            message: "listing.page_size must be at least 1".to_string(),
        });
    }

    Ok(settings)
}

/// Loads settings from `CONFIG_PATH` (default `./config.toml`).
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        tracing::warn!("Config file {path} not found, using defaults");
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let toml_str = r#"
            [server]
            address = "0.0.0.0:8080"

            [listing]
            page_size = 10

            [[roles]]
            name = "Administrator"

            [[roles]]
            name = "Baker"

            [[categories]]
            name = "Cakes"
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.server.address, "0.0.0.0:8080");
        assert_eq!(settings.listing.page_size, 10);
        assert_eq!(settings.roles.len(), 2);
        assert_eq!(settings.roles[1].name, "Baker");
        assert_eq!(settings.categories[0].name, "Cakes");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.listing.page_size, 5);
        assert!(settings.roles.iter().any(|r| r.name == EMPLOYEE_ROLE));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = parse_settings("[listing]\npage_size = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = parse_settings("[server\naddress = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
