use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from ~/.config/schoolshelf/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Location of the SQLite library database
    pub path: Option<PathBuf>,
}

/// Credentials and limits for the bibliographic web services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub google_api_key: Option<String>,
    pub ebay_appname: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            ebay_appname: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Rows per page for listings
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_per_page() -> i64 {
    15
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

/// Barcode image preprocessing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Images with a side longer than this are shrunk before the first scan
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// (width, height) used when shrinking
    #[serde(default = "default_first_size")]
    pub first_size: (u32, u32),
    /// (width, height) for the final retry
    #[serde(default = "default_second_size")]
    pub second_size: (u32, u32),
    #[serde(default = "default_contrast_factor")]
    pub contrast_factor: f32,
}

fn default_max_dimension() -> u32 {
    850
}

fn default_first_size() -> (u32, u32) {
    (500, 700)
}

fn default_second_size() -> (u32, u32) {
    (700, 500)
}

fn default_contrast_factor() -> f32 {
    2.0
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            first_size: default_first_size(),
            second_size: default_second_size(),
            contrast_factor: default_contrast_factor(),
        }
    }
}

impl Config {
    /// Load configuration from the default path (~/.config/schoolshelf/config.toml)
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("schoolshelf").join("config.toml"))
    }

    /// Get the database path, with CLI override taking precedence
    pub fn database_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(ref path) = self.database.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("schoolshelf").join("library.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.database.path.is_none());
        assert!(config.api.google_api_key.is_none());
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.library.per_page, 15);
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[database]
path = "/srv/library/library.db"

[api]
google_api_key = "abc"
ebay_appname = "school-app"

[library]
per_page = 25
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/srv/library/library.db"))
        );
        assert_eq!(config.api.google_api_key.as_deref(), Some("abc"));
        assert_eq!(config.api.ebay_appname.as_deref(), Some("school-app"));
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.library.per_page, 25);
    }

    #[test]
    fn test_scanner_defaults_and_overrides() {
        let config = Config::default();
        assert_eq!(config.scanner.max_dimension, 850);
        assert_eq!(config.scanner.first_size, (500, 700));
        assert_eq!(config.scanner.second_size, (700, 500));
        assert_eq!(config.scanner.contrast_factor, 2.0);

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[scanner]
max_dimension = 1200
first_size = [600, 800]
"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scanner.max_dimension, 1200);
        assert_eq!(config.scanner.first_size, (600, 800));
        assert_eq!(config.scanner.second_size, (700, 500));
    }

    #[test]
    fn test_database_path_cli_override() {
        let config = Config {
            database: DatabaseConfig {
                path: Some(PathBuf::from("/from/config.db")),
            },
            ..Default::default()
        };

        assert_eq!(
            config.database_path(Some(Path::new("/cli/library.db"))).unwrap(),
            PathBuf::from("/cli/library.db")
        );
        assert_eq!(
            config.database_path(None).unwrap(),
            PathBuf::from("/from/config.db")
        );
    }

    #[test]
    fn test_load_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[library]\nper_page = \"many\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
