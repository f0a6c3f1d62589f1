//! Configuration file support for quackview
//!
//! ## Priority Order
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! ## Example Configuration
//!
//! ```toml
//! # quackview.toml
//!
//! [ui]
//! theme = "dark"
//! editor = "auto"
//! null_display = "∅"
//!
//! [query]
//! page_size = 500
//!
//! [logging]
//! level = "info"
//! panel_level = "warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::defaults::CONFIG_FILE_NAME;
use crate::error::{QuackviewError, Result};

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Terminal UI configuration
    pub ui: UiSection,

    /// Query execution configuration
    pub query: QuerySection,

    /// Logging configuration
    pub logging: LoggingSection,
}

/// UI section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// Color theme (light, dark, blue, green)
    pub theme: Option<String>,

    /// Editor preference (auto, enhanced, plain)
    pub editor: Option<String>,

    /// Text shown for NULL cells
    pub null_display: Option<String>,

    /// Maximum result cell width
    pub max_cell_width: Option<usize>,

    /// Poll interval of the UI loop in milliseconds
    pub tick_ms: Option<u64>,
}

/// Query section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySection {
    /// Rows per result page
    pub page_size: Option<usize>,
}

/// Logging section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,

    /// Lowest level of log events copied into the Messages panel
    pub panel_level: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            QuackviewError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            QuackviewError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Try to load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./quackview.toml
    /// 2. ~/.config/quackview/quackview.toml
    pub fn load_default() -> Option<Self> {
        let default_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            dirs::config_dir()
                .map(|p| p.join("quackview").join(CONFIG_FILE_NAME))
                .unwrap_or_default(),
        ];

        for path in default_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        None
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# quackview configuration file
# Copy to quackview.toml (or ~/.config/quackview/quackview.toml)
#
# Configuration priority (highest to lowest):
# 1. Command-line arguments
# 2. Environment variables (QUACKVIEW_*)
# 3. This configuration file
# 4. Default values

[ui]
# Color theme: light, dark, blue, green
theme = "light"

# SQL editor: auto, enhanced, plain
# "auto" uses the enhanced editor unless NO_COLOR is set
editor = "auto"

# Text shown for NULL values
null_display = "NULL"

# Cells wider than this are truncated with an ellipsis
max_cell_width = 40

# UI poll interval in milliseconds
tick_ms = 100

[query]
# Rows per result page
page_size = 1000

[logging]
# Log level (trace, debug, info, warn, error)
level = "info"

# Also append logs to a file
# file = "/tmp/quackview.log"

# Lowest level of internal log events shown in the Messages panel
panel_level = "warn"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert!(config.ui.theme.is_none());
        assert!(config.query.page_size.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            [ui]
            theme = "dark"
            null_display = "-"

            [query]
            page_size = 250

            [logging]
            level = "debug"
            file = "/tmp/qv.log"
        "#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.ui.theme, Some("dark".to_string()));
        assert_eq!(config.ui.null_display, Some("-".to_string()));
        assert_eq!(config.query.page_size, Some(250));
        assert_eq!(config.logging.level, Some("debug".to_string()));
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/qv.log")));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\npage_size = \"many\"").unwrap();
        let err = ConfigFile::load(file.path()).unwrap_err();
        assert!(matches!(err, QuackviewError::Config(_)));
    }

    #[test]
    fn test_generate_example_is_valid_toml() {
        let example = ConfigFile::generate_example();
        let config: ConfigFile = toml::from_str(&example).unwrap();
        assert_eq!(config.query.page_size, Some(1000));
    }
}
