//! Configuration module for quackview
//!
//! - `defaults` - Default constants and values
//! - `args` - CLI argument definitions
//! - `file` - TOML configuration file
//! - `merge` - Applying file values under CLI arguments

mod args;
mod defaults;
pub mod file;
mod merge;

pub use args::QuackviewArgs;
pub use defaults::*;
pub use file::ConfigFile;
pub use merge::merge_config_with_args;

use crate::editor::EditorPreference;
use crate::error::{QuackviewError, Result};
use crate::logging::LogLevel;
use crate::theme::Theme;
use std::path::PathBuf;

/// Resolved application configuration.
///
/// Built from [`QuackviewArgs`] after the configuration file has been merged
/// in; every field has been parsed and validated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Lowest level of internal log events shown in the Messages panel
    pub panel_log_level: LogLevel,
    pub page_size: usize,
    pub theme: Theme,
    pub editor: EditorPreference,
    pub null_display: String,
    pub max_cell_width: usize,
    pub tick_ms: u64,
    /// Files to load at startup
    pub files: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
            panel_log_level: LogLevel::Warn,
            page_size: DEFAULT_PAGE_SIZE,
            theme: Theme::default(),
            editor: EditorPreference::default(),
            null_display: DEFAULT_NULL_DISPLAY.to_string(),
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
            tick_ms: DEFAULT_TICK_MS,
            files: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from merged arguments and the (optional)
    /// configuration file for file-only settings.
    pub fn from_args(args: QuackviewArgs, file: Option<&ConfigFile>) -> Result<Self> {
        let theme = args
            .theme
            .parse::<Theme>()
            .map_err(QuackviewError::Config)?;
        let editor = args
            .editor
            .parse::<EditorPreference>()
            .map_err(QuackviewError::Config)?;

        let panel_level_str = file
            .and_then(|f| f.logging.panel_level.clone())
            .unwrap_or_else(|| DEFAULT_PANEL_LOG_LEVEL.to_string());
        let panel_log_level = LogLevel::parse(&panel_level_str).ok_or_else(|| {
            QuackviewError::Config(format!("Invalid panel log level: {}", panel_level_str))
        })?;

        let config = Self {
            log_level: args.log_level,
            log_file: args.log_file,
            panel_log_level,
            page_size: args.page_size,
            theme,
            editor,
            null_display: args.null_display,
            max_cell_width: args.max_cell_width,
            tick_ms: file
                .and_then(|f| f.ui.tick_ms)
                .unwrap_or(DEFAULT_TICK_MS),
            files: args.files,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(QuackviewError::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.max_cell_width < 4 {
            return Err(QuackviewError::Config(format!(
                "max_cell_width must be at least 4, got {}",
                self.max_cell_width
            )));
        }
        if !(10..=1000).contains(&self.tick_ms) {
            return Err(QuackviewError::Config(format!(
                "tick_ms must be between 10 and 1000, got {}",
                self.tick_ms
            )));
        }
        if LogLevel::parse(&self.log_level).is_none()
            && tracing_subscriber::EnvFilter::try_new(&self.log_level).is_err()
        {
            return Err(QuackviewError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_args() {
        let config = AppConfig::from_args(QuackviewArgs::default(), None).unwrap();
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.editor, EditorPreference::Auto);
        assert_eq!(config.null_display, "NULL");
        assert_eq!(config.panel_log_level, LogLevel::Warn);
        assert_eq!(config.tick_ms, DEFAULT_TICK_MS);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_theme = QuackviewArgs {
            theme: "neon".into(),
            ..QuackviewArgs::default()
        };
        assert!(matches!(
            AppConfig::from_args(bad_theme, None),
            Err(QuackviewError::Config(_))
        ));

        let zero_page = QuackviewArgs {
            page_size: 0,
            ..QuackviewArgs::default()
        };
        assert!(AppConfig::from_args(zero_page, None).is_err());
    }

    #[test]
    fn test_file_only_settings() {
        let file: ConfigFile = toml::from_str(
            r#"
            [ui]
            tick_ms = 50
            [logging]
            panel_level = "info"
            "#,
        )
        .unwrap();
        let config = AppConfig::from_args(QuackviewArgs::default(), Some(&file)).unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.panel_log_level, LogLevel::Info);
    }
}
