//! Command-line arguments for quackview
//!
//! This module defines the CLI arguments structure using clap.

use clap::Parser;
use std::path::PathBuf;

use super::defaults::*;

/// Command-line arguments for quackview
#[derive(Parser, Debug, Clone)]
#[command(name = "quackview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query CSV, Excel, JSON and Parquet files with SQL in your terminal")]
pub struct QuackviewArgs {
    /// Path to configuration file (TOML format)
    /// If not specified, looks for quackview.toml in the current directory,
    /// then in ~/.config/quackview/
    #[arg(short, long, env = "QUACKVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "QUACKVIEW_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Append logs to this file in addition to the Messages panel
    #[arg(long, env = "QUACKVIEW_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Rows per result page
    #[arg(long, env = "QUACKVIEW_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Color theme (light, dark, blue, green)
    #[arg(long, env = "QUACKVIEW_THEME", default_value = DEFAULT_THEME)]
    pub theme: String,

    /// SQL editor: "enhanced" (highlighting and completion), "plain", or
    /// "auto" to pick based on the terminal
    #[arg(long, env = "QUACKVIEW_EDITOR", default_value = DEFAULT_EDITOR)]
    pub editor: String,

    /// Text shown for NULL values in the results grid
    #[arg(long, env = "QUACKVIEW_NULL_DISPLAY", default_value = DEFAULT_NULL_DISPLAY)]
    pub null_display: String,

    /// Maximum width of a result cell before it is truncated
    #[arg(long, env = "QUACKVIEW_MAX_CELL_WIDTH", default_value_t = DEFAULT_MAX_CELL_WIDTH)]
    pub max_cell_width: usize,

    /// Files to load at startup (format inferred from the extension)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl Default for QuackviewArgs {
    fn default() -> Self {
        Self {
            config: None,
            generate_config: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
            page_size: DEFAULT_PAGE_SIZE,
            theme: DEFAULT_THEME.to_string(),
            editor: DEFAULT_EDITOR.to_string(),
            null_display: DEFAULT_NULL_DISPLAY.to_string(),
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
            files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_clap_defaults() {
        let parsed = QuackviewArgs::try_parse_from(["quackview"]).unwrap();
        let defaults = QuackviewArgs::default();
        assert_eq!(parsed.page_size, defaults.page_size);
        assert_eq!(parsed.theme, defaults.theme);
        assert_eq!(parsed.editor, defaults.editor);
        assert_eq!(parsed.null_display, defaults.null_display);
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn test_positional_files_and_flags() {
        let parsed = QuackviewArgs::try_parse_from([
            "quackview",
            "--page-size",
            "50",
            "--theme",
            "dark",
            "a.csv",
            "b.parquet",
        ])
        .unwrap();
        assert_eq!(parsed.page_size, 50);
        assert_eq!(parsed.theme, "dark");
        assert_eq!(
            parsed.files,
            vec![PathBuf::from("a.csv"), PathBuf::from("b.parquet")]
        );
    }
}
