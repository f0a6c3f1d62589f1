//! Default constants for quackview configuration
//!
//! These values are used when neither the command line, the environment nor
//! a configuration file provides one.

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default minimum level of log events shown in the Messages panel
pub const DEFAULT_PANEL_LOG_LEVEL: &str = "warn";

/// Default rows per result page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: usize = 1_000_000;

/// Default color theme ("light", "dark", "blue", "green")
pub const DEFAULT_THEME: &str = "light";

/// Default editor preference ("auto", "enhanced", "plain")
pub const DEFAULT_EDITOR: &str = "auto";

/// Default text shown for NULL cells
pub const DEFAULT_NULL_DISPLAY: &str = "NULL";

/// Default maximum width of a result cell, in characters
pub const DEFAULT_MAX_CELL_WIDTH: usize = 40;

/// Default UI tick (poll interval) in milliseconds
pub const DEFAULT_TICK_MS: u64 = 100;

/// Number of recently opened files remembered across runs
pub const RECENT_FILES_LIMIT: usize = 10;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "quackview.toml";
