//! Configuration merging utilities
//!
//! Values from the configuration file are applied only where the command
//! line (or environment) left an argument at its default.

use super::args::QuackviewArgs;
use super::defaults::*;
use super::file::ConfigFile;

/// Merge configuration file values with CLI arguments.
/// CLI arguments take precedence over config file values.
pub fn merge_config_with_args(mut args: QuackviewArgs, config: &ConfigFile) -> QuackviewArgs {
    macro_rules! apply_if_default {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(val) = $config_val {
                if args.$field == $default {
                    args.$field = val;
                }
            }
        };
    }

    macro_rules! apply_if_default_string {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref val) = $config_val {
                if args.$field == $default {
                    args.$field = val.clone();
                }
            }
        };
    }

    // UI section
    apply_if_default_string!(theme, config.ui.theme, DEFAULT_THEME);
    apply_if_default_string!(editor, config.ui.editor, DEFAULT_EDITOR);
    apply_if_default_string!(null_display, config.ui.null_display, DEFAULT_NULL_DISPLAY);
    apply_if_default!(
        max_cell_width,
        config.ui.max_cell_width,
        DEFAULT_MAX_CELL_WIDTH
    );

    // Query section
    apply_if_default!(page_size, config.query.page_size, DEFAULT_PAGE_SIZE);

    // Logging section
    apply_if_default_string!(log_level, config.logging.level, DEFAULT_LOG_LEVEL);
    if args.log_file.is_none() {
        args.log_file = config.logging.file.clone();
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_file() -> ConfigFile {
        toml::from_str(
            r#"
            [ui]
            theme = "green"
            null_display = "(null)"

            [query]
            page_size = 200

            [logging]
            level = "debug"
            file = "/tmp/qv.log"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_file_values_fill_defaults() {
        let merged = merge_config_with_args(QuackviewArgs::default(), &config_file());
        assert_eq!(merged.theme, "green");
        assert_eq!(merged.null_display, "(null)");
        assert_eq!(merged.page_size, 200);
        assert_eq!(merged.log_level, "debug");
        assert_eq!(merged.log_file, Some(PathBuf::from("/tmp/qv.log")));
        assert_eq!(merged.editor, DEFAULT_EDITOR);
    }

    #[test]
    fn test_cli_values_take_precedence() {
        let args = QuackviewArgs {
            theme: "dark".to_string(),
            page_size: 10,
            log_file: Some(PathBuf::from("cli.log")),
            ..QuackviewArgs::default()
        };
        let merged = merge_config_with_args(args, &config_file());
        assert_eq!(merged.theme, "dark");
        assert_eq!(merged.page_size, 10);
        assert_eq!(merged.log_file, Some(PathBuf::from("cli.log")));
    }
}
