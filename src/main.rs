//! quackview: query CSV, Excel, JSON and Parquet files with SQL in the terminal.

use clap::Parser;
use quackview::config::{merge_config_with_args, AppConfig, ConfigFile, DEFAULT_PAGE_SIZE};
use quackview::controller::{Controller, ControllerOptions};
use quackview::editor::EditorCapability;
use quackview::logging::{init_logging, LogBuffer};
use quackview::profiles::ProfileStore;
use quackview::render::RenderOptions;
use quackview::state::UiState;
use quackview::theme::Theme;
use quackview::tui::{self, App, TuiOptions};
use quackview::{QuackviewArgs, Result};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("quackview failed: {e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let mut args = QuackviewArgs::parse();

    if args.generate_config {
        println!("{}", ConfigFile::generate_example());
        return Ok(());
    }

    // Load configuration file if specified or from default locations
    let config_file = match args.config {
        Some(ref path) => Some(ConfigFile::load(path)?),
        None => ConfigFile::load_default(),
    };
    if let Some(ref config) = config_file {
        args = merge_config_with_args(args, config);
    }
    let config = AppConfig::from_args(args, config_file.as_ref())?;

    let log_buffer = LogBuffer::new_shared();
    init_logging(
        &config.log_level,
        config.panel_log_level,
        config.log_file.as_deref(),
        log_buffer.clone(),
    )?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting quackview");

    // Saved preferences apply only where the configuration left the default.
    let ui_state = UiState::load();
    let theme = if config.theme == Theme::default() {
        ui_state.theme
    } else {
        config.theme
    };
    let page_size = if config.page_size == DEFAULT_PAGE_SIZE {
        ui_state.page_size.unwrap_or(config.page_size)
    } else {
        config.page_size
    };

    let options = ControllerOptions {
        page_size,
        render: RenderOptions {
            null_display: config.null_display.clone(),
            max_cell_width: config.max_cell_width,
        },
    };
    let controller = match Controller::open(options, log_buffer) {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "Failed to open the in-memory database");
            return Err(e);
        }
    };

    let editor = EditorCapability::detect_from_env(config.editor);
    info!(editor = editor.label(), theme = %theme, page_size, "Configuration applied");

    let mut app = App::new(
        controller,
        TuiOptions {
            theme,
            tick: Duration::from_millis(config.tick_ms),
            editor,
        },
        ui_state,
        ProfileStore::load(),
    );

    for path in &config.files {
        app.load(path, None);
    }

    let result = tui::run(&mut app);

    let (controller, ui_state) = app.into_parts();
    if let Err(e) = ui_state.save() {
        warn!(error = %e, "Failed to save UI state");
    }
    controller.shutdown()?;
    result
}
