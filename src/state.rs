//! UI state persistence
//!
//! Saves and loads the theme, page size and recently opened files to
//! `~/.quackview/ui-state.json`.

use crate::config::RECENT_FILES_LIMIT;
use crate::error::Result;
use crate::theme::Theme;
use quackview_engine::FileFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current version of the state file format
const STATE_VERSION: u32 = 1;

/// Persistent state saved between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    /// Schema version for future migrations
    pub version: u32,
    pub theme: Theme,
    /// Last page size chosen with `:pagesize`
    pub page_size: Option<usize>,
    /// Most recently loaded files, newest first
    pub recent_files: Vec<RecentFile>,
}

/// A file loaded in an earlier session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            theme: Theme::default(),
            page_size: None,
            recent_files: Vec::new(),
        }
    }
}

impl UiState {
    /// Returns the path to the state file: `~/.quackview/ui-state.json`
    pub fn state_file_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".quackview").join("ui-state.json"))
    }

    /// Load state from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::state_file_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load state from `path`, returning defaults if the file doesn't exist
    /// or is invalid
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    /// Save state to the default location
    pub fn save(&self) -> Result<()> {
        match Self::state_file_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()), // No home directory, silently skip
        }
    }

    /// Save state to `path`, creating parent directories if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Record a loaded file at the front of the recent list.
    pub fn remember_file(&mut self, path: &Path, format: FileFormat) {
        self.recent_files.retain(|f| f.path != path);
        self.recent_files.insert(
            0,
            RecentFile {
                path: path.to_path_buf(),
                format,
            },
        );
        self.recent_files.truncate(RECENT_FILES_LIMIT);
    }
}
