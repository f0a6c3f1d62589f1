#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # quackview
//!
//! A terminal front-end for an embedded DuckDB database. Load CSV, Excel,
//! JSON and Parquet files as tables, browse them in a schema tree and query
//! them with SQL.
//!
//! ## Features
//!
//! - **File loading**: each file becomes a table named after the file
//! - **Background queries**: SQL runs on a worker thread; the UI stays live
//! - **Paged results**: large results are fetched one page at a time
//! - **Remote databases**: attach MySQL, PostgreSQL or SQLite via saved profiles
//! - **Themes and persisted preferences**
//!
//! ## Library Usage
//!
//! The [`Controller`] can be driven without a terminal:
//!
//! ```no_run
//! use quackview::controller::{Controller, ControllerOptions, Submission};
//! use quackview::logging::LogBuffer;
//!
//! fn main() -> quackview::Result<()> {
//!     let mut controller = Controller::open(ControllerOptions::default(), LogBuffer::new_shared())?;
//!     if let Submission::Started(_) = controller.submit_query("SELECT 42 AS answer") {
//!         while controller.poll().is_none() {
//!             std::thread::sleep(std::time::Duration::from_millis(10));
//!         }
//!     }
//!     println!("{:?}", controller.grid().rows);
//!     controller.shutdown()
//! }
//! ```

pub mod commands;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod logging;
pub mod profiles;
pub mod render;
pub mod state;
pub mod theme;
pub mod tui;
pub mod worker;

pub use config::{AppConfig, QuackviewArgs};
pub use controller::{Completion, Controller, ControllerOptions, RunState, Submission};
pub use error::{QuackviewError, Result};
pub use quackview_engine::{Engine, FileFormat, QueryResult};
pub use render::{RenderOptions, ResultGrid, SchemaTree};
pub use theme::Theme;
