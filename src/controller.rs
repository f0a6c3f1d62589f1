//! UI controller: the single owner of the engine connection and of all
//! displayed state.
//!
//! Every method runs on the main (UI) thread. Queries are handed to a
//! [`QueryWorker`]; their outcomes are applied in [`Controller::poll`], which
//! the UI loop calls every tick. File loads, catalog refreshes and table
//! operations run directly on the main thread and are refused while a query
//! is in flight, so the UI never waits on the engine lock.
//!
//! State machine: `Idle -> Running -> Idle`. A second submission while
//! `Running` is rejected with [`Submission::Busy`]; the run state only goes
//! back to `Idle` when `poll` consumes the outcome.

use crate::error::{QuackviewError, Result};
use crate::logging::{LogBuffer, LogEntry, LogLevel, MESSAGES_TARGET};
use crate::render::{RenderOptions, ResultGrid, SchemaTree};
use crate::worker::{outcome_channel, OutcomeReceiver, OutcomeSender, QueryOutcome, QueryRequest, QueryWorker};
use quackview_engine::{
    completion_names, split_statements, CatalogTable, ConnectionProfile, Engine, FileFormat,
    LoadedTable, PageRequest, QueryResult, StatementKind,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

/// Whether a query is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { id: u64, started: Instant },
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Nothing but whitespace and comments
    Empty,
    /// Only `USE` statements; the new `database.schema` context
    ContextSwitched(String),
    /// A worker was started with this id
    Started(u64),
    /// Rejected: a query is already running
    Busy,
    /// Rejected before reaching a worker (failed `USE`, nothing to page)
    Failed(String),
}

/// An outcome applied by [`Controller::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: u64,
    pub succeeded: bool,
}

/// Controller settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: usize,
    pub render: RenderOptions,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: PageRequest::default().page_size,
            render: RenderOptions::default(),
        }
    }
}

pub struct Controller {
    engine: Engine,
    tx: OutcomeSender,
    rx: OutcomeReceiver,
    worker: Option<QueryWorker>,
    next_id: u64,

    page_size: usize,
    render: RenderOptions,
    /// Last successful result and the statement that produced it
    current: Option<QueryResult>,
    last_query: Option<String>,
    grid: ResultGrid,

    catalog: Vec<CatalogTable>,
    tree: SchemaTree,
    context: String,

    messages: Arc<LogBuffer>,
    popup: Option<String>,
    loaded: Vec<LoadedTable>,
}

impl Controller {
    /// Open the in-memory engine. Failure here is fatal to the session.
    pub fn open(options: ControllerOptions, messages: Arc<LogBuffer>) -> Result<Self> {
        let engine = Engine::open_in_memory()?;
        Ok(Self::new(engine, options, messages))
    }

    pub fn new(engine: Engine, options: ControllerOptions, messages: Arc<LogBuffer>) -> Self {
        let (tx, rx) = outcome_channel();
        let context = engine.context().unwrap_or_else(|_| "memory.main".to_string());
        let controller = Self {
            engine,
            tx,
            rx,
            worker: None,
            next_id: 1,
            page_size: options.page_size.max(1),
            render: options.render,
            current: None,
            last_query: None,
            grid: ResultGrid::default(),
            catalog: Vec::new(),
            tree: SchemaTree::default(),
            context,
            messages,
            popup: None,
            loaded: Vec::new(),
        };
        controller.message(LogLevel::Info, "Connected to in-memory DuckDB database");
        controller
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Submit editor text for execution.
    ///
    /// A batch of only `USE` statements is applied immediately on this
    /// thread. Anything else goes to a worker with its `USE` statements left
    /// in place, and the outcome arrives via [`poll`](Self::poll).
    pub fn submit_query(&mut self, text: &str) -> Submission {
        if self.is_busy() {
            self.message(LogLevel::Warn, "A query is already running; please wait");
            return Submission::Busy;
        }

        let statements = split_statements(text);
        if statements.is_empty() {
            return Submission::Empty;
        }

        let targets: Vec<String> = statements
            .iter()
            .map_while(|stmt| match StatementKind::classify(stmt) {
                StatementKind::Use(target) => Some(target),
                _ => None,
            })
            .collect();
        if targets.len() == statements.len() {
            return self.switch_contexts(&targets);
        }

        let page = PageRequest::first(self.page_size);
        self.start(statements, page)
    }

    /// Apply a run of `USE` targets. All or nothing: on failure the context
    /// goes back to where it was.
    fn switch_contexts(&mut self, targets: &[String]) -> Submission {
        let previous = self.context.clone();
        for target in targets {
            if let Err(e) = self.switch_context(target) {
                if self.context != previous {
                    match self.engine.use_context(&previous) {
                        Ok(context) => self.context = context,
                        Err(restore) => {
                            warn!(error = %restore, context = %previous, "Failed to restore database context")
                        }
                    }
                }
                return Submission::Failed(e.user_message());
            }
        }
        self.refresh_schema_quietly();
        Submission::ContextSwitched(self.context.clone())
    }

    fn start(&mut self, statements: Vec<String>, page: PageRequest) -> Submission {
        let id = self.next_id;
        self.next_id += 1;
        let request = QueryRequest {
            id,
            statements,
            page,
        };
        debug!(query_id = id, sql = %request.sql(), "Submitting query");

        match QueryWorker::spawn(self.engine.clone(), request, self.tx.clone()) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.message(LogLevel::Info, "Executing query...");
                Submission::Started(id)
            }
            Err(e) => {
                let msg = format!("Failed to start query worker: {}", e);
                self.message(LogLevel::Error, &msg);
                Submission::Failed(msg)
            }
        }
    }

    /// Apply a finished worker's outcome, if there is one. Never blocks.
    pub fn poll(&mut self) -> Option<Completion> {
        let running_id = self.worker.as_ref()?.id();

        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => {
                // The worker sends before it exits, so a finished worker with
                // an empty channel never produced an outcome.
                let finished = self.worker.as_ref().is_some_and(QueryWorker::is_finished);
                match self.rx.try_recv() {
                    Ok(outcome) => outcome,
                    Err(_) if finished => {
                        self.worker = None;
                        self.message(LogLevel::Error, "Query error: worker exited without a result");
                        return Some(Completion {
                            id: running_id,
                            succeeded: false,
                        });
                    }
                    Err(_) => return None,
                }
            }
            Err(TryRecvError::Disconnected) => return None,
        };

        if outcome.id != running_id {
            debug!(query_id = outcome.id, running = running_id, "Ignoring stale query outcome");
            return None;
        }
        self.worker = None;
        Some(self.apply(outcome))
    }

    fn apply(&mut self, outcome: QueryOutcome) -> Completion {
        let id = outcome.id;
        let succeeded = match outcome.result {
            Ok(result) => {
                self.grid = ResultGrid::from_result(&result, &self.render);
                self.message(
                    LogLevel::Info,
                    &format!(
                        "Query executed successfully: {} ({} ms)",
                        self.grid.page_label, result.execution_time_ms
                    ),
                );
                self.current = Some(result);
                self.last_query = outcome.statements.last().cloned();
                true
            }
            Err(msg) => {
                self.message(LogLevel::Error, &format!("Query error: {}", msg));
                false
            }
        };
        if let Some(context) = outcome.context {
            if context != self.context {
                self.message(LogLevel::Info, &format!("Switched to database context: {}", context));
                self.context = context;
            }
        }
        // Statements before a failing one may still have changed the catalog.
        if outcome.changed_catalog {
            self.refresh_schema_quietly();
        }
        Completion { id, succeeded }
    }

    // ─── Paging ──────────────────────────────────────────────────────────

    pub fn next_page(&mut self) -> Submission {
        self.goto_page(|page, _| page.page_number.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Submission {
        self.goto_page(|page, _| page.page_number.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Submission {
        self.goto_page(|_, _| 0)
    }

    pub fn last_page(&mut self) -> Submission {
        self.goto_page(|page, total| page.total_pages(total) - 1)
    }

    fn goto_page(&mut self, target: impl Fn(&PageRequest, usize) -> usize) -> Submission {
        if self.is_busy() {
            return Submission::Busy;
        }
        let Some((page, total)) = self
            .current
            .as_ref()
            .and_then(|r| Some((r.page?, r.total_rows?)))
        else {
            return Submission::Failed("The current result is not paged".to_string());
        };
        let next = page.with_page(target(&page, total), total);
        if next == page {
            return Submission::Empty;
        }
        match self.last_query.clone() {
            Some(sql) => self.start(vec![sql], next),
            None => Submission::Failed("The current result is not paged".to_string()),
        }
    }

    /// Change the page size; a paged result is re-run from its first page.
    pub fn set_page_size(&mut self, page_size: usize) -> Submission {
        if page_size == 0 {
            return Submission::Failed("Page size must be at least 1".to_string());
        }
        if self.is_busy() {
            return Submission::Busy;
        }
        self.page_size = page_size;
        self.message(LogLevel::Info, &format!("Page size set to {}", page_size));
        let paged = self.current.as_ref().is_some_and(|r| r.page.is_some());
        match self.last_query.clone() {
            Some(sql) if paged => self.start(vec![sql], PageRequest::first(page_size)),
            _ => Submission::Empty,
        }
    }

    // ─── Files and catalog ───────────────────────────────────────────────

    /// Load a file as a new table. `format` defaults to the one implied by
    /// the extension.
    ///
    /// On failure the error is logged and kept as a popup message.
    pub fn load_file(&mut self, path: &Path, format: Option<FileFormat>) -> Result<LoadedTable> {
        self.ensure_idle()?;
        let Some(format) = format.or_else(|| FileFormat::from_path(path)) else {
            let msg = format!(
                "Cannot tell the format of {}; use :load <csv|excel|json|parquet> <path>",
                path.display()
            );
            self.message(LogLevel::Error, &msg);
            self.popup = Some(msg.clone());
            return Err(QuackviewError::Config(msg));
        };

        match self.engine.load_file(path, format) {
            Ok(loaded) => {
                self.message(
                    LogLevel::Info,
                    &format!(
                        "Loaded {} as table '{}' ({} rows)",
                        path.display(),
                        loaded.name,
                        loaded.row_count
                    ),
                );
                self.loaded.push(loaded.clone());
                self.refresh_schema_quietly();
                Ok(loaded)
            }
            Err(e) => {
                let msg = format!("Failed to load {}: {}", path.display(), e.detail());
                self.message(LogLevel::Error, &msg);
                self.popup = Some(msg);
                Err(e.into())
            }
        }
    }

    /// Re-read the catalog and rebuild the schema tree.
    pub fn refresh_schema(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let tables = self.engine.list_catalog()?;
        self.tree.rebuild(&tables);
        self.catalog = tables;
        if let Ok(context) = self.engine.context() {
            self.context = context;
        }
        debug!(tables = self.catalog.len(), "Schema refreshed");
        Ok(())
    }

    fn refresh_schema_quietly(&mut self) {
        if let Err(e) = self.refresh_schema() {
            warn!(error = %e, "Failed to refresh schema");
        }
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        self.report(self.engine.drop_table(name).map_err(Into::into), || {
            format!("Dropped '{}'", name)
        })?;
        self.refresh_schema_quietly();
        Ok(())
    }

    pub fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.ensure_idle()?;
        self.report(
            self.engine.rename_table(old_name, new_name).map_err(Into::into),
            || format!("Renamed '{}' to '{}'", old_name, new_name),
        )?;
        self.refresh_schema_quietly();
        Ok(())
    }

    /// Attach a saved connection profile.
    pub fn attach(&mut self, profile: &ConnectionProfile) -> Result<()> {
        self.ensure_idle()?;
        self.report(self.engine.attach(profile).map_err(Into::into), || {
            format!("Connected to {} ({})", profile.name, profile.db_type)
        })?;
        self.refresh_schema_quietly();
        Ok(())
    }

    pub fn detach(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        self.report(self.engine.detach(name).map_err(Into::into), || {
            format!("Disconnected from {}", name)
        })?;
        self.refresh_schema_quietly();
        Ok(())
    }

    /// Switch the default database/schema.
    pub fn use_context(&mut self, target: &str) -> Result<String> {
        self.ensure_idle()?;
        self.switch_context(target)?;
        self.refresh_schema_quietly();
        Ok(self.context.clone())
    }

    fn switch_context(&mut self, target: &str) -> Result<()> {
        match self.engine.use_context(target) {
            Ok(context) => {
                self.message(LogLevel::Info, &format!("Switched to database context: {}", context));
                self.context = context;
                Ok(())
            }
            Err(e) => {
                self.message(LogLevel::Error, &format!("Error switching context: {}", e.detail()));
                Err(e.into())
            }
        }
    }

    /// Write the full (unpaged) result of the last query to `path`. The
    /// format follows the extension: `.csv`, `.json` or `.parquet`.
    pub fn export(&mut self, path: &Path) -> Result<()> {
        self.ensure_idle()?;
        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => "csv",
            Some("json") => "json",
            Some("parquet") => "parquet",
            _ => {
                let msg = "Export path must end in .csv, .json or .parquet".to_string();
                self.message(LogLevel::Error, &msg);
                return Err(QuackviewError::Config(msg));
            }
        };
        let Some(sql) = self.last_query.clone() else {
            let msg = "Nothing to export; run a query first".to_string();
            self.message(LogLevel::Error, &msg);
            return Err(QuackviewError::Config(msg));
        };
        self.report(
            self.engine.export_query(&sql, path, format).map_err(Into::into),
            || format!("Exported results to {}", path.display()),
        )
    }

    /// Clear the results grid.
    pub fn clear_results(&mut self) {
        self.grid = ResultGrid::default();
        self.current = None;
        self.last_query = None;
    }

    /// Close the engine. A still-running worker keeps its own handle and the
    /// connection closes when it finishes.
    pub fn shutdown(self) -> Result<()> {
        if let Some(worker) = &self.worker {
            warn!(query_id = worker.id(), "Shutting down with a query still running");
        }
        info!("Shutting down");
        let Self { engine, .. } = self;
        engine.close()?;
        Ok(())
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn is_busy(&self) -> bool {
        self.worker.is_some()
    }

    pub fn run_state(&self) -> RunState {
        match &self.worker {
            Some(worker) => RunState::Running {
                id: worker.id(),
                started: Instant::now() - worker.elapsed(),
            },
            None => RunState::Idle,
        }
    }

    /// How long the current query has been running.
    pub fn running_for(&self) -> Option<Duration> {
        self.worker.as_ref().map(QueryWorker::elapsed)
    }

    pub fn grid(&self) -> &ResultGrid {
        &self.grid
    }

    pub fn current_result(&self) -> Option<&QueryResult> {
        self.current.as_ref()
    }

    pub fn catalog(&self) -> &[CatalogTable] {
        &self.catalog
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SchemaTree {
        &mut self.tree
    }

    pub fn completion_names(&self) -> Vec<String> {
        completion_names(&self.catalog)
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn loaded_tables(&self) -> &[LoadedTable] {
        &self.loaded
    }

    pub fn messages(&self) -> &Arc<LogBuffer> {
        &self.messages
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    pub fn dismiss_popup(&mut self) {
        self.popup = None;
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            self.message(LogLevel::Warn, "A query is already running; please wait");
            return Err(QuackviewError::Busy);
        }
        Ok(())
    }

    /// Log the outcome of a main-thread operation.
    fn report(&self, result: Result<()>, success: impl FnOnce() -> String) -> Result<()> {
        match &result {
            Ok(()) => self.message(LogLevel::Info, &success()),
            Err(e) => self.message(LogLevel::Error, &format!("Error: {}", e.user_message())),
        }
        result
    }

    /// Add a user-facing line to the Messages panel.
    pub fn message(&self, level: LogLevel, text: &str) {
        self.messages
            .push(LogEntry::new(level, MESSAGES_TARGET, text));
        match level {
            LogLevel::Error => error!(target: MESSAGES_TARGET, "{}", text),
            LogLevel::Warn => warn!(target: MESSAGES_TARGET, "{}", text),
            LogLevel::Info => info!(target: MESSAGES_TARGET, "{}", text),
            LogLevel::Debug | LogLevel::Trace => debug!(target: MESSAGES_TARGET, "{}", text),
        }
    }
}
