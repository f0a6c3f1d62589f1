//! Query worker: runs one batch of statements off the UI thread.
//!
//! Each submission gets its own named OS thread. The thread runs the batch
//! against the shared [`Engine`] and sends exactly one [`QueryOutcome`] back
//! over an unbounded channel; the UI loop picks it up with a non-blocking
//! receive on its next tick. There is no retry, cancellation or timeout.

use quackview_engine::{Engine, PageRequest, QueryResult, StatementKind};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Sending half handed to each worker.
pub type OutcomeSender = mpsc::UnboundedSender<QueryOutcome>;

/// Receiving half owned by the controller.
pub type OutcomeReceiver = mpsc::UnboundedReceiver<QueryOutcome>;

/// Create the worker → controller channel.
pub fn outcome_channel() -> (OutcomeSender, OutcomeReceiver) {
    mpsc::unbounded_channel()
}

/// A batch of statements to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Submission id, echoed in the outcome
    pub id: u64,
    /// Statements in execution order; only the last one's result is kept
    pub statements: Vec<String>,
    /// Page of the last statement to return
    pub page: PageRequest,
}

impl QueryRequest {
    /// The batch as one SQL string.
    pub fn sql(&self) -> String {
        self.statements.join(";\n")
    }

    /// True when any statement may create, drop or rename catalog objects.
    pub fn changes_catalog(&self) -> bool {
        self.statements
            .iter()
            .any(|s| StatementKind::classify(s).changes_catalog())
    }
}

/// What a worker reports back. Consumed once by the controller.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub id: u64,
    pub sql: String,
    /// The result of the last statement, or the engine's error message
    pub result: Result<QueryResult, String>,
    pub changed_catalog: bool,
    pub page: PageRequest,
    /// The full request, in execution order
    pub statements: Vec<String>,
    /// `database.schema` after the batch ran; `USE` inside a batch moves it
    pub context: Option<String>,
}

/// Handle to a running worker thread.
#[derive(Debug)]
pub struct QueryWorker {
    id: u64,
    started: Instant,
    handle: JoinHandle<()>,
}

impl QueryWorker {
    /// Start executing `request` on a new thread.
    pub fn spawn(
        engine: Engine,
        request: QueryRequest,
        tx: OutcomeSender,
    ) -> std::io::Result<Self> {
        let id = request.id;
        let started = Instant::now();
        info!(query_id = id, statements = request.statements.len(), "Starting query worker");

        let handle = thread::Builder::new()
            .name("query-worker".to_string())
            .spawn(move || {
                let outcome = run_request(&engine, request);
                if tx.send(outcome).is_err() {
                    debug!(query_id = id, "Controller gone; dropping query outcome");
                }
            })?;

        Ok(Self {
            id,
            started,
            handle,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once the thread has exited (its outcome, if any, is in the channel).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Execute a request on the calling thread, turning errors and panics into
/// an error outcome.
pub fn run_request(engine: &Engine, request: QueryRequest) -> QueryOutcome {
    let sql = request.sql();
    let changed_catalog = request.changes_catalog();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.execute_script(&request.statements, request.page)
    }));

    let result = match result {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => {
            debug!(query_id = request.id, error = %e, "Query failed");
            Err(e.detail())
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(query_id = request.id, panic = %detail, "Query worker panicked");
            Err(format!("Query worker panicked: {}", detail))
        }
    };

    // Read after failures too: a USE before the failing statement still applied.
    let context = engine.context().ok();

    QueryOutcome {
        id: request.id,
        sql,
        result,
        changed_catalog,
        page: request.page,
        statements: request.statements,
        context,
    }
}
