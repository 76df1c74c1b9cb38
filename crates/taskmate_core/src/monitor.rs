//! Overdue monitor: periodic background sweep over every stored task.
//!
//! # Responsibility
//! - On each tick, report pending tasks whose due date is before today.
//! - Run on its own thread without blocking foreground service calls.
//! - Shut down cooperatively when asked or when its handle is dropped.
//!
//! # Invariants
//! - The monitor never mutates task state.
//! - The database lock is held only while taking the snapshot; parsing and
//!   sink callbacks run after it is released.
//! - A malformed due date fails only its own row; the sweep continues.
//! - No ordering with concurrent foreground mutations is guaranteed: a task
//!   completed mid-sweep may still be reported by that sweep.
//!
//! # State machine
//! `Idle -> Scanning -> Idle` per tick; `Stopped` once the thread exits,
//! including when a sink panics mid-sweep.

use crate::clock::Clock;
use crate::db::Database;
use crate::model::account::AccountId;
use crate::model::task::{is_overdue, parse_due_date, TaskId};
use crate::repo::error::RepoResult;
use crate::repo::task_repo::{
    DueDateSnapshot, SnapshotRowError, SqliteTaskRepository, TaskRepository,
};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Tick interval used when none is configured.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

const MONITOR_THREAD_NAME: &str = "overdue-monitor";

/// Receiver of overdue reports, implemented by the presentation shell.
pub trait OverdueSink: Send + Sync {
    fn notify_overdue(&self, task_id: TaskId, description: &str);
}

/// Sink that writes one warning log line per overdue task.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl OverdueSink for LogSink {
    fn notify_overdue(&self, task_id: TaskId, _description: &str) {
        warn!("event=task_overdue module=monitor task_id={task_id}");
    }
}

/// Overdue report forwarded over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueNotice {
    pub task_id: TaskId,
    pub description: String,
}

/// Sink that forwards reports to a shell event loop.
///
/// Reports are dropped silently once the receiver is gone.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<OverdueNotice>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<OverdueNotice>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl OverdueSink for ChannelSink {
    fn notify_overdue(&self, task_id: TaskId, description: &str) {
        let _ = self.sender.send(OverdueNotice {
            task_id,
            description: description.to_string(),
        });
    }
}

/// Per-task failure to parse a stored due date during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateParseError {
    pub task_id: TaskId,
    pub owner: AccountId,
    pub value: String,
}

impl Display for DueDateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} has unparseable due date `{}`",
            self.task_id, self.value
        )
    }
}

impl Error for DueDateParseError {}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows examined, including completed and undecodable ones.
    pub scanned: usize,
    /// Tasks reported to the sink, in insertion order.
    pub overdue: Vec<TaskId>,
    /// Rows skipped because their due date did not parse.
    pub parse_errors: Vec<DueDateParseError>,
    /// Rows skipped because their id, owner or text columns did not decode.
    pub row_errors: Vec<SnapshotRowError>,
}

/// Observable monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Scanning,
    Stopped,
}

impl MonitorState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Scanning => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Scanning,
            _ => Self::Stopped,
        }
    }
}

/// Periodic overdue scanner over the shared database.
pub struct OverdueMonitor {
    db: Database,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn OverdueSink>,
    interval: Duration,
    state: Arc<AtomicU8>,
}

impl OverdueMonitor {
    /// Creates a monitor ticking every [`DEFAULT_SCAN_INTERVAL`].
    pub fn new(db: Database, clock: Arc<dyn Clock>, sink: Arc<dyn OverdueSink>) -> Self {
        Self {
            db,
            clock,
            sink,
            interval: DEFAULT_SCAN_INTERVAL,
            state: Arc::new(AtomicU8::new(MonitorState::Idle.to_u8())),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Runs one tick synchronously.
    ///
    /// # Errors
    /// Only a failure to read the snapshot is returned; per-row problems are
    /// collected in [`SweepReport::parse_errors`].
    pub fn sweep(&self) -> RepoResult<SweepReport> {
        let started_at = Instant::now();
        self.set_state(MonitorState::Scanning);

        let snapshot = self
            .db
            .with_conn(|conn| SqliteTaskRepository::new(conn).due_date_snapshot());
        let result = snapshot.map(|snapshot| self.evaluate(snapshot));

        self.set_state(MonitorState::Idle);
        match &result {
            Ok(report) => info!(
                "event=overdue_sweep module=monitor status=ok scanned={} overdue={} parse_errors={} row_errors={} duration_ms={}",
                report.scanned,
                report.overdue.len(),
                report.parse_errors.len(),
                report.row_errors.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=overdue_sweep module=monitor status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Starts ticking on a background thread.
    ///
    /// The first sweep runs immediately, then once per interval.
    pub fn spawn(self) -> std::io::Result<MonitorHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let state = Arc::clone(&self.state);
        let join = thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_string())
            .spawn(move || self.run(stop_rx))?;

        Ok(MonitorHandle {
            stop_tx: Some(stop_tx),
            join: Some(join),
            state,
        })
    }

    fn run(self, stop_rx: Receiver<()>) {
        let _exit = StoppedOnExit(Arc::clone(&self.state));
        info!(
            "event=monitor_start module=monitor status=ok interval_ms={}",
            self.interval.as_millis()
        );
        loop {
            // Snapshot failures are already logged; the next tick retries.
            let _ = self.sweep();
            match stop_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("event=monitor_stop module=monitor status=ok");
    }

    fn evaluate(&self, snapshot: DueDateSnapshot) -> SweepReport {
        let today = self.clock.today();
        let mut report = SweepReport {
            scanned: snapshot.row_errors.len(),
            ..SweepReport::default()
        };

        for row_error in snapshot.row_errors {
            warn!(
                "event=overdue_sweep module=monitor status=error error_code=row_decode rowid={}",
                row_error.rowid
            );
            report.row_errors.push(row_error);
        }

        for record in snapshot.records {
            report.scanned += 1;
            if record.completed {
                continue;
            }
            match parse_due_date(&record.due_date) {
                Ok(due_date) if is_overdue(due_date, record.completed, today) => {
                    self.sink
                        .notify_overdue(record.task_id, record.description.as_str());
                    report.overdue.push(record.task_id);
                }
                Ok(_) => {}
                Err(_) => {
                    warn!(
                        "event=overdue_sweep module=monitor status=error error_code=due_date_parse task_id={}",
                        record.task_id
                    );
                    report.parse_errors.push(DueDateParseError {
                        task_id: record.task_id,
                        owner: record.owner,
                        value: record.due_date,
                    });
                }
            }
        }

        report
    }

    fn set_state(&self, state: MonitorState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }
}

/// Marks the monitor `Stopped` when the thread leaves `run`, unwinding or not.
struct StoppedOnExit(Arc<AtomicU8>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        self.0.store(MonitorState::Stopped.to_u8(), Ordering::SeqCst);
    }
}

/// Handle to a running monitor thread.
///
/// Dropping the handle stops the monitor. Do not stop it from inside an
/// [`OverdueSink`] callback; that would join the monitor thread on itself.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
    state: Arc<AtomicU8>,
}

impl MonitorHandle {
    pub fn state(&self) -> MonitorState {
        if !self.is_running() {
            return MonitorState::Stopped;
        }
        MonitorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Returns whether the monitor thread is still alive.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stops accepting ticks and waits for the thread to exit.
    ///
    /// A sweep already in progress is allowed to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread with `Disconnected`.
        drop(self.stop_tx.take());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("event=monitor_stop module=monitor status=error error_code=thread_panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
