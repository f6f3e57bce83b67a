//! Periodic task scheduler with a global concurrency cap of one.
//!
//! All task bodies run on a single worker thread, so a task is never
//! re-entered and no two bodies ever overlap. A timer firing or a manual
//! `run_now` that arrives while a body is running waits in line; missed
//! timer periods for the same task collapse into one pending run. After
//! every timer run one queued manual run is served before the next timer,
//! so a body slower than its period cannot starve `run_now`.
//!
//! A body that returns `Err` (or panics) is treated as fatal: the fault hook
//! is invoked once and the worker stops.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;

use crate::core::errors::{DashError, Result};

/// Name of the hourly layout task.
pub const LAYOUT_REFRESH: &str = "layout-refresh";
/// Name of the per-refresh datasource task.
pub const DATA_SYNC: &str = "data-sync";

/// What caused a body to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
}

pub type TaskBody = Box<dyn FnMut(Trigger) -> Result<()> + Send>;
pub type FaultHook = Box<dyn FnOnce(&str, DashError) + Send>;

/// A named periodic task.
pub struct ScheduledTask {
    pub name: String,
    pub period: Duration,
    body: TaskBody,
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// Builder collecting tasks before the worker starts.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    on_fault: Option<FaultHook>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task that fires at start and then every `period`.
    #[must_use]
    pub fn every<F>(mut self, name: &str, period: Duration, body: F) -> Self
    where
        F: FnMut(Trigger) -> Result<()> + Send + 'static,
    {
        self.tasks.push(ScheduledTask {
            name: name.to_string(),
            period: period.max(Duration::from_millis(1)),
            body: Box::new(body),
        });
        self
    }

    /// Called once with the task name and error when a body fails.
    #[must_use]
    pub fn on_fault<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&str, DashError) + Send + 'static,
    {
        self.on_fault = Some(Box::new(hook));
        self
    }

    /// Spawn the worker thread.
    pub fn start(self) -> Result<SchedulerHandle> {
        let names: Arc<[String]> = self.tasks.iter().map(|t| t.name.clone()).collect();
        let shared = Arc::new(SharedStats::new(names.len()));
        let (tx, rx) = unbounded::<Command>();

        let worker_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("dashclock-scheduler".to_string())
            .spawn(move || {
                Worker {
                    tasks: self.tasks,
                    on_fault: self.on_fault,
                    rx,
                    stats: worker_shared,
                }
                .run();
            })
            .map_err(|e| DashError::Runtime {
                details: format!("failed to spawn scheduler thread: {e}"),
            })?;

        Ok(SchedulerHandle {
            tx,
            names,
            stats: shared,
            join: Arc::new(Mutex::new(Some(join))),
        })
    }
}

// ──────────────────── handle ────────────────────

enum Command {
    RunNow {
        index: usize,
        ack: Option<Sender<()>>,
    },
    Shutdown,
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// `(task name, completed runs)` in registration order.
    pub runs: Vec<(String, u64)>,
    /// Highest number of bodies observed executing at the same time.
    pub max_in_flight: usize,
    pub faulted: bool,
}

impl SchedulerStats {
    pub fn runs_of(&self, name: &str) -> u64 {
        self.runs
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0, |(_, count)| *count)
    }
}

struct SharedStats {
    runs: Vec<AtomicU64>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    faulted: AtomicBool,
}

impl SharedStats {
    fn new(tasks: usize) -> Self {
        Self {
            runs: (0..tasks).map(|_| AtomicU64::new(0)).collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            faulted: AtomicBool::new(false),
        }
    }
}

/// Cloneable control handle for a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: Sender<Command>,
    names: Arc<[String]>,
    stats: Arc<SharedStats>,
    join: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl SchedulerHandle {
    /// Queue an immediate run of `name` and return without waiting.
    pub fn run_now(&self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.send(Command::RunNow { index, ack: None })
    }

    /// Queue an immediate run of `name` and block until it has completed.
    ///
    /// Must not be called from inside a task body; the worker would wait on itself.
    pub fn run_now_wait(&self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let (ack_tx, ack_rx) = bounded(1);
        self.send(Command::RunNow {
            index,
            ack: Some(ack_tx),
        })?;
        ack_rx.recv().map_err(|_| DashError::ChannelClosed {
            component: "scheduler",
        })
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            runs: self
                .names
                .iter()
                .zip(self.stats.runs.iter())
                .map(|(name, count)| (name.clone(), count.load(Ordering::Relaxed)))
                .collect(),
            max_in_flight: self.stats.max_in_flight.load(Ordering::Relaxed),
            faulted: self.stats.faulted.load(Ordering::Relaxed),
        }
    }

    /// True while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.join
            .lock()
            .as_ref()
            .is_some_and(|join| !join.is_finished())
    }

    /// Stop the worker after the current body (if any) and join it.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(join) = self.join.lock().take() {
            let _ = join.join();
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DashError::UnknownTask {
                name: name.to_string(),
            })
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| DashError::ChannelClosed {
            component: "scheduler",
        })
    }
}

// ──────────────────── worker ────────────────────

struct Worker {
    tasks: Vec<ScheduledTask>,
    on_fault: Option<FaultHook>,
    rx: Receiver<Command>,
    stats: Arc<SharedStats>,
}

impl Worker {
    fn run(mut self) {
        let start = Instant::now();
        // Every task fires once as soon as the scheduler starts. `None` means
        // the next firing lies beyond what `Instant` can represent.
        let mut next_due: Vec<Option<Instant>> = vec![Some(start); self.tasks.len()];
        let mut manual: VecDeque<(usize, Option<Sender<()>>)> = VecDeque::new();
        // Set after a timer run so one queued manual run goes before the next timer.
        let mut manual_turn = false;

        loop {
            while let Ok(cmd) = self.rx.try_recv() {
                match cmd {
                    Command::RunNow { index, ack } => enqueue(&mut manual, index, ack),
                    Command::Shutdown => return,
                }
            }

            if manual_turn && let Some((index, ack)) = manual.pop_front() {
                manual_turn = false;
                if !self.execute(index, Trigger::Manual) {
                    return;
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                continue;
            }

            let now = Instant::now();
            let due = next_due
                .iter()
                .enumerate()
                .filter_map(|(i, at)| at.filter(|at| *at <= now).map(|at| (i, at)))
                .min_by_key(|(_, at)| *at)
                .map(|(i, _)| i);
            if let Some(index) = due {
                if !self.execute(index, Trigger::Timer) {
                    return;
                }
                let finished = Instant::now();
                next_due[index] = next_due[index]
                    .and_then(|at| at.checked_add(self.tasks[index].period))
                    // Overdue periods coalesce into a single pending run.
                    .map(|next| next.max(finished));
                manual_turn = true;
                continue;
            }

            if let Some((index, ack)) = manual.pop_front() {
                if !self.execute(index, Trigger::Manual) {
                    return;
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                continue;
            }

            let wake = next_due.iter().flatten().min().copied();
            let received = match wake {
                Some(deadline) => self.rx.recv_deadline(deadline),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(Command::RunNow { index, ack }) => enqueue(&mut manual, index, ack),
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Run one body; returns `false` when the worker must stop.
    fn execute(&mut self, index: usize, trigger: Trigger) -> bool {
        let in_flight = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let task = &mut self.tasks[index];
        let outcome = catch_unwind(AssertUnwindSafe(|| (task.body)(trigger)));

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.runs[index].fetch_add(1, Ordering::Relaxed);

        let err = match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(err)) => err,
            Err(payload) => DashError::Runtime {
                details: format!("task {} panicked: {}", task.name, panic_message(&*payload)),
            },
        };
        self.stats.faulted.store(true, Ordering::Relaxed);
        let name = task.name.clone();
        if let Some(hook) = self.on_fault.take() {
            hook(&name, err);
        }
        false
    }
}

/// Queue a manual run. A fire-and-forget run of a task that is already
/// pending without an acknowledgement adds nothing and is dropped.
fn enqueue(manual: &mut VecDeque<(usize, Option<Sender<()>>)>, index: usize, ack: Option<Sender<()>>) {
    if ack.is_none() && manual.iter().any(|(i, a)| *i == index && a.is_none()) {
        return;
    }
    manual.push_back((index, ack));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
