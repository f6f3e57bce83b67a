//! Foreground render loop: merges input, resize, signal and scheduler events
//! into one stream, applies them to the [`RenderState`] and draws frames.

#![allow(missing_docs)]

use std::io::{self, BufWriter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use crossterm::event::{self, Event};

use crate::core::config::{DashboardSettings, DatasourceRegistry};
use crate::core::errors::{DashError, Result};
use crate::daemon::scheduler::{DATA_SYNC, LAYOUT_REFRESH, Scheduler, SchedulerHandle};
use crate::daemon::signals::{SignalHandler, SignalRequest};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, LoggerConfig, spawn_logger};
use crate::metrics::backend::RangeBackend;
use crate::metrics::query::QueryEngine;
use crate::tui::glyphs::PixelGlyphs;
use crate::tui::input::{InputAction, action_for_key};
use crate::tui::model::{DashboardCmd, DashboardMsg, RenderState, SyncRequest};
use crate::tui::render::{FrameContext, compose, flush};
use crate::tui::sync::{DataSyncJob, SyncParams};
use crate::tui::terminal_guard::TerminalGuard;
use crate::tui::theme::{AccessibilityProfile, ThemePalette};
use crate::tui::update::update;

/// Period of the layout task.
pub const LAYOUT_REFRESH_PERIOD: Duration = Duration::from_secs(3600);
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Run the dashboard until the user quits or a fatal error occurs.
///
/// The terminal is restored before this function returns, on every path.
///
/// # Errors
/// Terminal setup/draw failures and fatal task errors (unusable endpoint,
/// unsupported query result shape).
pub fn run_dashboard(
    settings: &DashboardSettings,
    registry: DatasourceRegistry,
    backend: Box<dyn RangeBackend>,
    accessibility: AccessibilityProfile,
) -> Result<()> {
    let (logger, logger_join) = spawn_logger(LoggerConfig::for_path(settings.log_file.clone()))?;
    logger.send(ActivityEvent::DashboardStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: registry.len(),
        refresh_secs: settings.refresh.as_secs(),
    });

    let started = Instant::now();
    let result = run_with_logger(settings, Arc::new(registry), backend, accessibility, &logger);

    let reason = match &result {
        Ok(()) => "quit".to_string(),
        Err(err) => {
            logger.send(ActivityEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            });
            err.code().to_string()
        }
    };
    logger.send(ActivityEvent::DashboardStopped {
        reason,
        uptime_secs: started.elapsed().as_secs(),
    });
    logger.shutdown();
    let _ = logger_join.join();
    result
}

fn run_with_logger(
    settings: &DashboardSettings,
    registry: Arc<DatasourceRegistry>,
    backend: Box<dyn RangeBackend>,
    accessibility: AccessibilityProfile,
    logger: &ActivityLoggerHandle,
) -> Result<()> {
    let initial_size = TerminalGuard::terminal_size();
    let guard = TerminalGuard::new()?;

    let (msg_tx, msg_rx) = unbounded::<DashboardMsg>();
    let (req_tx, req_rx) = unbounded::<SyncRequest>();

    let job = DataSyncJob::new(
        Arc::clone(&registry),
        QueryEngine::new(backend),
        req_rx,
        msg_tx.clone(),
        logger.clone(),
        SyncParams {
            window_len: settings.window.resolve(initial_size.0),
            step_secs: settings.step_secs,
            timezone: settings.timezone,
        },
    );
    let scheduler = start_scheduler(job, settings.refresh, &msg_tx, logger)?;

    let stop = Arc::new(AtomicBool::new(false));
    let input = spawn_input_thread(msg_tx, Arc::clone(&stop), SignalHandler::new(logger))?;

    let mut render_loop = RenderLoop {
        state: RenderState::new(registry.len(), initial_size, settings.window),
        registry,
        guard: &guard,
        scheduler: &scheduler,
        requests: req_tx,
        logger,
        frame: FrameContext {
            now: chrono::Utc::now(),
            timezone: settings.timezone,
            test_mode: settings.test_mode,
            color_policy: settings.color_policy,
            palette: ThemePalette::for_profile(accessibility),
        },
    };
    let result = render_loop.run(&msg_rx);

    // Release the terminal first so a slow in-flight fetch does not hold it.
    drop(guard);
    stop.store(true, Ordering::Relaxed);
    scheduler.shutdown();
    let _ = input.join();
    result
}

fn start_scheduler(
    mut job: DataSyncJob,
    refresh: Duration,
    msg_tx: &Sender<DashboardMsg>,
    logger: &ActivityLoggerHandle,
) -> Result<SchedulerHandle> {
    let layout_tx = msg_tx.clone();
    let fault_tx = msg_tx.clone();
    let fault_logger = logger.clone();
    Scheduler::new()
        .every(LAYOUT_REFRESH, LAYOUT_REFRESH_PERIOD, move |_| {
            layout_tx
                .send(DashboardMsg::LayoutTick)
                .map_err(|_| DashError::ChannelClosed {
                    component: "render-loop",
                })
        })
        .every(DATA_SYNC, refresh, move |trigger| job.run(trigger))
        .on_fault(move |task, err| {
            fault_logger.send(ActivityEvent::SchedulerFault {
                task: task.to_string(),
                error_code: err.code().to_string(),
                error_message: err.to_string(),
            });
            let _ = fault_tx.send(DashboardMsg::Fault(err));
        })
        .start()
}

/// Terminal events and signals, polled off the render thread.
fn spawn_input_thread(
    tx: Sender<DashboardMsg>,
    stop: Arc<AtomicBool>,
    signals: SignalHandler,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("dashclock-input".to_string())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let mut outgoing = Vec::new();
                for request in signals.poll() {
                    outgoing.push(match request {
                        SignalRequest::Quit => DashboardMsg::Input(InputAction::Quit),
                        SignalRequest::LayoutRefresh => {
                            let (cols, rows) = TerminalGuard::terminal_size();
                            DashboardMsg::Resize { cols, rows }
                        }
                        SignalRequest::ForceRefresh => DashboardMsg::Input(InputAction::ForceRefresh),
                    });
                }

                match event::poll(INPUT_POLL) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) => {
                            if let Some(action) = action_for_key(&key) {
                                outgoing.push(DashboardMsg::Input(action));
                            }
                        }
                        Ok(Event::Resize(cols, rows)) => {
                            outgoing.push(DashboardMsg::Resize { cols, rows });
                        }
                        Ok(_) => {}
                        Err(e) => outgoing.push(DashboardMsg::Fault(DashError::terminal("read input", e))),
                    },
                    Ok(false) => {}
                    Err(e) => outgoing.push(DashboardMsg::Fault(DashError::terminal("poll input", e))),
                }

                for msg in outgoing {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
            }
        })
        .map_err(|e| DashError::Runtime {
            details: format!("failed to spawn input thread: {e}"),
        })
}

struct RenderLoop<'a> {
    state: RenderState,
    registry: Arc<DatasourceRegistry>,
    guard: &'a TerminalGuard,
    scheduler: &'a SchedulerHandle,
    requests: Sender<SyncRequest>,
    logger: &'a ActivityLoggerHandle,
    frame: FrameContext,
}

/// Whether the loop keeps going after a command.
enum Flow {
    Continue,
    Stop(Result<()>),
}

impl RenderLoop<'_> {
    fn run(&mut self, messages: &Receiver<DashboardMsg>) -> Result<()> {
        for msg in messages {
            let cmd = update(&mut self.state, msg);
            if let Flow::Stop(result) = self.execute(cmd) {
                return result;
            }
        }
        Err(DashError::ChannelClosed {
            component: "render-loop",
        })
    }

    fn execute(&mut self, cmd: DashboardCmd) -> Flow {
        match cmd {
            DashboardCmd::None => Flow::Continue,
            DashboardCmd::Quit => Flow::Stop(Ok(())),
            DashboardCmd::Exit(err) => Flow::Stop(Err(err)),
            DashboardCmd::Request(request) => {
                // The job only goes away with the scheduler; nothing to do then.
                let _ = self.requests.send(request);
                Flow::Continue
            }
            DashboardCmd::RunDataSync => match self.scheduler.run_now(DATA_SYNC) {
                Ok(()) => Flow::Continue,
                Err(err) => Flow::Stop(Err(err)),
            },
            DashboardCmd::LayoutChanged(descriptor) => {
                self.logger.send(ActivityEvent::LayoutChanged {
                    profile: descriptor.profile().label().to_string(),
                    cols: descriptor.cols,
                    rows: descriptor.rows,
                });
                match self.guard.clear() {
                    Ok(()) => Flow::Continue,
                    Err(err) => Flow::Stop(Err(err)),
                }
            }
            DashboardCmd::Draw => match self.draw() {
                Ok(()) => Flow::Continue,
                Err(err) => Flow::Stop(Err(err)),
            },
            DashboardCmd::Batch(cmds) => {
                for cmd in cmds {
                    if let Flow::Stop(result) = self.execute(cmd) {
                        return Flow::Stop(result);
                    }
                }
                Flow::Continue
            }
        }
    }

    fn draw(&mut self) -> Result<()> {
        self.frame.now = chrono::Utc::now();
        let canvas = compose(&self.state, &self.registry, &PixelGlyphs, &self.frame);
        let mut out = BufWriter::new(io::stdout().lock());
        flush(&canvas, &mut out)
    }
}
