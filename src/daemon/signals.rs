//! Signal handling: SIGTERM/SIGINT quit, SIGHUP layout refresh, SIGUSR1
//! forced data refresh.
//!
//! Uses `signal-hook` flag registration. The input thread polls the flags
//! between terminal event polls and turns them into dashboard messages.

#![allow(missing_docs)]

use std::ffi::c_int;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::core::errors::DashError;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

/// What a received signal asks the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRequest {
    Quit,
    LayoutRefresh,
    ForceRefresh,
}

/// Signal flags shared between the OS handlers and the polling thread.
#[derive(Clone)]
pub struct SignalHandler {
    quit_flag: Arc<AtomicBool>,
    layout_flag: Arc<AtomicBool>,
    refresh_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register OS signal hooks (best-effort).
    ///
    /// A hook that cannot be registered is logged; the other signals still work.
    pub fn new(logger: &ActivityLoggerHandle) -> Self {
        let handler = Self::unregistered();
        handler.register_with(logger, |signal, flag| {
            signal_hook::flag::register(signal, flag).map(drop)
        });
        handler
    }

    /// Flags only, no OS registration. Requests come from `request_*` calls.
    pub fn unregistered() -> Self {
        Self {
            quit_flag: Arc::new(AtomicBool::new(false)),
            layout_flag: Arc::new(AtomicBool::new(false)),
            refresh_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether a quit has been requested. Sticky.
    pub fn should_quit(&self) -> bool {
        self.quit_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether a layout refresh has been requested.
    pub fn should_refresh_layout(&self) -> bool {
        self.layout_flag.swap(false, Ordering::Relaxed)
    }

    /// Check (and clear) whether a forced data refresh has been requested.
    pub fn should_force_refresh(&self) -> bool {
        self.refresh_flag.swap(false, Ordering::Relaxed)
    }

    /// Drain pending requests, quit first.
    pub fn poll(&self) -> Vec<SignalRequest> {
        let mut out = Vec::new();
        if self.should_quit() {
            out.push(SignalRequest::Quit);
            return out;
        }
        if self.should_refresh_layout() {
            out.push(SignalRequest::LayoutRefresh);
        }
        if self.should_force_refresh() {
            out.push(SignalRequest::ForceRefresh);
        }
        out
    }

    pub fn request_quit(&self) {
        self.quit_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_layout_refresh(&self) {
        self.layout_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_force_refresh(&self) {
        self.refresh_flag.store(true, Ordering::Relaxed);
    }

    fn register_with<R>(&self, logger: &ActivityLoggerHandle, mut register: R)
    where
        R: FnMut(c_int, Arc<AtomicBool>) -> io::Result<()>,
    {
        let mut hooks = vec![
            (SIGTERM, "SIGTERM", &self.quit_flag),
            (SIGINT, "SIGINT", &self.quit_flag),
        ];
        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGHUP, SIGUSR1};
            hooks.push((SIGHUP, "SIGHUP", &self.layout_flag));
            hooks.push((SIGUSR1, "SIGUSR1", &self.refresh_flag));
        }

        // Nothing goes to stderr here: the terminal is in raw mode.
        for (signal, name, flag) in hooks {
            if let Err(e) = register(signal, Arc::clone(flag)) {
                let err = DashError::Runtime {
                    details: format!("failed to register {name}: {e}"),
                };
                logger.send(ActivityEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
}
