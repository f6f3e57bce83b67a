//! RAII terminal lifecycle guard backed by crossterm.
//!
//! [`TerminalGuard`] enters raw mode and the alternate screen on construction
//! and restores the terminal on [`Drop`], including early error returns. A
//! panic hook restores the terminal *before* the panic message is printed so
//! the message lands on a normal screen.

use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};

use crate::core::errors::{DashError, Result};

/// Set while raw mode is active. Checked by the panic hook.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Owns the terminal for the lifetime of the dashboard.
pub struct TerminalGuard {
    hook_installed: bool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, installing a panic-safe cleanup hook.
    ///
    /// # Errors
    /// `DashError::Terminal` if the terminal cannot be set up. Whatever was
    /// already switched on is switched back off before returning.
    pub fn new() -> Result<Self> {
        enable_raw_mode().map_err(|e| DashError::terminal("enable raw mode", e))?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All)) {
            restore_terminal_best_effort();
            return Err(DashError::terminal("enter alternate screen", e));
        }

        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal_best_effort();
            prev(info);
        }));

        Ok(Self {
            hook_installed: true,
        })
    }

    /// Terminal dimensions (columns, rows), falling back to (80, 24).
    #[must_use]
    pub fn terminal_size() -> (u16, u16) {
        terminal::size()
            .ok()
            .filter(|&(c, r)| c > 0 && r > 0)
            .unwrap_or((80, 24))
    }

    /// Wipe the screen, used when the layout changes.
    pub fn clear(&self) -> Result<()> {
        execute!(io::stdout(), Clear(ClearType::All))
            .map_err(|e| DashError::terminal("clear screen", e))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal_best_effort();
        if self.hook_installed {
            // The previous hook moved into our closure; fall back to the default.
            let _ = panic::take_hook();
        }
    }
}

/// Leave the alternate screen, show the cursor and drop raw mode.
/// Safe to call more than once.
pub fn restore_terminal_best_effort() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, Show);
        let _ = disable_raw_mode();
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_terminal_is_idempotent() {
        restore_terminal_best_effort();
        restore_terminal_best_effort();
        assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));
    }

    #[test]
    fn terminal_size_fallback() {
        let (cols, rows) = TerminalGuard::terminal_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }
}
