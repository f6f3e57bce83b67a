//! Keyboard routing: terminal key events to dashboard actions.

#![allow(missing_docs)]

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    /// Show the datasource at this position (`` ` `` and `0`-`9`).
    Jump(usize),
    Prev,
    Next,
    ForceRefresh,
}

/// Map a printable key to its action, if bound.
#[must_use]
pub const fn action_for_char(ch: char) -> Option<InputAction> {
    match ch {
        'q' | 'Q' => Some(InputAction::Quit),
        '`' => Some(InputAction::Jump(0)),
        '0'..='9' => Some(InputAction::Jump(ch as usize - '0' as usize)),
        ' ' => Some(InputAction::ForceRefresh),
        _ => None,
    }
}

#[cfg(feature = "tui")]
mod keys {
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

    use super::{InputAction, action_for_char};

    /// Resolve a crossterm key event. Releases and repeats of non-navigation
    /// keys are ignored.
    #[must_use]
    pub fn action_for_key(key: &KeyEvent) -> Option<InputAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(InputAction::Quit)
            }
            KeyCode::Char(ch) => action_for_char(ch),
            KeyCode::Left | KeyCode::Down => Some(InputAction::Prev),
            KeyCode::Right | KeyCode::Up => Some(InputAction::Next),
            _ => None,
        }
    }
}

#[cfg(feature = "tui")]
pub use keys::action_for_key;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_and_backtick_jump() {
        assert_eq!(action_for_char('`'), Some(InputAction::Jump(0)));
        assert_eq!(action_for_char('0'), Some(InputAction::Jump(0)));
        assert_eq!(action_for_char('7'), Some(InputAction::Jump(7)));
    }

    #[test]
    fn quit_and_refresh_keys() {
        assert_eq!(action_for_char('q'), Some(InputAction::Quit));
        assert_eq!(action_for_char(' '), Some(InputAction::ForceRefresh));
        assert_eq!(action_for_char('x'), None);
    }

    #[cfg(feature = "tui")]
    #[test]
    fn arrows_navigate() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(action_for_key(&key(KeyCode::Left)), Some(InputAction::Prev));
        assert_eq!(action_for_key(&key(KeyCode::Down)), Some(InputAction::Prev));
        assert_eq!(action_for_key(&key(KeyCode::Right)), Some(InputAction::Next));
        assert_eq!(action_for_key(&key(KeyCode::Up)), Some(InputAction::Next));
        assert_eq!(
            action_for_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputAction::Quit)
        );
    }
}
