//! Key bindings: arrows and vim-style hjkl.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Pick the tile under the cursor, or confirm a menu entry.
    Select,
    Cancel,
    Pause,
    Quit,
    Restart,
    None,
}

/// Map key event to action. Modified keys other than Shift are ignored.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('q' | 'Q') => Action::Quit,
        KeyCode::Char('r' | 'R') => Action::Restart,
        _ => Action::None,
    }
}

impl Action {
    /// Row and column step for the four direction actions.
    pub fn direction(self) -> Option<(isize, isize)> {
        match self {
            Self::Up => Some((-1, 0)),
            Self::Down => Some((1, 0)),
            Self::Left => Some((0, -1)),
            Self::Right => Some((0, 1)),
            _ => None,
        }
    }
}
