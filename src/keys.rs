use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::msg::Action;

/// Key hint shown in the help bar.
pub struct Binding {
    pub keys: &'static str,
    pub help: &'static str,
}

pub const SHORT_HELP: &[Binding] = &[
    Binding {
        keys: "?",
        help: "Toggle help",
    },
    Binding {
        keys: "q",
        help: "Exit app",
    },
];

/// Full help, one row per group.
pub const FULL_HELP: &[&[Binding]] = &[
    &[
        Binding {
            keys: "↑/k",
            help: "Up",
        },
        Binding {
            keys: "↓/j",
            help: "Down",
        },
        Binding {
            keys: "←/esc",
            help: "Back",
        },
    ],
    &[
        Binding {
            keys: "⏎/␣",
            help: "Select",
        },
        Binding {
            keys: "i",
            help: "Install selected",
        },
    ],
    SHORT_HELP,
];

pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Esc | KeyCode::Left => Some(Action::Back),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Enter),
        KeyCode::Char('i') => Some(Action::Install),
        KeyCode::Char('?') => Some(Action::Help),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}
