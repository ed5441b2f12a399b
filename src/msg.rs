use crossterm::event::KeyEvent;

use crate::model::installer::InstallOutcome;

/// User intents the navigator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Enter,
    Back,
    Install,
    Help,
    Quit,
}

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Navigation
    Action(Action),

    // -- Install worker
    InstallFinished(InstallOutcome),

    // -- System
    Tick,
}
