use std::fmt;

use crate::error::{Error, Result};
use crate::model::installer::{InstallKind, InstallOutcome, Installer};

pub const CHECK_MARK: &str = "✓";
pub const CROSS_MARK: &str = "✗";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Done,
}

/// One install unit handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub item_name: String,
    pub kind: InstallKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub succeeded: bool,
    pub text: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.succeeded { CHECK_MARK } else { CROSS_MARK };
        write!(f, "{mark} {}", self.text.trim_matches('\n'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub completed_count: usize,
    pub total_count: usize,
    pub success_count: usize,
    pub current_item_name: String,
    pub last_log_line: LogLine,
}

impl ProgressEvent {
    /// Confirmed successes over total. Failed items advance
    /// `completed_count` but leave the fraction where it was.
    pub fn fraction(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub total_count: usize,
}

impl SessionResult {
    pub fn summary(&self) -> String {
        if self.failure_count == 0 {
            format!("Done! All {} installed successfully.", self.total_count)
        } else {
            format!(
                "Done! {} installed, {} failed.",
                self.success_count, self.failure_count
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Progress(ProgressEvent),
    Finished {
        progress: ProgressEvent,
        result: SessionResult,
    },
}

impl StepResult {
    pub fn progress(&self) -> &ProgressEvent {
        match self {
            StepResult::Progress(progress) | StepResult::Finished { progress, .. } => progress,
        }
    }
}

/// Sequential installer over a frozen list: one item at a time, strictly
/// in list order, and every item is attempted whatever happened before it.
#[derive(Debug, Clone)]
pub struct InstallSession {
    items: Vec<String>,
    kind: InstallKind,
    cursor: usize,
    success_count: usize,
    failure_count: usize,
    state: SessionState,
    in_flight: bool,
    log: Vec<LogLine>,
    last_progress: Option<ProgressEvent>,
}

impl InstallSession {
    pub fn start(items: Vec<String>, kind: InstallKind) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptySelection);
        }

        Ok(Self {
            items,
            kind,
            cursor: 0,
            success_count: 0,
            failure_count: 0,
            state: SessionState::Idle,
            in_flight: false,
            log: Vec::new(),
            last_progress: None,
        })
    }

    pub fn kind(&self) -> InstallKind {
        self.kind
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn last_progress(&self) -> Option<&ProgressEvent> {
        self.last_progress.as_ref()
    }

    /// The item waiting to be installed, if the session is not done.
    pub fn current_job(&self) -> Option<Job> {
        if self.state == SessionState::Done {
            return None;
        }
        Some(Job {
            item_name: self.items[self.cursor].clone(),
            kind: self.kind,
        })
    }

    /// Marks the session running and hands out the current job, at most
    /// once until its outcome is recorded.
    pub fn dispatch(&mut self) -> Option<Job> {
        if self.in_flight {
            return None;
        }
        let job = self.current_job()?;
        self.state = SessionState::Running;
        self.in_flight = true;
        Some(job)
    }

    /// Folds the outcome of the current job in and moves to the next item.
    /// Returns `None` once the session is already done.
    pub fn record(&mut self, outcome: InstallOutcome) -> Option<StepResult> {
        if self.state == SessionState::Done {
            tracing::warn!("ignoring outcome for {} after session end", outcome.item_name);
            return None;
        }
        self.state = SessionState::Running;
        self.in_flight = false;

        let current = self.items[self.cursor].clone();
        if outcome.item_name != current {
            tracing::warn!(
                "outcome for {} recorded against {current}",
                outcome.item_name
            );
        }

        if outcome.succeeded {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        let line = LogLine {
            succeeded: outcome.succeeded,
            text: outcome.log_line,
        };
        self.log.push(line.clone());

        let progress = ProgressEvent {
            completed_count: self.cursor + 1,
            total_count: self.total(),
            success_count: self.success_count,
            current_item_name: current,
            last_log_line: line,
        };
        self.last_progress = Some(progress.clone());

        if self.cursor + 1 >= self.total() {
            self.state = SessionState::Done;
            let result = SessionResult {
                success_count: self.success_count,
                failure_count: self.failure_count,
                total_count: self.total(),
            };
            return Some(StepResult::Finished { progress, result });
        }

        self.cursor += 1;
        Some(StepResult::Progress(progress))
    }

    /// Synchronous step: installs the current item in place.
    #[allow(dead_code)] // the UI drives sessions through dispatch/record on worker threads
    pub fn advance(&mut self, installer: &dyn Installer) -> Option<StepResult> {
        let job = self.dispatch()?;
        let outcome = installer.install(&job.item_name, job.kind);
        self.record(outcome)
    }
}

#[cfg(test)]
impl InstallSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn log(&self) -> &[LogLine] {
        &self.log
    }
}
