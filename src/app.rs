use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;

use anyhow::Result;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap};

use crate::keys::{self, Binding};
use crate::model::catalog::{CatalogProvider, DirCatalog};
use crate::model::config::AppConfig;
use crate::model::installer::{InstallOutcome, Installer, SystemInstaller};
use crate::model::navigator::{Navigator, Snapshot};
use crate::model::session::{Job, StepResult};
use crate::model::stage::Stage;
use crate::msg::Msg;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const ACCENT: Color = Color::Indexed(51);
const CURRENT_ITEM: Color = Color::Indexed(211);

pub struct App<P: CatalogProvider> {
    navigator: Navigator<P>,
    installer: Arc<dyn Installer>,
    event_tx: mpsc::Sender<Msg>,
    /// Install log lines and session summaries, oldest first.
    notifications: VecDeque<String>,
    log_history: usize,
    spinner_frame: usize,
}

impl App<DirCatalog> {
    pub fn new(config: &AppConfig, event_tx: mpsc::Sender<Msg>) -> Self {
        let navigator = Navigator::new(
            DirCatalog::new(config.catalog_dir()),
            config.catalogs.clone(),
        );
        let installer = Arc::new(SystemInstaller::new(config.installer.clone()));
        Self::with_parts(navigator, installer, event_tx, config.ui.log_history)
    }
}

impl<P: CatalogProvider> App<P> {
    pub fn with_parts(
        navigator: Navigator<P>,
        installer: Arc<dyn Installer>,
        event_tx: mpsc::Sender<Msg>,
        log_history: usize,
    ) -> Self {
        Self {
            navigator,
            installer,
            event_tx,
            notifications: VecDeque::new(),
            log_history: log_history.max(1),
            spinner_frame: 0,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.navigator.should_quit()
    }

    pub fn failed_total(&self) -> usize {
        self.navigator.failed_total()
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => {
                if let Some(action) = keys::action_for(key) {
                    self.update(Msg::Action(action))?;
                }
            }
            Msg::Action(action) => {
                self.navigator.apply(action);
                self.dispatch_pending();
            }
            Msg::InstallFinished(outcome) => {
                if let Some(step) = self.navigator.on_outcome(outcome) {
                    self.handle_step(step);
                }
                self.dispatch_pending();
            }
            Msg::Tick => {
                if self.navigator.stage() == Stage::Installing {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
                }
            }
            // Redrawn by the main loop after every batch.
            Msg::Resize(_w, _h) => {}
        }
        Ok(())
    }

    fn handle_step(&mut self, step: StepResult) {
        let progress = step.progress();
        tracing::debug!(
            "{} done ({}/{})",
            progress.current_item_name,
            progress.completed_count,
            progress.total_count
        );
        match step {
            StepResult::Progress(progress) => {
                self.push_notification(progress.last_log_line.to_string());
            }
            StepResult::Finished { progress, result } => {
                self.push_notification(progress.last_log_line.to_string());
                self.push_notification(result.summary());
            }
        }
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > self.log_history {
            self.notifications.pop_front();
        }
    }

    fn dispatch_pending(&mut self) {
        if let Some(job) = self.navigator.next_job() {
            tracing::info!("dispatching {} {}", job.kind.noun(), job.item_name);
            spawn_install(Arc::clone(&self.installer), job, self.event_tx.clone());
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&self, frame: &mut Frame) {
        let snapshot = self.navigator.snapshot();
        let help_lines = help_lines(snapshot.help_visible);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),                          // body
                Constraint::Length(1),                       // status bar
                Constraint::Length(help_lines.len() as u16), // help
            ])
            .split(frame.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Min(1)])
            .split(chunks[0]);

        self.render_list(frame, body[0], &snapshot);
        self.render_side_panel(frame, body[1], &snapshot);
        self.render_status_bar(frame, chunks[1], &snapshot);

        frame.render_widget(Paragraph::new(help_lines), chunks[2]);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
        let lines: Vec<Line> = snapshot
            .rows
            .iter()
            .map(|row| {
                let cursor = if row.is_cursor { "❯" } else { " " };
                let checkbox = match row.selected {
                    Some(true) => " [x]",
                    Some(false) => " [ ]",
                    None => "",
                };
                let style = if row.is_cursor {
                    Style::default().fg(ACCENT)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(cursor, style),
                    Span::raw(checkbox),
                    Span::styled(format!(" {}", row.name), style),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(panel(" archutils ")), area);
    }

    fn render_side_panel(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
        let block = panel(" logs ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut top: Vec<Line> = Vec::new();
        if let Some(description) = snapshot.description {
            top.push(Line::from(description));
            top.push(Line::default());
        }
        if let Some(error) = &snapshot.error {
            top.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
            top.push(Line::default());
        }

        let installing = snapshot.stage == Stage::Installing;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(top.len() as u16),
                Constraint::Length(if installing { 3 } else { 0 }),
                Constraint::Min(0),
            ])
            .split(inner);

        frame.render_widget(Paragraph::new(top).wrap(Wrap { trim: false }), chunks[0]);

        if installing {
            self.render_progress(frame, chunks[1], snapshot);
        }

        let log_area = chunks[2];
        let visible = log_area.height as usize;
        let skip = self.notifications.len().saturating_sub(visible);
        let log: Vec<Line> = self
            .notifications
            .iter()
            .skip(skip)
            .map(|line| Line::from(Span::styled(line.clone(), log_style(line))))
            .collect();
        frame.render_widget(Paragraph::new(log), log_area);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
        let current = snapshot.installing.clone().unwrap_or_default();
        let noun = self
            .navigator
            .session()
            .map(|session| session.kind().noun())
            .unwrap_or("item");
        let label = if current.is_empty() {
            Line::from(format!("{spinner} Running, please wait..."))
        } else {
            Line::from(vec![
                Span::raw(format!("{spinner} Installing {noun} ")),
                Span::styled(current, Style::default().fg(CURRENT_ITEM)),
            ])
        };
        frame.render_widget(Paragraph::new(label), rows[0]);

        let total = self
            .navigator
            .session()
            .map(|session| session.total())
            .unwrap_or(0);
        let label = match &snapshot.progress {
            Some(p) => format!(
                "{}/{}  ({} attempted)",
                p.success_count, p.total_count, p.completed_count
            ),
            None => format!("0/{total}"),
        };
        let ratio = snapshot.progress.as_ref().map_or(0.0, |p| p.fraction());
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label);
        frame.render_widget(gauge, rows[1]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
        let stage_style = match snapshot.stage {
            Stage::Installing => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        };
        let stage_span = Span::styled(format!(" {} ", snapshot.stage.label()), stage_style);

        let mut info = format!(" {}", snapshot.breadcrumb);
        if let Some(result) = self.navigator.last_result() {
            info.push_str(&format!(
                "  last run: {}/{} ok",
                result.success_count, result.total_count
            ));
        }

        let bar = Line::from(vec![
            stage_span,
            Span::styled(info, Style::default().fg(Color::Gray).bg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(bar).style(Style::default().bg(Color::DarkGray)),
            area,
        );
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
}

fn log_style(line: &str) -> Style {
    if line.starts_with(crate::model::session::CHECK_MARK) {
        Style::default().fg(Color::Indexed(42))
    } else if line.starts_with(crate::model::session::CROSS_MARK) {
        Style::default().fg(Color::Red)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn help_lines(full: bool) -> Vec<Line<'static>> {
    let render = |bindings: &[Binding]| {
        let spans: Vec<Span<'static>> = bindings
            .iter()
            .flat_map(|b| {
                [
                    Span::styled(b.keys, Style::default().fg(Color::Gray)),
                    Span::styled(format!(" {}  ", b.help), Style::default().fg(Color::DarkGray)),
                ]
            })
            .collect();
        Line::from(spans)
    };

    if full {
        keys::FULL_HELP.iter().map(|group| render(*group)).collect()
    } else {
        vec![render(keys::SHORT_HELP)]
    }
}

/// Runs one install off the event loop and posts the outcome back.
fn spawn_install(installer: Arc<dyn Installer>, job: Job, tx: mpsc::Sender<Msg>) {
    std::thread::spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            installer.install(&job.item_name, job.kind)
        }))
        .unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("installer panicked on {}: {reason}", job.item_name);
            InstallOutcome::failure(
                &job.item_name,
                format!("{}: Failed to install (installer panicked: {reason})", job.item_name),
            )
        });
        if outcome.succeeded {
            tracing::info!("{}", outcome.log_line);
        } else {
            tracing::warn!("{}", outcome.log_line);
        }
        if tx.send(Msg::InstallFinished(outcome)).is_err() {
            tracing::warn!("event loop gone before {} finished", job.item_name);
        }
    });
}
