mod app;
mod error;
mod keys;
mod model;
mod msg;

use std::io;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use app::App;
use model::catalog::DirCatalog;
use model::config::AppConfig;
use msg::Msg;

fn main() -> Result<ExitCode> {
    let config = AppConfig::load()?;

    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "archutils")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "archutils.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!(
        "archutils starting, catalogs at {}",
        config.catalog_dir().display()
    );

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match result {
        Ok(0) => Ok(ExitCode::SUCCESS),
        Ok(failed) => {
            eprintln!(
                "archutils: {failed} item(s) failed to install, see the log in {}",
                log_dir.display()
            );
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            tracing::error!("{e:?}");
            eprintln!("archutils error: {e:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs the event loop until the user quits. Returns the number of items
/// that failed to install over the whole run.
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &AppConfig,
) -> Result<usize> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let mut app: App<DirCatalog> = App::new(config, tx.clone());

    // Input thread — reads terminal events and forwards as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            if let Ok(event) = event::read() {
                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx_input.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // Tick thread — drives the spinner while installing
    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms.max(10));
    let tx_tick = tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(tick_rate);
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    terminal.draw(|f| app.view(f))?;

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit() {
            break;
        }

        terminal.draw(|f| app.view(f))?;
    }

    tracing::info!("archutils exiting, {} failed item(s)", app.failed_total());
    Ok(app.failed_total())
}
