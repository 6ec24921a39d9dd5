//! labconsole-forms - personnel registration console
//!
//! A Ratatui front end for the forms engine: one modal whose inputs are bound
//! to a form instance, validated on blur and submitted with Enter.

mod app;
mod ui;

use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use labconsole_forms::config::FormsConfig;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Redraw rate while a key press is still being handled
const BUSY_REDRAW_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match FormsConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (FormsConfig::default(), Some(err)),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Some(err) = config_error {
        tracing::warn!(error = %err, "failed to load config, using defaults");
    }

    let mut app = App::new(&config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        let screen = ui::Screen::capture(app);
        terminal.draw(|frame| ui::draw(frame, &screen))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Keep drawing while validations or a submission are pending
                    let handling = app.handle_key(key);
                    tokio::pin!(handling);
                    loop {
                        tokio::select! {
                            result = &mut handling => {
                                result?;
                                break;
                            }
                            _ = tokio::time::sleep(BUSY_REDRAW_INTERVAL) => {
                                terminal.draw(|frame| ui::draw(frame, &screen))?;
                            }
                        }
                    }
                }
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
