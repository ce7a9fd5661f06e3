mod app;
mod cache;
mod config;
mod error;
mod filter;
mod gitlab;
mod handoff;
mod project;
mod refresh;
mod selection;
mod session;
mod tree;
mod ui;

use std::{
    fs::File,
    io,
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use crate::{
    app::{App, KeyAction},
    config::Config,
    handoff::{build_clipboard, CheckoutRunner, ClipboardSink, GitCloneRunner, SystemBrowser},
    refresh::{RefreshController, ThreadSpawner},
    session::{ProjectSource, Session},
};

fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_path)?;

    let session = Arc::new(Session::new(&config));
    let servers = session.all_servers().to_vec();
    let cached = servers.first().and_then(|server| session.projects(server));
    let source: Arc<dyn ProjectSource> = session.clone();
    let refresh = RefreshController::new(source, Box::new(ThreadSpawner));
    let mut app = App::new(servers, cached, refresh);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;

    match result? {
        Some(url) => GitCloneRunner::new(config.clone_dir.clone()).checkout(&url),
        None => {
            tracing::info!("checkout cancelled");
            Ok(())
        }
    }
}

fn init_tracing(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(log_path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging init failed: {err}"))?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the picker until the user commits a clone URL (`Some`) or cancels (`None`).
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<Option<String>> {
    let mut clipboard = build_clipboard();
    let mut browser = SystemBrowser;
    loop {
        app.poll_refresh();
        let visible = app.visible_nodes();
        app.ensure_selection(visible.len());
        app.tick();

        terminal.draw(|frame| ui::draw(frame, app, &visible))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let clipboard = clipboard.as_deref_mut().map(|cb| cb as &mut dyn ClipboardSink);
                app.handle_key(key.code, &visible, clipboard, &mut browser)?
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    app.handle_mouse_down(mouse.column, mouse.row, &visible, Instant::now())
                }
                MouseEventKind::ScrollUp => {
                    app.handle_key(KeyCode::Up, &visible, None, &mut browser)?
                }
                MouseEventKind::ScrollDown => {
                    app.handle_key(KeyCode::Down, &visible, None, &mut browser)?
                }
                _ => KeyAction::None,
            },
            _ => KeyAction::None,
        };

        match action {
            KeyAction::Quit => return Ok(None),
            KeyAction::Commit(url) => return Ok(Some(url)),
            KeyAction::None => {}
        }
    }
}
