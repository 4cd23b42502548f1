mod app;
mod events;
mod logging;
mod persist;
mod strings;
mod terminal;
mod theme;
mod ui;

use anyhow::Result;
use terminal::TerminalGuard;
use tracing::info;

fn main() -> Result<()> {
    let _log_guard = logging::init().unwrap_or_else(|e| {
        eprintln!("logging disabled: {:#}", e);
        None
    });
    info!(target: "tui", "dscoder {} starting", env!("CARGO_PKG_VERSION"));
    let mut app = app::App::new();
    let mut term = TerminalGuard::new()?;
    let res = events::run(&mut term.terminal, &mut app);
    drop(term);
    info!(target: "tui", "exit");
    res
}
