//! `editor [filename]` -- a single-file terminal text editor (spec.md §6).
//!
//! Zero or one positional argument, no flags, no environment variables.
//! Exit code 0 on clean quit, nonzero on fatal I/O (spec.md §7's `FatalIO`).

mod editor;
mod error;
mod highlight;
mod keys;
mod output;
mod row;
mod terminal;

use std::io::{self, Write};
use std::os::fd::AsRawFd;

use editor::Editor;
use error::Result;
use terminal::Terminal;

fn main() {
    let stdin_fd = io::stdin().as_raw_fd();
    let terminal = match Terminal::new(stdin_fd) {
        Ok(t) => t,
        Err(e) => fatal(&e.to_string()),
    };

    if let Err(e) = terminal.enable_raw_mode() {
        fatal(&e.to_string());
    }

    let result = run(&terminal);

    // Restoration is guaranteed on every exit path, including the error
    // path below (spec.md §4.1, §5).
    let _ = terminal.disable_raw_mode();

    if let Err(e) = result {
        let _ = io::stdout().write_all(b"\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
        eprintln!("editor: {e}");
        std::process::exit(1);
    }
}

fn run(terminal: &Terminal) -> Result<()> {
    let filename = std::env::args().nth(1);

    let mut ed = Editor::new(terminal)?;
    if let Some(name) = &filename {
        ed.open(name)?;
    }
    ed.set_status_message("HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find".to_string());

    loop {
        ed.refresh_screen()?;
        if !ed.process_keypress()? {
            break;
        }
    }
    Ok(())
}

/// Restores the terminal, clears the screen, prints a diagnostic and exits
/// nonzero -- the single exit path for errors raised before `run` owns the
/// terminal (e.g. the initial `tcgetattr`/raw-mode enable).
fn fatal(msg: &str) -> ! {
    let _ = io::stdout().write_all(b"\x1b[2J\x1b[H");
    let _ = io::stdout().flush();
    eprintln!("editor: {msg}");
    std::process::exit(1);
}
