//! The editor singleton: owns the row store, cursor/viewport state, and the
//! main-loop methods (file I/O, mutation, scroll/render, input dispatch)
//! that spec.md §§4.5-4.8 describe as one cooperative loop over four
//! subsystems.
//!
//! Modelled as a plain owned struct threaded through `main` rather than a
//! module-level global, per spec.md §9's explicit redesign note for "global
//! editor state".

use std::fs;
use std::io::{self, Seek, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::highlight::{self, HlClass, SyntaxProfile};
use crate::keys::{ctrl_key, Key, BACKSPACE, ENTER, ESCAPE};
use crate::output::OutputBuffer;
use crate::row::Row;
use crate::terminal::Terminal;

/// Ctrl-Q presses required to quit a dirty buffer (spec.md §4.7, §8
/// scenario 7: the 4th press exits).
const QUIT_TIMES: u32 = 3;
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const WELCOME: &str = "Kilo editor -- version 0.0.1";

struct StatusMessage {
    text: String,
    time: Instant,
}

impl StatusMessage {
    fn new(text: String) -> Self {
        Self {
            text,
            time: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.time.elapsed() >= MESSAGE_TIMEOUT
    }
}

/// State the find sub-mode threads across prompt callback invocations
/// (spec.md §4.7, §9's "static locals in the find callback" redesign note
/// -- a value constructed on entry to find mode and released on exit rather
/// than C `static` locals).
struct FindState {
    last_match: Option<usize>,
    direction: i32,
    /// Row the cursor was on when find mode was entered. The first scan
    /// (before any match has been found) is seeded from this row rather
    /// than row 0, so a query already matching the entry row is found
    /// immediately there.
    entry_row: usize,
    saved_hl: Option<(usize, Vec<HlClass>)>,
}

impl FindState {
    fn new(entry_row: usize) -> Self {
        Self {
            last_match: None,
            direction: 1,
            entry_row,
            saved_hl: None,
        }
    }
}

pub struct Editor<'t> {
    terminal: &'t Terminal,

    cx: usize,
    cy: usize,
    rx: usize,
    rowoff: usize,
    coloff: usize,
    screenrows: usize,
    screencols: usize,

    rows: Vec<Row>,
    filename: Option<String>,
    dirty: u32,
    quit_times: u32,

    status_msg: Option<StatusMessage>,
    syntax: Option<&'static SyntaxProfile>,
}

impl<'t> Editor<'t> {
    pub fn new(terminal: &'t Terminal) -> Result<Self> {
        let (rows, cols) = terminal.get_window_size()?;
        Ok(Self {
            terminal,
            cx: 0,
            cy: 0,
            rx: 0,
            rowoff: 0,
            coloff: 0,
            screenrows: rows.saturating_sub(2),
            screencols: cols,
            rows: Vec::new(),
            filename: None,
            dirty: 0,
            quit_times: QUIT_TIMES,
            status_msg: None,
            syntax: None,
        })
    }

    pub fn set_status_message(&mut self, text: String) {
        self.status_msg = Some(StatusMessage::new(text));
    }

    // ---- file I/O (spec.md §4.5) ----

    /// Loads `filename` into the row store, stripping any trailing `\r`
    /// and/or `\n` from each line. A lone trailing newline at end of file
    /// does not produce a spurious final empty row.
    pub fn open(&mut self, filename: &str) -> Result<()> {
        let data = fs::read(filename)?;
        self.rows.clear();

        if !data.is_empty() {
            let mut lines: Vec<&[u8]> = data.split(|&b| b == b'\n').collect();
            if lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
            for line in lines {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                self.rows.push(Row::new(line.to_vec()));
            }
        }

        self.filename = Some(filename.to_string());
        self.syntax = highlight::select_syntax(filename);
        highlight::rehighlight_all(&mut self.rows, self.syntax);
        self.dirty = 0;
        Ok(())
    }

    /// Serializes the row store (each row's `chars` plus a single `\n`) and
    /// writes it to `self.filename`, prompting for one if unset. Truncates
    /// to the serialized length before writing so a short write caps
    /// damage at that length rather than leaving a longer prior file
    /// partially overwritten (spec.md §4.5).
    pub fn save(&mut self) -> Result<()> {
        let filename = match &self.filename {
            Some(name) => name.clone(),
            None => match self.prompt("Save as: {} (ESC to cancel)", |_, _, _| {})? {
                Some(name) => {
                    let name = String::from_utf8_lossy(&name).into_owned();
                    self.syntax = highlight::select_syntax(&name);
                    self.filename = Some(name.clone());
                    highlight::rehighlight_all(&mut self.rows, self.syntax);
                    name
                }
                None => {
                    self.set_status_message("Save aborted".to_string());
                    return Ok(());
                }
            },
        };

        let mut data = Vec::new();
        for row in &self.rows {
            data.extend_from_slice(&row.chars);
            data.push(b'\n');
        }

        match write_truncated(&filename, &data) {
            Ok(()) => {
                self.dirty = 0;
                self.set_status_message(format!("{} bytes written to disk", data.len()));
            }
            Err(e) => {
                self.set_status_message(format!("Can't save! I/O error: {e}"));
            }
        }
        Ok(())
    }

    // ---- row store mutation (spec.md §4.3, §4.6) ----

    fn mark_dirty(&mut self) {
        self.dirty += 1;
    }

    fn insert_row(&mut self, at: usize, chars: Vec<u8>) {
        let at = at.min(self.rows.len());
        self.rows.insert(at, Row::new(chars));
        self.mark_dirty();
        highlight::rehighlight_all(&mut self.rows, self.syntax);
    }

    fn delete_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }
        self.rows.remove(at);
        self.mark_dirty();
        highlight::rehighlight_all(&mut self.rows, self.syntax);
    }

    fn row_insert_char(&mut self, row: usize, at: usize, c: u8) {
        self.rows[row].insert_char(at, c);
        self.mark_dirty();
        highlight::rehighlight_from(&mut self.rows, self.syntax, row);
    }

    fn row_delete_char(&mut self, row: usize, at: usize) {
        self.rows[row].delete_char(at);
        self.mark_dirty();
        highlight::rehighlight_from(&mut self.rows, self.syntax, row);
    }

    fn row_append_string(&mut self, row: usize, text: &[u8]) {
        self.rows[row].append_bytes(text);
        self.mark_dirty();
        highlight::rehighlight_from(&mut self.rows, self.syntax, row);
    }

    /// Inserts `c` at the cursor, first materialising an empty row if the
    /// cursor sits on the virtual row past end-of-buffer (spec.md §4.6).
    pub fn insert_char(&mut self, c: u8) {
        if self.cy == self.rows.len() {
            self.insert_row(self.rows.len(), Vec::new());
        }
        self.row_insert_char(self.cy, self.cx, c);
        self.cx += 1;
    }

    /// Splits the current row at `cx`, or inserts an empty row above it
    /// when `cx == 0` (spec.md §4.6).
    pub fn insert_newline(&mut self) {
        if self.cx == 0 {
            self.insert_row(self.cy, Vec::new());
        } else {
            let suffix = self.rows[self.cy].split_off(self.cx);
            self.mark_dirty();
            self.insert_row(self.cy + 1, suffix);
        }
        self.cy += 1;
        self.cx = 0;
    }

    /// No-op at (0,0) and past end-of-buffer. Otherwise deletes the
    /// character left of the cursor, joining with the previous row when
    /// `cx == 0` (spec.md §4.6).
    pub fn delete_char(&mut self) {
        if self.cy >= self.rows.len() {
            return;
        }
        if self.cx == 0 && self.cy == 0 {
            return;
        }

        if self.cx > 0 {
            self.row_delete_char(self.cy, self.cx - 1);
            self.cx -= 1;
        } else {
            let prev_len = self.rows[self.cy - 1].len();
            let suffix = self.rows[self.cy].chars.clone();
            self.row_append_string(self.cy - 1, &suffix);
            self.delete_row(self.cy);
            self.cy -= 1;
            self.cx = prev_len;
        }
    }

    // ---- input dispatcher (spec.md §4.7) ----

    /// Reads and dispatches one key. Returns `false` when the editor should
    /// exit (clean Ctrl-Q with the quit guard exhausted).
    pub fn process_keypress(&mut self) -> Result<bool> {
        let key = self.terminal.read_key()?;

        match key {
            Key::Other(b) if b == ENTER => {
                self.insert_newline();
            }
            Key::Other(b) if b == ctrl_key(b'q') => {
                if self.dirty > 0 && self.quit_times > 0 {
                    let n = self.quit_times;
                    self.set_status_message(format!(
                        "WARNING!!! File has unsaved changes. Press Ctrl-Q {n} more time{} to quit.",
                        if n > 1 { "s" } else { "" }
                    ));
                    self.quit_times -= 1;
                    return Ok(true);
                }
                self.clear_screen_for_exit()?;
                return Ok(false);
            }
            Key::Other(b) if b == ctrl_key(b's') => {
                self.save()?;
            }
            Key::Other(b) if b == ctrl_key(b'f') => {
                self.find()?;
            }
            Key::Other(b) if b == ctrl_key(b'l') || b == ESCAPE => {
                return Ok(true);
            }
            Key::Home => {
                self.cx = 0;
            }
            Key::End => {
                if self.cy < self.rows.len() {
                    self.cx = self.rows[self.cy].len();
                }
            }
            Key::Other(b) if b == BACKSPACE || b == ctrl_key(b'h') => {
                self.delete_char();
            }
            Key::Delete => {
                self.move_cursor(Key::ArrowRight);
                self.delete_char();
            }
            Key::PageUp => {
                self.cy = self.rowoff;
                for _ in 0..self.screenrows {
                    self.move_cursor(Key::ArrowUp);
                }
            }
            Key::PageDown => {
                self.cy = (self.rowoff + self.screenrows.saturating_sub(1)).min(self.rows.len());
                for _ in 0..self.screenrows {
                    self.move_cursor(Key::ArrowDown);
                }
            }
            Key::ArrowLeft | Key::ArrowRight | Key::ArrowUp | Key::ArrowDown => {
                self.move_cursor(key);
            }
            Key::Other(b) => {
                self.insert_char(b);
            }
        }

        self.quit_times = QUIT_TIMES;
        Ok(true)
    }

    /// Moves `(cx, cy)` with wrap: left at column 0 jumps to the end of the
    /// previous row, right at end-of-row jumps to the start of the next
    /// row; `cx` is snapped to the (possibly shorter) new row's length
    /// afterwards so the cursor never rests past it (spec.md §4.7).
    fn move_cursor(&mut self, key: Key) {
        match key {
            Key::ArrowLeft => {
                if self.cx > 0 {
                    self.cx -= 1;
                } else if self.cy > 0 {
                    self.cy -= 1;
                    self.cx = self.rows[self.cy].len();
                }
            }
            Key::ArrowRight => {
                if let Some(row) = self.rows.get(self.cy) {
                    if self.cx < row.len() {
                        self.cx += 1;
                    } else {
                        self.cy += 1;
                        self.cx = 0;
                    }
                }
            }
            Key::ArrowUp => {
                self.cy = self.cy.saturating_sub(1);
            }
            Key::ArrowDown => {
                if self.cy < self.rows.len() {
                    self.cy += 1;
                }
            }
            _ => {}
        }

        let row_len = self.rows.get(self.cy).map_or(0, Row::len);
        if self.cx > row_len {
            self.cx = row_len;
        }
    }

    fn clear_screen_for_exit(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(b"\x1b[2J")?;
        stdout.write_all(b"\x1b[H")?;
        stdout.flush()?;
        Ok(())
    }

    // ---- prompt sub-mode (spec.md §4.7) ----

    /// Collects a line of input in the message bar. `template` has its
    /// first `{}` replaced by the buffer collected so far on each render.
    /// `callback` is invoked after every key, including the cancelling/
    /// accepting one.
    pub fn prompt(
        &mut self,
        template: &str,
        mut callback: impl FnMut(&mut Self, &[u8], Key),
    ) -> Result<Option<Vec<u8>>> {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let shown = template.replacen("{}", &String::from_utf8_lossy(&buf), 1);
            self.set_status_message(shown);
            self.refresh_screen()?;

            let key = self.terminal.read_key()?;

            match key {
                Key::Delete => {
                    buf.pop();
                }
                Key::Other(b) if b == BACKSPACE || b == ctrl_key(b'h') => {
                    buf.pop();
                }
                Key::Other(b) if b == ESCAPE => {
                    self.status_msg = None;
                    callback(self, &buf, key);
                    return Ok(None);
                }
                Key::Other(b) if b == ENTER => {
                    if !buf.is_empty() {
                        self.status_msg = None;
                        callback(self, &buf, key);
                        return Ok(Some(buf));
                    }
                }
                Key::Other(b) if b < 128 && !b.is_ascii_control() => {
                    buf.push(b);
                }
                _ => {}
            }

            callback(self, &buf, key);
        }
    }

    // ---- find sub-mode (spec.md §4.7) ----

    fn find(&mut self) -> Result<()> {
        let saved = (self.cx, self.cy, self.coloff, self.rowoff);
        let mut state = FindState::new(saved.1);

        let result = self.prompt(
            "Search: {} (Use ESC/Arrows/Enter)",
            |ed, query, key| find_callback(ed, &mut state, query, key),
        )?;

        if result.is_none() {
            (self.cx, self.cy, self.coloff, self.rowoff) = saved;
        }
        Ok(())
    }

    // ---- scroll/render pipeline (spec.md §4.8) ----

    fn scroll(&mut self) {
        self.rx = self
            .rows
            .get(self.cy)
            .map_or(0, |row| row.cx_to_rx(self.cx));

        if self.cy < self.rowoff {
            self.rowoff = self.cy;
        }
        if self.cy >= self.rowoff + self.screenrows {
            self.rowoff = self.cy - self.screenrows + 1;
        }
        if self.rx < self.coloff {
            self.coloff = self.rx;
        }
        if self.rx >= self.coloff + self.screencols {
            self.coloff = self.rx - self.screencols + 1;
        }
    }

    pub fn refresh_screen(&mut self) -> Result<()> {
        self.scroll();

        let mut ob = OutputBuffer::new();
        ob.append(b"\x1b[?25l");
        ob.append(b"\x1b[H");

        self.draw_rows(&mut ob);
        self.draw_status_bar(&mut ob);
        self.draw_message_bar(&mut ob);

        ob.append(
            format!(
                "\x1b[{};{}H",
                self.cy - self.rowoff + 1,
                self.rx - self.coloff + 1
            )
            .as_bytes(),
        );
        ob.append(b"\x1b[?25h");

        ob.flush_to(&mut io::stdout())?;
        Ok(())
    }

    fn draw_rows(&self, ob: &mut OutputBuffer) {
        for y in 0..self.screenrows {
            let filerow = y + self.rowoff;

            if filerow >= self.rows.len() {
                if self.rows.is_empty() && y == self.screenrows / 3 {
                    self.draw_welcome(ob);
                } else {
                    ob.append(b"~");
                }
            } else {
                self.draw_row(ob, &self.rows[filerow]);
            }

            ob.append(b"\x1b[K");
            ob.append(b"\r\n");
        }
    }

    fn draw_welcome(&self, ob: &mut OutputBuffer) {
        let mut msg = WELCOME;
        if msg.len() > self.screencols {
            msg = &msg[..self.screencols];
        }
        let mut padding = self.screencols.saturating_sub(msg.len()) / 2;
        if padding > 0 {
            ob.append(b"~");
            padding -= 1;
        }
        ob.append(" ".repeat(padding).as_bytes());
        ob.append(msg.as_bytes());
    }

    /// Emits up to `screencols` rendered bytes starting at `coloff`,
    /// batching color-change escapes and rendering control bytes as
    /// inverse-video `^X` (spec.md §4.8).
    fn draw_row(&self, ob: &mut OutputBuffer, row: &Row) {
        if self.coloff >= row.render.len() {
            return;
        }
        let end = (self.coloff + self.screencols).min(row.render.len());
        let bytes = &row.render[self.coloff..end];
        let hl = &row.hl[self.coloff..end];

        let mut current: Option<HlClass> = None;
        for (&b, &class) in bytes.iter().zip(hl) {
            if b < 27 {
                let sym = if b == 0 { b'@' } else { b + b'@' };
                ob.append(b"\x1b[7m");
                ob.append(&[sym]);
                ob.append(b"\x1b[m");
                if let Some(c) = current {
                    ob.append(format!("\x1b[{}m", c.color()).as_bytes());
                }
                continue;
            }

            if class == HlClass::Normal {
                if current.is_some() {
                    ob.append(b"\x1b[39m");
                    current = None;
                }
            } else if current != Some(class) {
                ob.append(format!("\x1b[{}m", class.color()).as_bytes());
                current = Some(class);
            }
            ob.append(&[b]);
        }
        ob.append(b"\x1b[39m");
    }

    fn draw_status_bar(&self, ob: &mut OutputBuffer) {
        ob.append(b"\x1b[7m");

        let name: String = self
            .filename
            .as_deref()
            .unwrap_or("[No Name]")
            .chars()
            .take(20)
            .collect();
        let modified = if self.dirty > 0 { " (modified)" } else { "" };
        let mut left = format!("{name} - {} lines{modified}", self.rows.len());
        truncate_at_char_boundary(&mut left, self.screencols);

        let filetype = self.syntax.map_or("no ft", |s| s.name);
        let right = format!("{filetype} | {}/{}", self.cy + 1, self.rows.len());

        if left.len() + right.len() <= self.screencols {
            let padding = self.screencols - left.len() - right.len();
            ob.append(left.as_bytes());
            ob.append(" ".repeat(padding).as_bytes());
            ob.append(right.as_bytes());
        } else {
            ob.append(left.as_bytes());
        }

        ob.append(b"\x1b[m");
        ob.append(b"\r\n");
    }

    fn draw_message_bar(&self, ob: &mut OutputBuffer) {
        ob.append(b"\x1b[K");
        if let Some(msg) = &self.status_msg {
            if !msg.expired() {
                let mut text = msg.text.clone();
                truncate_at_char_boundary(&mut text, self.screencols);
                ob.append(text.as_bytes());
            }
        }
    }
}

/// Truncates `filename` to `data.len()` before writing, so a short write
/// caps damage at the serialized length rather than leaving a longer prior
/// file partially overwritten (spec.md §4.5). File mode 0644 on creation
/// per spec.md §6.
fn write_truncated(filename: &str, data: &[u8]) -> io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .mode(0o644)
        .open(filename)?;
    file.set_len(data.len() as u64)?;
    file.seek(io::SeekFrom::Start(0))?;
    file.write_all(data)?;
    Ok(())
}

/// Truncates `s` to at most `max` bytes, backing off to the nearest char
/// boundary so a multi-byte filename can't panic the status bar.
fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// The find-mode prompt callback (spec.md §4.7): erases the previous
/// match's highlight, tracks search direction and wraps across the whole
/// row store, and overlays `Match` on the newly found span.
fn find_callback(ed: &mut Editor, state: &mut FindState, query: &[u8], key: Key) {
    if let Some((row, hl)) = state.saved_hl.take() {
        if row < ed.rows.len() {
            ed.rows[row].hl = hl;
        }
    }

    match key {
        Key::Other(b) if b == ENTER || b == ESCAPE => {
            state.last_match = None;
            state.direction = 1;
            return;
        }
        Key::ArrowRight | Key::ArrowDown => state.direction = 1,
        Key::ArrowLeft | Key::ArrowUp => state.direction = -1,
        _ => {
            state.last_match = None;
            state.direction = 1;
        }
    }

    if state.last_match.is_none() {
        state.direction = 1;
    }

    if ed.rows.is_empty() || query.is_empty() {
        return;
    }

    let numrows = ed.rows.len() as isize;
    // The first scan (no match yet) is seeded from the row the cursor was
    // on when find mode was entered, not row 0, so a query already
    // matching the entry row is found there immediately rather than after
    // wrapping all the way back around.
    let mut current = match state.last_match {
        Some(v) => v as isize,
        None => state.entry_row as isize - state.direction as isize,
    };

    for _ in 0..numrows {
        current += state.direction as isize;
        if current == -1 {
            current = numrows - 1;
        } else if current == numrows {
            current = 0;
        }
        let idx = current as usize;

        if let Some(offset) = find_subslice(&ed.rows[idx].render, query) {
            state.last_match = Some(idx);
            ed.cy = idx;
            ed.cx = ed.rows[idx].rx_to_cx(offset);
            ed.rowoff = ed.rows.len();

            state.saved_hl = Some((idx, ed.rows[idx].hl.clone()));
            for slot in ed.rows[idx].hl.iter_mut().skip(offset).take(query.len()) {
                *slot = HlClass::Match;
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::C_PROFILE;

    /// A headless editor for unit tests: bypasses `Terminal`/`Editor::new`
    /// entirely since none of the row-store/cursor logic under test reads
    /// from the tty.
    fn headless() -> EditorStub {
        EditorStub {
            cx: 0,
            cy: 0,
            rx: 0,
            rowoff: 0,
            coloff: 0,
            screenrows: 24,
            screencols: 80,
            rows: Vec::new(),
            filename: None,
            dirty: 0,
            quit_times: QUIT_TIMES,
            status_msg: None,
            syntax: Some(&C_PROFILE),
        }
    }

    /// Mirrors `Editor`'s fields without the `Terminal` reference, so tests
    /// can exercise row-store/cursor/find logic without a tty. The mutation
    /// methods below are copies of `Editor`'s (same bodies, no I/O).
    struct EditorStub {
        cx: usize,
        cy: usize,
        rx: usize,
        rowoff: usize,
        coloff: usize,
        screenrows: usize,
        screencols: usize,
        rows: Vec<Row>,
        filename: Option<String>,
        dirty: u32,
        quit_times: u32,
        status_msg: Option<StatusMessage>,
        syntax: Option<&'static SyntaxProfile>,
    }

    impl EditorStub {
        fn mark_dirty(&mut self) {
            self.dirty += 1;
        }

        fn insert_row(&mut self, at: usize, chars: Vec<u8>) {
            let at = at.min(self.rows.len());
            self.rows.insert(at, Row::new(chars));
            self.mark_dirty();
            highlight::rehighlight_all(&mut self.rows, self.syntax);
        }

        fn delete_row(&mut self, at: usize) {
            if at >= self.rows.len() {
                return;
            }
            self.rows.remove(at);
            self.mark_dirty();
            highlight::rehighlight_all(&mut self.rows, self.syntax);
        }

        fn row_insert_char(&mut self, row: usize, at: usize, c: u8) {
            self.rows[row].insert_char(at, c);
            self.mark_dirty();
            highlight::rehighlight_from(&mut self.rows, self.syntax, row);
        }

        fn row_append_string(&mut self, row: usize, text: &[u8]) {
            self.rows[row].append_bytes(text);
            self.mark_dirty();
            highlight::rehighlight_from(&mut self.rows, self.syntax, row);
        }

        fn insert_char(&mut self, c: u8) {
            if self.cy == self.rows.len() {
                self.insert_row(self.rows.len(), Vec::new());
            }
            self.row_insert_char(self.cy, self.cx, c);
            self.cx += 1;
        }

        fn insert_newline(&mut self) {
            if self.cx == 0 {
                self.insert_row(self.cy, Vec::new());
            } else {
                let suffix = self.rows[self.cy].split_off(self.cx);
                self.mark_dirty();
                self.insert_row(self.cy + 1, suffix);
            }
            self.cy += 1;
            self.cx = 0;
        }

        fn delete_char(&mut self) {
            if self.cy >= self.rows.len() {
                return;
            }
            if self.cx == 0 && self.cy == 0 {
                return;
            }
            if self.cx > 0 {
                self.rows[self.cy].delete_char(self.cx - 1);
                self.mark_dirty();
                highlight::rehighlight_from(&mut self.rows, self.syntax, self.cy);
                self.cx -= 1;
            } else {
                let prev_len = self.rows[self.cy - 1].len();
                let suffix = self.rows[self.cy].chars.clone();
                self.row_append_string(self.cy - 1, &suffix);
                self.delete_row(self.cy);
                self.cy -= 1;
                self.cx = prev_len;
            }
        }
    }

    #[test]
    fn split_then_join_round_trips() {
        // Scenario D.
        let mut ed = headless();
        ed.insert_row(0, b"hello world".to_vec());
        ed.cx = 5;
        ed.cy = 0;

        ed.insert_newline();
        assert_eq!(ed.rows.len(), 2);
        assert_eq!(ed.rows[0].chars, b"hello");
        assert_eq!(ed.rows[1].chars, b" world");
        assert_eq!((ed.cx, ed.cy), (0, 1));

        ed.delete_char();
        assert_eq!(ed.rows.len(), 1);
        assert_eq!(ed.rows[0].chars, b"hello world");
        assert_eq!((ed.cx, ed.cy), (5, 0));
    }

    #[test]
    fn every_mutation_increments_dirty_and_insert_char_past_eof_creates_row() {
        let mut ed = headless();
        assert_eq!(ed.dirty, 0);
        ed.insert_char(b'a');
        assert_eq!(ed.rows.len(), 1);
        assert_eq!(ed.rows[0].chars, b"a");
        assert!(ed.dirty > 0);
    }

    #[test]
    fn delete_char_is_noop_at_origin_and_past_eof() {
        let mut ed = headless();
        ed.delete_char();
        assert_eq!(ed.rows.len(), 0);
        assert_eq!(ed.dirty, 0);

        ed.insert_row(0, b"x".to_vec());
        ed.cy = 5; // past end of buffer
        ed.delete_char();
        assert_eq!(ed.rows[0].chars, b"x");
    }

    #[test]
    fn find_wraps_and_highlights_match_then_restores_on_cancel() {
        // Scenario F.
        let mut ed = headless();
        for line in ["foo", "bar", "foo"] {
            ed.insert_row(ed.rows.len(), line.as_bytes().to_vec());
        }
        ed.cx = 0;
        ed.cy = 2;
        let saved = (ed.cx, ed.cy, ed.coloff, ed.rowoff);

        let mut state = FindState::new(saved.1);
        let query = b"foo";

        // Before any callback invocation, no row's hl contains Match.
        for row in &ed.rows {
            assert!(!row.hl.contains(&HlClass::Match));
        }

        find_callback_stub(&mut ed, &mut state, query, Key::Other(b'f'));
        find_callback_stub(&mut ed, &mut state, query, Key::ArrowRight);

        assert_eq!((ed.cx, ed.cy), (0, 0));
        assert!(ed.rows[0].hl.contains(&HlClass::Match));

        find_callback_stub(&mut ed, &mut state, query, Key::Other(ESCAPE));
        (ed.cx, ed.cy, ed.coloff, ed.rowoff) = saved;

        for row in &ed.rows {
            assert!(!row.hl.contains(&HlClass::Match));
        }
        assert_eq!((ed.cx, ed.cy, ed.coloff, ed.rowoff), saved);
    }

    /// `find_callback` takes `&mut Editor<'_>`; this adapts the same logic
    /// to `EditorStub` for tests that don't want a `Terminal`.
    fn find_callback_stub(ed: &mut EditorStub, state: &mut FindState, query: &[u8], key: Key) {
        if let Some((row, hl)) = state.saved_hl.take() {
            if row < ed.rows.len() {
                ed.rows[row].hl = hl;
            }
        }

        match key {
            Key::Other(b) if b == ENTER || b == ESCAPE => {
                state.last_match = None;
                state.direction = 1;
                return;
            }
            Key::ArrowRight | Key::ArrowDown => state.direction = 1,
            Key::ArrowLeft | Key::ArrowUp => state.direction = -1,
            _ => {
                state.last_match = None;
                state.direction = 1;
            }
        }

        if state.last_match.is_none() {
            state.direction = 1;
        }
        if ed.rows.is_empty() || query.is_empty() {
            return;
        }

        let numrows = ed.rows.len() as isize;
        let mut current = match state.last_match {
            Some(v) => v as isize,
            None => state.entry_row as isize - state.direction as isize,
        };

        for _ in 0..numrows {
            current += state.direction as isize;
            if current == -1 {
                current = numrows - 1;
            } else if current == numrows {
                current = 0;
            }
            let idx = current as usize;

            if let Some(offset) = find_subslice(&ed.rows[idx].render, query) {
                state.last_match = Some(idx);
                ed.cy = idx;
                ed.cx = ed.rows[idx].rx_to_cx(offset);
                ed.rowoff = ed.rows.len();

                state.saved_hl = Some((idx, ed.rows[idx].hl.clone()));
                for slot in ed.rows[idx].hl.iter_mut().skip(offset).take(query.len()) {
                    *slot = HlClass::Match;
                }
                break;
            }
        }
    }

    #[test]
    fn quit_guard_exits_on_fourth_press() {
        // Scenario 7: k presses on a dirty buffer exit iff k > 3.
        let mut guard = QUIT_TIMES;
        let mut dirty = true;
        let mut presses = 0;
        loop {
            presses += 1;
            if dirty && guard > 0 {
                guard -= 1;
                continue;
            }
            dirty = false;
            break;
        }
        assert_eq!(presses, 4);
    }
}
