//! Row store and row renderer (spec.md §4.3).
//!
//! A row holds the authoritative `chars`, the tab-expanded `render`, and a
//! highlight classification of the same length as `render`. Treated as byte
//! vectors throughout -- Unicode/grapheme handling is an explicit Non-goal
//! (spec.md §1).

use crate::highlight::HlClass;

pub const TAB_STOP: usize = 8;

#[derive(Clone)]
pub struct Row {
    pub chars: Vec<u8>,
    pub render: Vec<u8>,
    pub hl: Vec<HlClass>,
    pub hl_open_comment: bool,
}

impl Row {
    pub fn new(chars: Vec<u8>) -> Self {
        let mut row = Self {
            chars,
            render: Vec::new(),
            hl: Vec::new(),
            hl_open_comment: false,
        };
        row.update_render();
        row
    }

    /// Rebuilds `render` from `chars`, expanding tabs to the next multiple
    /// of `TAB_STOP`. `hl` is re-derived (to `Normal`, same length) here;
    /// the highlighter overwrites it afterwards.
    pub fn update_render(&mut self) {
        self.render.clear();
        let mut col = 0;
        for &b in &self.chars {
            if b == b'\t' {
                self.render.push(b' ');
                col += 1;
                while col % TAB_STOP != 0 {
                    self.render.push(b' ');
                    col += 1;
                }
            } else {
                self.render.push(b);
                col += 1;
            }
        }
        self.hl = vec![HlClass::Normal; self.render.len()];
    }

    /// Maps a logical `chars` column to a rendered `render` column.
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0;
        for &b in self.chars.iter().take(cx) {
            if b == b'\t' {
                rx += (TAB_STOP - 1) - (rx % TAB_STOP);
            }
            rx += 1;
        }
        rx
    }

    /// Maps a rendered `render` column back to a logical `chars` column:
    /// the inverse of `cx_to_rx`, returning the final `cx` even if `rx` is
    /// past end-of-row.
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &b) in self.chars.iter().enumerate() {
            if b == b'\t' {
                cur_rx += (TAB_STOP - 1) - (cur_rx % TAB_STOP);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn insert_char(&mut self, at: usize, c: u8) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, c);
        self.update_render();
    }

    pub fn delete_char(&mut self, at: usize) {
        if at >= self.chars.len() {
            return;
        }
        self.chars.remove(at);
        self.update_render();
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.chars.extend_from_slice(bytes);
        self.update_render();
    }

    pub fn truncate(&mut self, at: usize) {
        self.chars.truncate(at);
        self.update_render();
    }

    pub fn split_off(&mut self, at: usize) -> Vec<u8> {
        let suffix = self.chars.split_off(at.min(self.chars.len()));
        self.update_render();
        suffix
    }
}
