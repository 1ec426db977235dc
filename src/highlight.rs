//! Per-row syntax highlighter with forward-propagating multi-line comment
//! state (spec.md §4.4).

use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlClass {
    Normal,
    Comment,
    MLComment,
    Keyword1,
    Keyword2,
    String,
    Number,
    Match,
}

impl HlClass {
    /// SGR foreground color code for this class.
    pub fn color(self) -> u8 {
        match self {
            HlClass::Comment | HlClass::MLComment => 36,
            HlClass::Keyword1 => 33,
            HlClass::Keyword2 => 32,
            HlClass::String => 35,
            HlClass::Number => 31,
            HlClass::Match => 34,
            HlClass::Normal => 39,
        }
    }
}

/// Feature flags for a syntax profile: which highlight rules are active.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxFlags {
    pub numbers: bool,
    pub strings: bool,
}

pub struct SyntaxProfile {
    pub name: &'static str,
    /// Filename patterns: an entry starting with `.` matches the trailing
    /// extension, anything else matches as a substring of the whole
    /// filename.
    pub file_match: &'static [&'static str],
    /// Keyword tokens; a trailing `|` marks a type keyword (Keyword2).
    pub keywords: &'static [&'static str],
    pub singleline_comment_start: &'static str,
    pub multiline_comment_start: &'static str,
    pub multiline_comment_end: &'static str,
    pub flags: SyntaxFlags,
}

impl SyntaxProfile {
    fn highlight_numbers(&self) -> bool {
        self.flags.numbers
    }

    fn highlight_strings(&self) -> bool {
        self.flags.strings
    }
}

/// The one built-in C-like profile (spec.md §1 excludes any other
/// language). Keyword list and structure follow the conventional kilo
/// `HLDB` shape (see DESIGN.md).
pub static C_PROFILE: SyntaxProfile = SyntaxProfile {
    name: "c",
    file_match: &[".c", ".h", ".cpp", ".hpp", ".cc"],
    keywords: &[
        "switch", "if", "while", "for", "break", "continue", "return", "else", "struct", "union",
        "typedef", "static", "enum", "class", "case", "int|", "long|", "double|", "float|",
        "char|", "unsigned|", "signed|", "void|",
    ],
    singleline_comment_start: "//",
    multiline_comment_start: "/*",
    multiline_comment_end: "*/",
    flags: SyntaxFlags {
        numbers: true,
        strings: true,
    },
};

static HLDB: &[&SyntaxProfile] = &[&C_PROFILE];

/// Selects a syntax profile for `filename`: first match wins, an
/// extension pattern is tried against the trailing `.xxx`, a non-extension
/// pattern is tried as a substring of the whole filename.
pub fn select_syntax(filename: &str) -> Option<&'static SyntaxProfile> {
    for profile in HLDB {
        for pattern in profile.file_match {
            let is_ext = pattern.starts_with('.');
            let matched = if is_ext {
                filename.ends_with(pattern)
            } else {
                filename.contains(pattern)
            };
            if matched {
                return Some(profile);
            }
        }
    }
    None
}

fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0 || b",.()+-/*=~%<>[];".contains(&b)
}

/// Recomputes `row.hl` and `row.hl_open_comment` from `row.render`, given
/// the `hl_open_comment` of the previous row (`false` for row 0). Returns
/// the new `hl_open_comment`.
pub fn highlight_row(row: &mut Row, profile: Option<&SyntaxProfile>, prev_open_comment: bool) -> bool {
    let bytes = row.render.clone();
    let mut hl = vec![HlClass::Normal; bytes.len()];

    let Some(profile) = profile else {
        row.hl = hl;
        row.hl_open_comment = false;
        return false;
    };

    let scs = profile.singleline_comment_start.as_bytes();
    let mcs = profile.multiline_comment_start.as_bytes();
    let mce = profile.multiline_comment_end.as_bytes();

    let mut prev_sep = true;
    let mut in_string: u8 = 0;
    let mut in_comment = prev_open_comment;
    let mut i = 0;

    while i < bytes.len() {
        let prev_hl = if i > 0 { hl[i - 1] } else { HlClass::Normal };

        if in_string == 0 && !in_comment && !scs.is_empty() && bytes[i..].starts_with(scs) {
            for slot in hl.iter_mut().skip(i) {
                *slot = HlClass::Comment;
            }
            break;
        }

        if in_string == 0 {
            if in_comment {
                hl[i] = HlClass::MLComment;
                if !mce.is_empty() && bytes[i..].starts_with(mce) {
                    for k in 0..mce.len() {
                        hl[i + k] = HlClass::MLComment;
                    }
                    i += mce.len();
                    in_comment = false;
                    prev_sep = true;
                    continue;
                }
                i += 1;
                continue;
            } else if !mcs.is_empty() && bytes[i..].starts_with(mcs) {
                for k in 0..mcs.len() {
                    hl[i + k] = HlClass::MLComment;
                }
                i += mcs.len();
                in_comment = true;
                continue;
            }
        }

        if profile.highlight_strings() {
            if in_string != 0 {
                hl[i] = HlClass::String;
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    hl[i + 1] = HlClass::String;
                    i += 2;
                    continue;
                }
                if bytes[i] == in_string {
                    in_string = 0;
                    prev_sep = true;
                }
                i += 1;
                continue;
            } else if bytes[i] == b'\'' || bytes[i] == b'"' {
                in_string = bytes[i];
                hl[i] = HlClass::String;
                i += 1;
                continue;
            }
        }

        if profile.highlight_numbers() {
            let is_digit = bytes[i].is_ascii_digit();
            let continues_number = is_digit && (prev_sep || prev_hl == HlClass::Number);
            let decimal_point = bytes[i] == b'.' && prev_hl == HlClass::Number;
            if continues_number || decimal_point {
                hl[i] = HlClass::Number;
                i += 1;
                prev_sep = false;
                continue;
            }
        }

        if prev_sep {
            let mut matched_kw = false;
            for kw in profile.keywords {
                let (word, is_type) = match kw.strip_suffix('|') {
                    Some(stripped) => (stripped, true),
                    None => (*kw, false),
                };
                let wbytes = word.as_bytes();
                if bytes[i..].starts_with(wbytes) {
                    let sep_after = bytes.get(i + wbytes.len()).map_or(true, |&b| is_separator(b));
                    if sep_after {
                        let class = if is_type { HlClass::Keyword2 } else { HlClass::Keyword1 };
                        for slot in hl.iter_mut().skip(i).take(wbytes.len()) {
                            *slot = class;
                        }
                        i += wbytes.len();
                        prev_sep = false;
                        matched_kw = true;
                        break;
                    }
                }
            }
            if matched_kw {
                continue;
            }
        }

        prev_sep = is_separator(bytes[i]);
        i += 1;
    }

    row.hl = hl;
    row.hl_open_comment = in_comment;
    in_comment
}

/// Rehighlights a single row in isolation and propagates forward only
/// while the row's `hl_open_comment` keeps changing -- the case after an
/// in-row character edit, where row indices are stable (spec.md §4.4,
/// §9's iterative-over-recursive redesign note).
pub fn rehighlight_from(rows: &mut [Row], profile: Option<&SyntaxProfile>, start: usize) {
    let mut idx = start;
    while idx < rows.len() {
        let prev_open = if idx == 0 {
            false
        } else {
            rows[idx - 1].hl_open_comment
        };
        let old_open = rows[idx].hl_open_comment;
        let new_open = highlight_row(&mut rows[idx], profile, prev_open);
        if new_open == old_open {
            break;
        }
        idx += 1;
    }
}

/// Recomputes every row top to bottom. Used after structural row-store
/// changes (insert/delete row, file load, syntax profile change) where
/// row indices have shifted and a stale `hl_open_comment` comparison
/// would be meaningless.
pub fn rehighlight_all(rows: &mut [Row], profile: Option<&SyntaxProfile>) {
    let mut prev_open = false;
    for row in rows.iter_mut() {
        prev_open = highlight_row(row, profile, prev_open);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(text: &str) -> Row {
        Row::new(text.as_bytes().to_vec())
    }

    #[test]
    fn forward_comment_propagation() {
        // Scenario B.
        let mut rows = vec![make_row("a /* b"), make_row("c d"), make_row("e */ f")];
        rehighlight_all(&mut rows, Some(&C_PROFILE));

        assert!(rows[0].hl_open_comment);
        assert!(rows[1].hl.iter().all(|h| *h == HlClass::MLComment));
        assert!(!rows[2].hl_open_comment);
        assert_eq!(rows[2].hl[0], HlClass::MLComment);
        assert_eq!(rows[2].hl[1], HlClass::MLComment);
        assert_eq!(rows[2].hl[2], HlClass::MLComment);
        assert_eq!(rows[2].hl[3], HlClass::MLComment);
        assert_eq!(rows[2].hl[4], HlClass::Normal);

        // Deleting the closer re-propagates: row 2's hl_open_comment flips
        // to true.
        rows[2].chars = b"e  f".to_vec();
        rows[2].update_render();
        rehighlight_from(&mut rows, Some(&C_PROFILE), 2);
        assert!(rows[2].hl_open_comment);
    }

    #[test]
    fn keyword_vs_longer_identifier() {
        // Scenario C.
        let mut rows = vec![make_row("int x; integer y;")];
        rehighlight_all(&mut rows, Some(&C_PROFILE));
        let hl = &rows[0].hl;
        assert_eq!(hl[0], HlClass::Keyword2);
        assert_eq!(hl[1], HlClass::Keyword2);
        assert_eq!(hl[2], HlClass::Keyword2);
        assert_eq!(hl[4], HlClass::Normal); // 'x'
        // "integer" is not a keyword match (longer token)
        for c in &hl[7..14] {
            assert_eq!(*c, HlClass::Normal);
        }
    }

    #[test]
    fn hl_len_always_matches_render_len() {
        let mut rows = vec![make_row("\"str\" + 42 /* c */ // x")];
        rehighlight_all(&mut rows, Some(&C_PROFILE));
        assert_eq!(rows[0].hl.len(), rows[0].render.len());
    }

    #[test]
    fn no_syntax_profile_disables_highlighting() {
        let mut rows = vec![make_row("int x;")];
        rehighlight_all(&mut rows, None);
        assert!(rows[0].hl.iter().all(|h| *h == HlClass::Normal));
        assert!(!rows[0].hl_open_comment);
    }
}
