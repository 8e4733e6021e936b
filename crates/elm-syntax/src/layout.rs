//! Layout pre-pass: comment masking and top-level splitting.
//!
//! Elm requires every top-level declaration to start in column 0 and every
//! continuation line to be indented, so once comments and literal contents
//! are blanked out a module splits cleanly into one chunk per declaration.

use std::ops::Range;

pub(crate) const BOM: char = '\u{feff}';

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment(u32),
    String,
    TripleString,
    Char,
}

/// Replace comments and the contents of string/char literals with spaces.
///
/// The result has exactly the same byte length as `source` and keeps every
/// line break, so offsets and line numbers carry over unchanged. Quotes are
/// blanked too: a closing `"""` may sit in column 0.
pub fn mask_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices();
    let mut state = State::Code;
    let mut prev: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        let rest = &source[i..];
        if i == 0 && c == BOM {
            blank(&mut out, c);
            continue;
        }
        match state {
            State::Code => {
                if rest.starts_with("--") {
                    state = State::LineComment;
                    blank(&mut out, c);
                } else if rest.starts_with("{-") {
                    state = State::BlockComment(1);
                    blank(&mut out, c);
                    skip_blank(&mut out, &mut chars);
                } else if rest.starts_with("\"\"\"") {
                    out.push_str("   ");
                    chars.nth(1);
                    state = State::TripleString;
                } else if c == '"' {
                    blank(&mut out, c);
                    state = State::String;
                } else if c == '\'' && !prev.is_some_and(is_ident_char) {
                    blank(&mut out, c);
                    state = State::Char;
                } else {
                    out.push(c);
                }
                prev = Some(c);
            }
            State::LineComment => {
                if c == '\n' {
                    out.push(c);
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::BlockComment(depth) => {
                if rest.starts_with("{-") {
                    blank(&mut out, c);
                    skip_blank(&mut out, &mut chars);
                    state = State::BlockComment(depth + 1);
                } else if rest.starts_with("-}") {
                    blank(&mut out, c);
                    skip_blank(&mut out, &mut chars);
                    state = if depth == 1 {
                        State::Code
                    } else {
                        State::BlockComment(depth - 1)
                    };
                } else {
                    blank(&mut out, c);
                }
            }
            State::TripleString => {
                if rest.starts_with("\"\"\"") {
                    out.push_str("   ");
                    chars.nth(1);
                    state = State::Code;
                } else if c == '\\' {
                    blank(&mut out, c);
                    skip_blank(&mut out, &mut chars);
                } else {
                    blank(&mut out, c);
                }
            }
            State::String | State::Char => {
                let quote = if state == State::String { '"' } else { '\'' };
                if c == '\\' {
                    blank(&mut out, c);
                    skip_blank(&mut out, &mut chars);
                } else if c == quote {
                    blank(&mut out, c);
                    state = State::Code;
                } else if c == '\n' {
                    // Unterminated literal; let the parser report what follows.
                    out.push(c);
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }

    out
}

fn blank(out: &mut String, c: char) {
    if c == '\n' || c == '\r' {
        out.push(c);
    } else {
        out.extend(std::iter::repeat_n(' ', c.len_utf8()));
    }
}

fn skip_blank(out: &mut String, chars: &mut std::str::CharIndices<'_>) {
    if let Some((_, c)) = chars.next() {
        blank(out, c);
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// Split masked source into top-level declaration chunks.
///
/// A chunk starts at every line whose first byte is not whitespace and runs
/// up to the next such line, with trailing whitespace trimmed.
pub(crate) fn top_level_chunks(masked: &str) -> Vec<Range<usize>> {
    let mut starts = Vec::new();
    let mut line_start = 0;
    for line in masked.split_inclusive('\n') {
        if line.starts_with(|c: char| !c.is_whitespace()) {
            starts.push(line_start);
        }
        line_start += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(masked.len());
            let trimmed = masked[start..end].trim_end();
            start..start + trimmed.len()
        })
        .collect()
}
