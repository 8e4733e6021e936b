//! Line index for converting between byte offsets and line/column positions.
//!
//! Parsed locations are 1-based with UTF-16 columns, while editors speak
//! 0-based (line, character) positions in UTF-16. Both directions go
//! through this index.

use crate::ast::Position;

/// Line index for a source file.
///
/// Caches line start positions for efficient position conversion.
pub struct LineIndex<'a> {
    /// Byte offset of the start of each line (0-indexed).
    line_starts: Vec<usize>,
    source: &'a str,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            source,
        }
    }

    /// Convert a byte offset to a 1-based position.
    pub fn position(&self, offset: usize) -> Position {
        let (line, character) = self.line_col(offset);
        Position {
            offset: offset.min(self.source.len()),
            line: line + 1,
            column: character + 1,
        }
    }

    /// Convert a byte offset to a 0-based (line, UTF-16 character) pair.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        let text_before = &self.source[line_start..offset];
        let character: u32 = text_before.chars().map(|c| c.len_utf16() as u32).sum();
        (line as u32, character)
    }

    /// Convert a 0-based (line, UTF-16 character) pair to a byte offset.
    ///
    /// Characters past the end of the line clamp to the line end.
    pub fn offset(&self, line: u32, character: u32) -> Option<usize> {
        let line_start = *self.line_starts.get(line as usize)?;
        let line_text = self.line_text(line)?;

        let mut utf16_offset = 0u32;
        for (byte_offset, c) in line_text.char_indices() {
            if utf16_offset >= character {
                return Some(line_start + byte_offset);
            }
            utf16_offset += c.len_utf16() as u32;
        }
        Some(line_start + line_text.len())
    }

    /// Text of a 0-based line, without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&'a str> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.source.len());
        let text = &self.source[start..end];
        Some(text.trim_end_matches('\n').trim_end_matches('\r'))
    }
}
