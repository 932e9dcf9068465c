/// Read-only view of a live document, as held by whatever owns the text
/// (an editor buffer, a file read from disk, a test fixture).
///
/// All three operations are synchronous pure reads. Lines are 0-based.
pub trait TextSource {
    /// Number of lines in the document.
    fn line_count(&self) -> usize;

    /// Text of a single line, without its terminator. `None` out of bounds.
    fn line_text(&self, line: usize) -> Option<&str>;

    /// Exact text spanning the inclusive line range `start..=end`, joined
    /// with `\n`. Out-of-bounds lines are simply not included.
    fn range_text(&self, start: usize, end: usize) -> String;
}

/// In-memory [`TextSource`] over a full document snapshot.
#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Splits `text` on `\n`, dropping a trailing `\r` per line so CRLF
    /// input yields the same view as LF input.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self { lines }
    }
}

impl TextSource for Document {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(String::as_str)
    }

    fn range_text(&self, start: usize, end: usize) -> String {
        if start > end {
            return String::new();
        }
        let end = end.min(self.lines.len().saturating_sub(1));
        self.lines
            .get(start..=end)
            .map(|slice| slice.join("\n"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_lines_and_counts_trailing_newline() {
        let doc = Document::new("a\nb\n");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_text(1), Some("b"));
        assert_eq!(doc.line_text(2), Some(""));
        assert_eq!(doc.line_text(3), None);
    }

    #[test]
    fn strips_carriage_returns() {
        let doc = Document::new("a\r\nb\r\n");
        assert_eq!(doc.line_text(0), Some("a"));
        assert_eq!(doc.line_text(1), Some("b"));
    }

    #[test]
    fn range_text_is_inclusive_and_clamped() {
        let doc = Document::new("a\nb\nc");
        assert_eq!(doc.range_text(0, 1), "a\nb");
        assert_eq!(doc.range_text(1, 99), "b\nc");
        assert_eq!(doc.range_text(2, 1), "");
    }
}
