use chrono::DateTime;
use console::style;
use margin_store::Note;

/// `"<text> • [<author>, <date>]"` — the label shown next to a line, with
/// a broken-link prefix when the anchor could not be verified.
#[must_use]
pub fn note_label(note: &Note, is_match: bool) -> String {
    let label = format!(
        "{} • [{}, {}]",
        note.text,
        note.author,
        format_date(note.updated_at)
    );
    if is_match {
        label
    } else {
        format!("(broken link) {label}")
    }
}

#[must_use]
pub fn format_date(epoch_ms: u64) -> String {
    DateTime::from_timestamp_millis(epoch_ms as i64)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// One annotation line for `show`/`list` output. Display lines are 1-based;
/// broken anchors render dimmed with a warning marker.
#[must_use]
pub fn note_line(line: usize, note: &Note, is_match: bool) -> String {
    let loc = style(format!("L{}", line + 1)).cyan();
    if is_match {
        format!("  {loc}  {}", note_label(note, true))
    } else {
        format!(
            "  {loc}  {} {}",
            style("⚠").yellow(),
            style(note_label(note, false)).dim()
        )
    }
}

#[must_use]
pub fn file_heading(relative: &str, count: usize) -> String {
    format!(
        "{} ({} annotation{})",
        style(relative).bold(),
        count,
        if count == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
            author: "Tester".to_string(),
            updated_at: 1_625_097_600_000,
            context: "code".to_string(),
        }
    }

    #[test]
    fn label_contains_text_author_and_date() {
        let label = note_label(&note("Hello world"), true);
        assert!(label.contains("Hello world"));
        assert!(label.contains("Tester"));
        assert!(label.contains("2021-07-01"));
        assert!(!label.contains("broken"));
    }

    #[test]
    fn broken_anchor_is_marked() {
        let label = note_label(&note("Fix logic"), false);
        assert!(label.starts_with("(broken link)"));
        assert!(label.contains("Fix logic"));
    }

    #[test]
    fn note_line_is_one_based() {
        let rendered = note_line(0, &note("x"), true);
        assert!(console::strip_ansi_codes(&rendered).contains("L1"));
    }
}
