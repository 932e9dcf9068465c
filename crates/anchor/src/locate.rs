use crate::document::TextSource;

/// Outcome of anchoring a stored line against the current document.
///
/// `is_match: false` means the snapshot was not found anywhere in the
/// search window; `line` then carries the last known position so callers
/// can render a broken anchor without losing the annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    pub line: usize,
    pub is_match: bool,
}

/// Strips all whitespace. Matching is containment over this normal form so
/// reformatting (indentation, spacing, CRLF) never breaks an anchor.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[must_use]
fn snapshot_matches(probe: &str, snapshot: &str) -> bool {
    normalize(probe).contains(&normalize(snapshot))
}

/// Extracts the current text at `line` spanning as many lines as `snapshot`
/// does, trimmed. Probing past end-of-document yields the empty string,
/// which is a definite mismatch for any non-empty snapshot.
#[must_use]
pub fn probe_at(doc: &dyn TextSource, line: usize, snapshot: &str) -> String {
    let span = snapshot.split('\n').count();
    if line + span > doc.line_count() {
        return String::new();
    }
    doc.range_text(line, line + span - 1).trim().to_string()
}

/// Maps a stored `(original_line, snapshot)` anchor to the line's current
/// position.
///
/// An empty snapshot cannot be verified and is trusted at `original_line`
/// unconditionally. Otherwise the anchor line is probed first; on mismatch,
/// candidate start lines are scanned in ascending order across the whole
/// document when `search_radius <= 0`, or across
/// `[original_line - r, original_line + r]` clamped to document bounds. The
/// first matching line wins: the tie-break is deliberately positional, not
/// nearest-to-original.
#[must_use]
pub fn locate(
    doc: &dyn TextSource,
    original_line: usize,
    snapshot: &str,
    search_radius: i64,
) -> LineMatch {
    if snapshot.is_empty() {
        return LineMatch {
            line: original_line,
            is_match: true,
        };
    }

    if original_line < doc.line_count()
        && snapshot_matches(&probe_at(doc, original_line, snapshot), snapshot)
    {
        return LineMatch {
            line: original_line,
            is_match: true,
        };
    }

    let line_count = doc.line_count();
    if line_count == 0 {
        return LineMatch {
            line: original_line,
            is_match: false,
        };
    }

    let (start, end) = if search_radius > 0 {
        let radius = search_radius as usize;
        (
            original_line.saturating_sub(radius),
            (original_line + radius).min(line_count - 1),
        )
    } else {
        (0, line_count - 1)
    };

    for candidate in start..=end {
        if candidate == original_line {
            continue;
        }
        if snapshot_matches(&probe_at(doc, candidate, snapshot), snapshot) {
            log::debug!(
                "anchor drifted: line {} relocated to {}",
                original_line,
                candidate
            );
            return LineMatch {
                line: candidate,
                is_match: true,
            };
        }
    }

    LineMatch {
        line: original_line,
        is_match: false,
    }
}

/// Captures the context snapshot for a new or edited annotation: the active
/// selection when there is one, otherwise the full text of the target line.
/// Trimmed before storage either way.
#[must_use]
pub fn capture_context(doc: &dyn TextSource, line: usize, selection: Option<&str>) -> String {
    match selection {
        Some(text) => text.trim().to_string(),
        None => doc.line_text(line).unwrap_or_default().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn hit(line: usize) -> LineMatch {
        LineMatch {
            line,
            is_match: true,
        }
    }

    fn miss(line: usize) -> LineMatch {
        LineMatch {
            line,
            is_match: false,
        }
    }

    #[test]
    fn exact_match_stays_put() {
        let doc = Document::new("line1\nline2\nline3");
        assert_eq!(locate(&doc, 1, "line2", 5), hit(1));
    }

    #[test]
    fn ignores_whitespace_differences() {
        assert!(snapshot_matches("const a = 1;", "const   a=1;"));
        assert!(snapshot_matches("  return ", "return"));
        assert!(!snapshot_matches("const a = 1;", "const b = 1;"));
    }

    #[test]
    fn containment_tolerates_same_line_additions() {
        let doc = Document::new("let total = items.len(); // recounted");
        assert_eq!(locate(&doc, 0, "let total = items.len();", 5), hit(0));
    }

    #[test]
    fn relocates_after_insertion_above() {
        let doc = Document::new("line1\ninserted\nline2\nline3");
        assert_eq!(locate(&doc, 1, "line2", 5), hit(2));
    }

    #[test]
    fn relocates_after_deletion_above() {
        let doc = Document::new("line2\nline3");
        assert_eq!(locate(&doc, 1, "line2", 5), hit(0));
    }

    #[test]
    fn lost_context_keeps_original_line() {
        let doc = Document::new("lineA\nlineB");
        assert_eq!(locate(&doc, 0, "lineZ", 5), miss(0));
    }

    #[test]
    fn empty_snapshot_is_trusted_unconditionally() {
        let doc = Document::new("anything\nat all");
        assert_eq!(locate(&doc, 7, "", 5), hit(7));
        let empty = Document::new("");
        assert_eq!(locate(&empty, 3, "", 5), hit(3));
    }

    #[test]
    fn radius_bounds_the_search_window() {
        // Target text sits 4 lines below the anchor; radius 2 cannot see it.
        let doc = Document::new("a\nb\nc\nd\ntarget\nf");
        assert_eq!(locate(&doc, 0, "target", 2), miss(0));
        assert_eq!(locate(&doc, 0, "target", 4), hit(4));
    }

    #[test]
    fn nonpositive_radius_searches_whole_document() {
        let doc = Document::new("a\nb\nc\nd\ne\nf\ng\ntarget");
        assert_eq!(locate(&doc, 0, "target", 0), hit(7));
        assert_eq!(locate(&doc, 0, "target", -1), hit(7));
    }

    #[test]
    fn prefers_first_match_in_ascending_order() {
        // Duplicate content above and below the anchor: the ascending scan
        // picks the earlier line even though the lower one is closer.
        let doc = Document::new("dup\na\nb\nc\nanchor-was-here\ndup");
        assert_eq!(locate(&doc, 4, "dup", 0), hit(0));
    }

    #[test]
    fn multiline_snapshot_probes_a_span() {
        let doc = Document::new("x\nfn f() {\n    body();\n}\ny");
        assert_eq!(locate(&doc, 0, "fn f() {\n    body();", 5), hit(1));
    }

    #[test]
    fn probe_past_end_of_document_is_empty() {
        let doc = Document::new("a\nb");
        assert_eq!(probe_at(&doc, 1, "two\nlines"), "");
        assert_eq!(probe_at(&doc, 1, "one"), "b");
    }

    #[test]
    fn anchor_beyond_document_end_still_searches() {
        let doc = Document::new("a\ntarget\nb");
        assert_eq!(locate(&doc, 40, "target", 0), hit(1));
    }

    #[test]
    fn empty_document_never_matches_nonempty_snapshot() {
        let doc = Document::new("");
        // A single empty line still probes to "", which contains nothing.
        assert_eq!(locate(&doc, 0, "text", 5), miss(0));
    }

    #[test]
    fn capture_context_prefers_selection() {
        let doc = Document::new("  let x = 1;  ");
        assert_eq!(capture_context(&doc, 0, Some("  x = 1 ")), "x = 1");
        assert_eq!(capture_context(&doc, 0, None), "let x = 1;");
        assert_eq!(capture_context(&doc, 9, None), "");
    }

    proptest! {
        #[test]
        fn proptest_whitespace_changes_never_break_the_anchor(
            head in "[a-z]{2,10}",
            tail in "[a-z]{2,10}",
            indent in "[ \\t]{0,6}",
            gap in "[ \\t]{1,6}",
        ) {
            let snapshot = format!("{head} {tail}");
            let mutated = format!("{indent}{head}{gap}{tail}");
            let doc = Document::new(&format!("filler\n{mutated}\nfiller"));
            prop_assert_eq!(locate(&doc, 1, &snapshot, 5), hit(1));
        }

        #[test]
        fn proptest_locate_is_deterministic(
            body in "[a-z \\n]{0,64}",
            line in 0usize..16,
            radius in -2i64..8,
        ) {
            let doc = Document::new(&body);
            let first = locate(&doc, line, "needle", radius);
            let second = locate(&doc, line, "needle", radius);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn proptest_drift_within_radius_is_found(
            above in 1usize..6,
            needle in "[a-z]{6,14}",
        ) {
            // Anchor was at line 0; `above` filler lines push it down. The
            // filler shares no characters with the needle alphabet.
            let mut text = String::new();
            for _ in 0..above {
                text.push_str("// ----\n");
            }
            text.push_str(&needle);
            let doc = Document::new(&text);
            prop_assert_eq!(locate(&doc, 0, &needle, above as i64), hit(above));
        }
    }
}
