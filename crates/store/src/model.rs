use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One annotation attached to one line of one file.
///
/// `context` is the ground truth for relocation: an immutable snapshot of
/// the source text at the anchor line, captured at creation or at the last
/// successful relocation. `updated_at` (epoch ms) is display ordering only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub author: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
    pub context: String,
}

/// Line number (0-based) to annotation. serde_json writes the keys as
/// decimal strings on the wire and validates them back into integers on
/// load, so a shape violation surfaces as a parse error rather than a
/// stringly-typed map leaking into the core.
pub type FileNotes = BTreeMap<u32, Note>;

/// The persisted document: workspace-relative path (forward slashes) to the
/// file's annotations. Invariant: no entry maps to an empty [`FileNotes`] —
/// emptied files are pruned on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteStore {
    pub files: BTreeMap<String, FileNotes>,
}

impl NoteStore {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total annotation count across all files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }
}

/// Strips control and zero-width characters from user-supplied text before
/// it reaches the sidecar.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !c.is_control() && !matches!(*c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_format_uses_string_line_keys() {
        let mut store = NoteStore::default();
        store.files.insert(
            "src/lib.rs".to_string(),
            BTreeMap::from([(
                4u32,
                Note {
                    text: "fix this".to_string(),
                    author: "alice".to_string(),
                    updated_at: 1_625_097_600_000,
                    context: "let x = 1;".to_string(),
                },
            )]),
        );

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["src/lib.rs"]["4"]["text"], "fix this");
        assert_eq!(json["src/lib.rs"]["4"]["updatedAt"], 1_625_097_600_000u64);

        let back: NoteStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn shape_violations_fail_to_parse() {
        // Line keys must be non-negative integers; note bodies must be objects.
        assert!(serde_json::from_str::<NoteStore>(r#"{"a.rs": {"x": {}}}"#).is_err());
        assert!(serde_json::from_str::<NoteStore>(r#"{"a.rs": {"1": "note"}}"#).is_err());
        assert!(serde_json::from_str::<NoteStore>(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn sanitize_strips_control_and_zero_width() {
        assert_eq!(sanitize_text("a\u{0007}b\u{200B}c\u{FEFF}"), "abc");
        assert_eq!(sanitize_text("plain text"), "plain text");
    }
}
