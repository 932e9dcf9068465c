//! # Margin Anchor
//!
//! Line anchoring for drift-tolerant annotations.
//!
//! An annotation is saved against a line number plus a snapshot of the text
//! that was on that line. After the file is edited the line number alone is
//! unreliable, so [`locate`] relocates the anchor by whitespace-normalized
//! content matching over a bounded window and reports whether the match is
//! trustworthy.
//!
//! ## Example
//!
//! ```
//! use margin_anchor::{locate, Document};
//!
//! let doc = Document::new("line1\ninserted\nline2\nline3");
//! // The anchor was captured at line 1 ("line2"), which has since moved down.
//! let found = locate(&doc, 1, "line2", 5);
//! assert_eq!(found.line, 2);
//! assert!(found.is_match);
//! ```

mod document;
mod locate;

pub use document::{Document, TextSource};
pub use locate::{capture_context, locate, normalize, probe_at, LineMatch};
