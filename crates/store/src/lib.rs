//! # Margin Store
//!
//! Persistent, serialized storage for line-anchored annotations.
//!
//! One JSON sidecar per workspace root holds every annotation for that
//! workspace, keyed by workspace-relative path and 0-based line number.
//! The store is lazily materialized (no file until the first save), loaded
//! wholesale with a byte-size guard, and rewritten wholesale on every
//! mutation under a per-sidecar FIFO lock so concurrent read-modify-write
//! cycles never interleave.
//!
//! ## Architecture
//!
//! ```text
//! caller (CLI / editor boundary)
//!     │
//!     ├──> AnnotationStore ── load / save / rename / reconcile
//!     │          │
//!     │          ├──> WorkspaceResolver (path -> root + store key)
//!     │          ├──> StoreLocks (one fair mutex per sidecar)
//!     │          └──> margin-anchor (relocation during reconcile)
//!     │
//!     └──< bool: "did persisted state change" (drives redraws)
//! ```

mod config;
mod error;
mod lock;
mod model;
mod paths;
mod store;

pub use config::{
    StoreConfig, DEFAULT_MAX_SIDECAR_BYTES, DEFAULT_MAX_TEXT_LEN, DEFAULT_SEARCH_RADIUS,
    DEFAULT_SIDECAR_FILENAME,
};
pub use error::{Result, StoreError};
pub use model::{sanitize_text, FileNotes, Note, NoteStore};
pub use paths::{
    discover_workspace_root, validate_sidecar_filename, RootResolver, WorkspacePath,
    WorkspaceResolver,
};
pub use store::AnnotationStore;
