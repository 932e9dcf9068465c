use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::lock::StoreLocks;
use crate::model::{sanitize_text, FileNotes, Note, NoteStore};
use crate::paths::{validate_sidecar_filename, WorkspaceResolver};
use margin_anchor::{locate, TextSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Durable, serialized CRUD over the annotation sidecar, keyed by
/// workspace-relative path and line.
///
/// The sidecar is the sole unit of atomicity: every mutation reads the
/// whole store, applies one change, and rewrites the whole store under the
/// per-sidecar lock. Plain [`load`](Self::load)s do not take the lock and
/// may observe either side of an in-flight write; callers tolerate
/// eventually-consistent display data and reconcile on the next refresh.
pub struct AnnotationStore {
    config: StoreConfig,
    resolver: Arc<dyn WorkspaceResolver>,
    locks: StoreLocks,
}

impl AnnotationStore {
    pub fn new(config: StoreConfig, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        Self {
            config,
            resolver,
            locks: StoreLocks::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Sidecar location for the workspace containing `file`: `Ok(None)`
    /// when the file is outside every known workspace, an error when the
    /// configured filename attempts path traversal.
    pub fn sidecar_path(&self, file: &Path) -> Result<Option<PathBuf>> {
        validate_sidecar_filename(&self.config.sidecar_filename)?;
        Ok(self
            .resolver
            .resolve(file)
            .map(|ws| ws.root.join(&self.config.sidecar_filename)))
    }

    /// Loads the full store for the workspace containing `file`.
    ///
    /// Absence (no sidecar yet, file outside any workspace) and oversize
    /// both yield an empty store; a parse failure of an existing,
    /// size-valid sidecar is fatal and propagates.
    pub async fn load(&self, file: &Path) -> Result<NoteStore> {
        match self.sidecar_path(file)? {
            Some(sidecar) => self.load_sidecar(&sidecar).await,
            None => Ok(NoteStore::default()),
        }
    }

    async fn load_sidecar(&self, sidecar: &Path) -> Result<NoteStore> {
        let meta = match tokio::fs::metadata(sidecar).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(NoteStore::default());
            }
            Err(err) => return Err(err.into()),
        };
        if meta.len() > self.config.max_sidecar_bytes {
            log::warn!(
                "annotation store {} is {} bytes (limit {}), loading as empty",
                sidecar.display(),
                meta.len(),
                self.config.max_sidecar_bytes
            );
            return Ok(NoteStore::default());
        }

        let data = tokio::fs::read_to_string(sidecar).await?;
        serde_json::from_str(&data).map_err(|source| StoreError::Malformed {
            path: sidecar.to_path_buf(),
            source,
        })
    }

    async fn write_sidecar(&self, sidecar: &Path, store: &NoteStore) -> Result<()> {
        let data = serde_json::to_vec_pretty(store)?;
        let tmp = sidecar.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, sidecar).await?;
        log::debug!(
            "wrote {} annotations to {}",
            store.len(),
            sidecar.display()
        );
        Ok(())
    }

    /// Upserts the annotation at `(relative(file), line)`, or deletes it
    /// when `text` is empty — the sole deletion path. An emptied file
    /// sub-map is pruned. Returns whether persisted state changed.
    pub async fn save(
        &self,
        file: &Path,
        line: u32,
        text: &str,
        author: &str,
        context: &str,
    ) -> Result<bool> {
        let Some(sidecar) = self.sidecar_path(file)? else {
            log::debug!("{} is outside every workspace, nothing saved", file.display());
            return Ok(false);
        };
        let Some(ws) = self.resolver.resolve(file) else {
            return Ok(false);
        };

        let text = sanitize_text(text);
        if text.chars().count() > self.config.max_text_len {
            return Err(StoreError::TextTooLong {
                limit: self.config.max_text_len,
            });
        }

        let _guard = self.locks.acquire(&sidecar).await;
        let mut store = self.load_sidecar(&sidecar).await?;

        let changed = if text.is_empty() {
            let removed = match store.files.get_mut(&ws.relative) {
                Some(notes) => notes.remove(&line).is_some(),
                None => false,
            };
            if store
                .files
                .get(&ws.relative)
                .is_some_and(FileNotes::is_empty)
            {
                store.files.remove(&ws.relative);
            }
            removed
        } else {
            store.files.entry(ws.relative.clone()).or_default().insert(
                line,
                Note {
                    text,
                    author: sanitize_text(author),
                    updated_at: unix_now_ms(),
                    context: context.to_string(),
                },
            );
            true
        };

        if changed {
            self.write_sidecar(&sidecar, &store).await?;
            log::info!("saved annotation at {}:{}", ws.relative, line);
        }
        Ok(changed)
    }

    /// Moves a file's whole sub-map from its old store key to the new one.
    /// No-op when the old key has no entries or when the two paths do not
    /// share a workspace.
    pub async fn rename(&self, old: &Path, new: &Path) -> Result<bool> {
        let Some(sidecar) = self.sidecar_path(old)? else {
            return Ok(false);
        };
        let (Some(old_ws), Some(new_ws)) = (self.resolver.resolve(old), self.resolver.resolve(new))
        else {
            return Ok(false);
        };
        if old_ws.root != new_ws.root {
            log::warn!(
                "rename across workspaces ({} -> {}) is not supported",
                old_ws.relative,
                new_ws.relative
            );
            return Ok(false);
        }

        let _guard = self.locks.acquire(&sidecar).await;
        let mut store = self.load_sidecar(&sidecar).await?;

        let Some(notes) = store.files.remove(&old_ws.relative) else {
            return Ok(false);
        };
        store.files.insert(new_ws.relative.clone(), notes);
        self.write_sidecar(&sidecar, &store).await?;
        log::info!(
            "moved annotations from {} to {}",
            old_ws.relative,
            new_ws.relative
        );
        Ok(true)
    }

    /// Re-anchors every annotation under `file` against `doc` and rewrites
    /// drifted line numbers. Broken anchors keep their stored line; two
    /// annotations resolving to the same line collapse, last key wins.
    /// Persists (and returns `true`) only when at least one line moved.
    pub async fn reconcile(&self, file: &Path, doc: &dyn TextSource) -> Result<bool> {
        let Some(sidecar) = self.sidecar_path(file)? else {
            return Ok(false);
        };
        let Some(ws) = self.resolver.resolve(file) else {
            return Ok(false);
        };

        let _guard = self.locks.acquire(&sidecar).await;
        let mut store = self.load_sidecar(&sidecar).await?;

        let Some(notes) = store.files.get(&ws.relative) else {
            return Ok(false);
        };

        let mut moved = 0usize;
        let mut staged = FileNotes::new();
        for (&line, note) in notes {
            let found = locate(doc, line as usize, &note.context, self.config.search_radius);
            let target = if found.is_match {
                found.line as u32
            } else {
                line
            };
            if found.is_match && target != line {
                moved += 1;
            }
            staged.insert(target, note.clone());
        }

        if moved == 0 {
            return Ok(false);
        }
        store.files.insert(ws.relative.clone(), staged);
        self.write_sidecar(&sidecar, &store).await?;
        log::info!("reconciled {}: {} annotation(s) moved", ws.relative, moved);
        Ok(true)
    }
}

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
