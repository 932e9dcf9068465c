use crate::error::{Result, StoreError};
use std::path::{Path, PathBuf};

/// A file located inside a known workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePath {
    /// The owning workspace root.
    pub root: PathBuf,
    /// Path relative to the root, forward-slash normalized. This is the
    /// store key for the file.
    pub relative: String,
}

/// Collaborator contract for path resolution: maps an absolute file
/// location to its owning workspace root and store key, or `None` when the
/// file lives outside every known workspace.
pub trait WorkspaceResolver: Send + Sync {
    fn resolve(&self, file: &Path) -> Option<WorkspacePath>;
}

/// Resolver over an explicit list of workspace roots. Paths are compared
/// lexically; when roots nest, the longest matching root wins.
#[derive(Debug, Clone)]
pub struct RootResolver {
    roots: Vec<PathBuf>,
}

impl RootResolver {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn single(root: PathBuf) -> Self {
        Self { roots: vec![root] }
    }
}

impl WorkspaceResolver for RootResolver {
    fn resolve(&self, file: &Path) -> Option<WorkspacePath> {
        let mut best: Option<(&PathBuf, &Path)> = None;
        for root in &self.roots {
            if let Ok(rel) = file.strip_prefix(root) {
                let better = match best {
                    Some((current, _)) => root.as_os_str().len() > current.as_os_str().len(),
                    None => true,
                };
                if better {
                    best = Some((root, rel));
                }
            }
        }
        let (root, rel) = best?;
        if rel.as_os_str().is_empty() {
            return None;
        }
        Some(WorkspacePath {
            root: root.clone(),
            relative: normalize_relative(rel),
        })
    }
}

fn normalize_relative(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Rejects sidecar filenames that could escape the workspace root via
/// configuration. Fails closed: a separator or parent-directory token is a
/// security-relevant user error, not something to normalize away.
pub fn validate_sidecar_filename(name: &str) -> Result<()> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StoreError::InvalidSidecarName(name.to_string()));
    }
    Ok(())
}

/// Walks up from `start` looking for a workspace root: the first ancestor
/// holding either the sidecar itself or a `.git` directory. Used by callers
/// that have no explicit root configured.
#[must_use]
pub fn discover_workspace_root(start: &Path, sidecar_filename: &str) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };
    while let Some(dir) = current {
        if dir.join(sidecar_filename).is_file() || dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_relative_path_with_forward_slashes() {
        let resolver = RootResolver::single(PathBuf::from("/ws"));
        let found = resolver.resolve(Path::new("/ws/src/lib.rs")).unwrap();
        assert_eq!(found.root, PathBuf::from("/ws"));
        assert_eq!(found.relative, "src/lib.rs");
    }

    #[test]
    fn outside_any_root_is_absent() {
        let resolver = RootResolver::single(PathBuf::from("/ws"));
        assert_eq!(resolver.resolve(Path::new("/elsewhere/x.rs")), None);
        assert_eq!(resolver.resolve(Path::new("/ws")), None);
    }

    #[test]
    fn nested_roots_pick_the_longest_match() {
        let resolver = RootResolver::new(vec![
            PathBuf::from("/ws"),
            PathBuf::from("/ws/vendor/dep"),
        ]);
        let found = resolver.resolve(Path::new("/ws/vendor/dep/a.rs")).unwrap();
        assert_eq!(found.root, PathBuf::from("/ws/vendor/dep"));
        assert_eq!(found.relative, "a.rs");
    }

    #[test]
    fn sidecar_filename_guard_fails_closed() {
        assert!(validate_sidecar_filename(".margin.json").is_ok());
        assert!(validate_sidecar_filename("notes/../../etc/passwd").is_err());
        assert!(validate_sidecar_filename("sub/notes.json").is_err());
        assert!(validate_sidecar_filename("sub\\notes.json").is_err());
        assert!(validate_sidecar_filename("..").is_err());
    }

    #[test]
    fn discovers_root_by_sidecar_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("project");
        let nested = root.join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(".margin.json"), "{}").unwrap();

        let file = nested.join("main.rs");
        std::fs::write(&file, "fn main() {}").unwrap();
        assert_eq!(
            discover_workspace_root(&file, ".margin.json"),
            Some(root.clone())
        );
        assert_eq!(discover_workspace_root(&nested, ".margin.json"), Some(root));
    }
}
