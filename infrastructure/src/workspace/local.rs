//! Local file-system workspace confined to one root directory.

use async_trait::async_trait;
use ratchet_application::{WorkspaceError, WorkspacePort};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// [`WorkspacePort`] over a directory on disk.
///
/// Paths are interpreted relative to the root. Absolute paths are accepted
/// only when they lie under the root; `..` may not climb out of it.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    /// Workspace rooted at `root`; relative roots are made absolute against
    /// the current directory.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self {
            root: normalize(&root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a workspace path to an absolute path under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let resolved = normalize(&joined);
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(WorkspaceError::OutsideWorkspace(path.to_string()))
        }
    }

    /// Workspace-relative display form of an absolute path.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

/// Lexical normalisation: drops `.` and folds `..` without touching the disk,
/// so paths to files that do not exist yet can still be checked.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn not_writable(path: &str, reason: impl Into<String>) -> WorkspaceError {
    WorkspaceError::NotWritable {
        path: path.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl WorkspacePort for LocalWorkspace {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorkspaceError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkspaceError::io(path, e)),
        }
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkspaceError::io(path, e))?;
        }
        match tokio::fs::write(&full, contents).await {
            Ok(()) => {
                debug!(path, bytes = contents.len(), "Wrote file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(not_writable(path, e.to_string()))
            }
            Err(e) => Err(WorkspaceError::io(path, e)),
        }
    }

    async fn remove(&self, path: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                debug!(path, "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(not_writable(path, e.to_string()))
            }
            Err(e) => Err(WorkspaceError::io(path, e)),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(full) => tokio::fs::try_exists(&full).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn check_writable(&self, path: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;

        // Existing file: its own permissions decide. New file: the nearest
        // existing ancestor must be a writable directory.
        let mut probe = full.as_path();
        loop {
            match tokio::fs::metadata(probe).await {
                Ok(meta) => {
                    if probe == full && meta.is_dir() {
                        return Err(not_writable(path, "is a directory"));
                    }
                    if probe != full && !meta.is_dir() {
                        return Err(not_writable(
                            path,
                            format!("{} is not a directory", self.relative(probe)),
                        ));
                    }
                    if meta.permissions().readonly() {
                        return Err(not_writable(path, "read-only"));
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => match probe.parent() {
                    Some(parent) => probe = parent,
                    None => return Err(not_writable(path, "no existing ancestor")),
                },
                Err(e) => return Err(WorkspaceError::io(path, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, LocalWorkspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_resolve_confines_paths() {
        let (dir, ws) = workspace();
        assert_eq!(
            ws.resolve("src/./lib.rs").unwrap(),
            normalize(&dir.path().join("src/lib.rs"))
        );
        assert!(ws.resolve("src/../lib.rs").is_ok());
        assert!(matches!(
            ws.resolve("../outside.rs"),
            Err(WorkspaceError::OutsideWorkspace(_))
        ));
        assert!(ws.resolve("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let (_dir, ws) = workspace();
        assert_eq!(ws.read("a/b.txt").await.unwrap(), None);
        assert!(!ws.exists("a/b.txt").await);

        ws.write("a/b.txt", b"hello").await.unwrap();
        assert!(ws.exists("a/b.txt").await);
        assert_eq!(ws.read_text("a/b.txt").await.unwrap().as_deref(), Some("hello"));

        ws.remove("a/b.txt").await.unwrap();
        assert!(!ws.exists("a/b.txt").await);
        // removing twice is fine
        ws.remove("a/b.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_check_writable() {
        let (dir, ws) = workspace();
        ws.check_writable("new/deep/file.rs").await.unwrap();

        std::fs::create_dir(dir.path().join("folder")).unwrap();
        assert!(matches!(
            ws.check_writable("folder").await,
            Err(WorkspaceError::NotWritable { .. })
        ));

        std::fs::write(dir.path().join("plain"), "").unwrap();
        assert!(ws.check_writable("plain/child.rs").await.is_err());

        let locked = dir.path().join("locked.rs");
        std::fs::write(&locked, "fn a() {}").unwrap();
        let mut perms = std::fs::metadata(&locked).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&locked, perms).unwrap();
        assert!(ws.check_writable("locked.rs").await.is_err());
    }
}
