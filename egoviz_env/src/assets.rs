//! Asset reading abstraction (filesystem or in-memory).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EnvError;

/// Read-only access to terrain and trajectory assets.
///
/// # Implementations
///
/// - **Production**: [`FsAssets`] - reads from disk, optionally below a root directory
/// - **Tests**: [`MemoryAssets`] - serves byte blobs registered up front
pub trait AssetSource {
    /// Reads a whole asset as raw bytes.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, EnvError>;

    /// Reads a whole asset as UTF-8 text.
    fn read_text(&self, path: &Path) -> Result<String, EnvError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| EnvError::NotText(path.to_path_buf()))
    }
}

/// Filesystem-backed asset source.
#[derive(Debug, Clone, Default)]
pub struct FsAssets {
    /// Directory relative paths are resolved against
    root: Option<PathBuf>,
}

impl FsAssets {
    /// Creates a source that resolves paths against the working directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Creates a source that resolves relative paths against `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Resolves a path the way `read_bytes` will.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl AssetSource for FsAssets {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, EnvError> {
        let resolved = self.resolve(path);
        std::fs::read(&resolved).map_err(|e| EnvError::from_io(resolved, e))
    }
}

/// In-memory asset source.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset, replacing any previous content at `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for MemoryAssets {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, EnvError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| EnvError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_assets_roundtrip() {
        let assets = MemoryAssets::new().with("traj.csv", "t,x,y\n0,1,2\n");

        let text = assets.read_text(Path::new("traj.csv")).unwrap();
        assert!(text.starts_with("t,x,y"));
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn test_memory_assets_missing() {
        let assets = MemoryAssets::new();
        let err = assets.read_bytes(Path::new("nope.bin")).unwrap_err();
        assert!(matches!(err, EnvError::NotFound(_)));
    }

    #[test]
    fn test_memory_assets_rejects_binary_as_text() {
        let assets = MemoryAssets::new().with("blob.bin", vec![0xff, 0xfe, 0x00]);
        let err = assets.read_text(Path::new("blob.bin")).unwrap_err();
        assert!(matches!(err, EnvError::NotText(_)));
    }

    #[test]
    fn test_fs_assets_not_found() {
        let assets = FsAssets::rooted("/definitely/not/a/real/dir");
        let err = assets.read_bytes(Path::new("terrain.bin")).unwrap_err();
        assert!(matches!(err, EnvError::NotFound(_)));
    }

    #[test]
    fn test_fs_assets_resolve() {
        let assets = FsAssets::rooted("assets");
        assert_eq!(assets.resolve(Path::new("a.csv")), PathBuf::from("assets/a.csv"));
        assert_eq!(assets.resolve(Path::new("/abs/a.csv")), PathBuf::from("/abs/a.csv"));
    }

    #[test]
    fn test_fs_assets_reads_file() {
        let dir = std::env::temp_dir().join("egoviz_env_fs_assets_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hello.txt"), "hello").unwrap();

        let assets = FsAssets::rooted(&dir);
        assert_eq!(assets.read_text(Path::new("hello.txt")).unwrap(), "hello");
    }
}
