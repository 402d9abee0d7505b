// src/ingest/fallback.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Last good payload of one pipeline, kept on disk. Full overwrite on
/// store, full read on load. Not locked.
#[derive(Debug, Clone)]
pub struct FallbackCache {
    path: PathBuf,
}

impl FallbackCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self, payload: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, payload)
    }

    /// `Ok(None)` when no payload has ever been cached.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FallbackCache::new(dir.path().join("nope.txt"));
        assert_eq!(cache.load().unwrap(), None);
    }

    #[test]
    fn store_overwrites_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FallbackCache::new(dir.path().join("nested/feed.txt"));
        cache.store("first payload").unwrap();
        cache.store("second").unwrap();
        assert_eq!(cache.load().unwrap().as_deref(), Some("second"));
    }
}
