use std::path::{Path, PathBuf};

/// Resolves file names against an ordered list of search directories.
///
/// Absolute paths and paths that exist relative to the working directory are
/// returned as-is; otherwise each search directory is tried in order.
#[derive(Debug, Clone, Default)]
pub struct FileLocator {
    search_paths: Vec<PathBuf>,
}

impl FileLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn add_search_path(&mut self, dir: impl Into<PathBuf>) {
        self.search_paths.push(dir.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let direct = Path::new(name);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        if direct.is_absolute() {
            return None;
        }
        let found = self
            .search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file());
        if found.is_none() {
            tracing::debug!(name, searched = self.search_paths.len(), "file not found");
        }
        found
    }
}
