//! Resource lookup: where configuration files come from.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

/// A configuration file that was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Human-readable location, used as the source name.
    pub location: String,
    pub content: String,
}

/// Resolves relative resource paths (`app/app-stage.yaml`) to their content.
pub trait ResourceLookup: Send + Sync {
    /// `Ok(None)` when the resource does not exist.
    fn read(&self, relative: &str) -> io::Result<Option<Resource>>;
}

/// Looks resources up under a root directory.
#[derive(Debug, Clone)]
pub struct FsLookup {
    root: PathBuf,
}

impl FsLookup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl ResourceLookup for FsLookup {
    fn read(&self, relative: &str) -> io::Result<Option<Resource>> {
        let path = self.root.join(relative);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(Resource {
            location: path.display().to_string(),
            content,
        }))
    }
}

/// In-memory lookup, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    resources: BTreeMap<String, String>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, relative: impl Into<String>, content: impl Into<String>) -> Self {
        self.resources.insert(relative.into(), content.into());
        self
    }
}

impl ResourceLookup for MemoryLookup {
    fn read(&self, relative: &str) -> io::Result<Option<Resource>> {
        Ok(self.resources.get(relative).map(|content| Resource {
            location: format!("memory:{relative}"),
            content: content.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fs_lookup_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("shop")).unwrap();
        fs::write(dir.path().join("shop/shop.yaml"), "a: 1\n").unwrap();

        let lookup = FsLookup::new(dir.path());
        let resource = lookup.read("shop/shop.yaml").unwrap().unwrap();
        assert_eq!(resource.content, "a: 1\n");
        assert!(resource.location.ends_with("shop.yaml"));
    }

    #[test]
    fn test_fs_lookup_missing_file() {
        let dir = TempDir::new().unwrap();
        let lookup = FsLookup::new(dir.path());
        assert!(lookup.read("shop/shop.yaml").unwrap().is_none());
        // a directory is not a resource
        fs::create_dir_all(dir.path().join("shop/shop.toml")).unwrap();
        assert!(lookup.read("shop/shop.toml").unwrap().is_none());
    }

    #[test]
    fn test_memory_lookup() {
        let lookup = MemoryLookup::new().with("a/a.properties", "k=v");
        assert_eq!(
            lookup.read("a/a.properties").unwrap().unwrap().location,
            "memory:a/a.properties"
        );
        assert!(lookup.read("a/a.yaml").unwrap().is_none());
    }
}
