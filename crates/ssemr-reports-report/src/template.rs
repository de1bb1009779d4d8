//! Template resources

use crate::error::ResourceError;
use std::path::{Component, Path, PathBuf};

/// Directory of report templates (`art_initiations.xls`, ...)
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a named template. Names are plain file names; anything that
    /// would escape the root is rejected.
    pub fn path(&self, name: &str) -> Result<PathBuf, ResourceError> {
        let relative = Path::new(name);
        let plain = !name.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(ResourceError::InvalidName { name: name.to_string() });
        }
        Ok(self.root.join(relative))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_ok_and(|p| p.is_file())
    }

    /// Read a template's bytes
    pub fn load(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(ResourceError::NotFound { path });
        }
        std::fs::read(&path).map_err(|source| ResourceError::Read { path, source })
    }
}
