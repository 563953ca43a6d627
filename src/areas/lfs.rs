//! Large file object storage (`<git-dir>/lfs/objects`)
//!
//! Content is stored uncompressed at `<h[0:2]>/<h[2:4]>/<h>`, keyed by its
//! SHA-256, which is what `git lfs` reads back on checkout.

use crate::artifacts::lfs::pointer::LfsPointer;
use anyhow::Context;
use fake::rand;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LfsStorage {
    path: Box<Path>,
}

impl LfsStorage {
    pub fn new(path: Box<Path>) -> Self {
        LfsStorage { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn object_path(&self, oid: &str) -> PathBuf {
        self.path.join(&oid[..2]).join(&oid[2..4]).join(oid)
    }

    /// Store `content` under the pointer's oid; already stored content is left as is
    pub fn store(&self, pointer: &LfsPointer, content: &[u8]) -> anyhow::Result<()> {
        let object_path = self.object_path(pointer.oid());
        if object_path.exists() {
            tracing::trace!(oid = pointer.oid(), "lfs object already stored");
            return Ok(());
        }

        let object_dir = object_path
            .parent()
            .context(format!("Invalid lfs object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir)
            .context(format!("Unable to create lfs directory {}", object_dir.display()))?;

        let temp_path = object_dir.join(format!("tmp-lfs-{}", rand::random::<u32>()));
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .context(format!("Unable to open lfs object file {}", temp_path.display()))?;
        file.write_all(content)
            .context(format!("Unable to write lfs object file {}", temp_path.display()))?;
        drop(file);

        std::fs::rename(&temp_path, &object_path)
            .context(format!("Unable to rename lfs object file to {}", object_path.display()))?;

        tracing::debug!(oid = pointer.oid(), size = pointer.size(), "lfs object stored");
        Ok(())
    }
}
