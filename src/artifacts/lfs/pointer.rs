//! LFS pointer files
//!
//! A pointer replaces a large file's content in history:
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:<64 hex digits>
//! size <bytes>
//! ```

use derive_new::new;
use sha2::{Digest, Sha256};

pub const POINTER_VERSION: &str = "version https://git-lfs.github.com/spec/v1";

/// Pointer files are always shorter than this
pub const MAX_POINTER_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct LfsPointer {
    /// Hex SHA-256 of the content
    oid: String,
    size: u64,
}

impl LfsPointer {
    pub fn for_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        LfsPointer::new(format!("{digest:x}"), content.len() as u64)
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether `content` already is a pointer file
    pub fn is_pointer(content: &[u8]) -> bool {
        content.len() < MAX_POINTER_SIZE && content.starts_with(b"version https://git-lfs")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{POINTER_VERSION}\noid sha256:{}\nsize {}\n", self.oid, self.size).into_bytes()
    }
}
