//! Git blob object
//!
//! Blobs store file content. The store only keeps their size: payloads are
//! re-read from disk on demand so a full repository fits in memory.
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use derive_new::new;

/// Leaf of the object graph
///
/// A blob's identity changes only when its content is replaced; saves never
/// recompute it.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    size: u64,
}

impl Blob {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }
}
