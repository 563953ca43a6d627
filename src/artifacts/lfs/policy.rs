use crate::areas::store::Store;
use crate::artifacts::lfs::pointer::LfsPointer;
use crate::artifacts::objects::object::{GitObject, ObjectKey};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Extensions converted when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".exe", ".lib", ".a", ".mp3", ".zip", ".dll", ".pdb", ".png", ".bmp", ".jpg", ".pdf", ".ico",
    ".suo", ".max", ".com", ".gif", ".chm", ".pch", ".idb", ".db", ".bin", ".dat", ".dds", ".ttf",
    ".ppm", ".dylib", ".so", ".msi", ".bundle", ".wav", ".obj",
];

pub const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Decides which blobs move to LFS storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsPolicy {
    /// Lowercase, dot-prefixed
    extensions: BTreeSet<String>,
}

impl Default for LfsPolicy {
    fn default() -> Self {
        LfsPolicy::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl LfsPolicy {
    /// Accepts `png`, `.png` or `*.png`
    pub fn new<S: AsRef<str>>(extensions: impl IntoIterator<Item = S>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('*').trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();

        LfsPolicy { extensions }
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn matches(&self, file_name: &[u8]) -> bool {
        let file_name = String::from_utf8_lossy(file_name);
        Path::new(file_name.as_ref())
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Blob slots named by a matching file entry in any tree, each listed once
    pub fn select(&self, store: &Store) -> Vec<ObjectKey> {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();

        for key in store.keys() {
            let GitObject::Tree(tree) = store.object(key) else {
                continue;
            };

            for entry in tree.entries() {
                if !entry.mode().is_file() || !self.matches(entry.name()) {
                    continue;
                }
                // entries whose blob is missing cannot be converted
                let Some(target) = entry.link().target() else {
                    continue;
                };
                if seen.insert(target) {
                    selected.push(target);
                }
            }
        }

        selected
    }

    /// Pointer replacing `content`, unless it already is one
    pub fn convert(&self, content: &[u8]) -> Option<LfsPointer> {
        if LfsPointer::is_pointer(content) {
            return None;
        }

        Some(LfsPointer::for_content(content))
    }

    /// `.gitattributes` routing every configured extension through LFS
    pub fn attributes(&self) -> Vec<u8> {
        self.extensions
            .iter()
            .map(|ext| format!("*{ext} filter=lfs diff=lfs merge=lfs -text\n"))
            .collect::<String>()
            .into_bytes()
    }
}
