//! Git tree object
//!
//! Trees represent directory snapshots. They hold an ordered list of entries
//! naming files (blobs), subdirectories (trees), symlinks and submodule
//! commits (gitlinks).
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`, with no separator between entries.
//!
//! ## Ordering
//!
//! Entries are sorted by name bytes, where directory names compare as if they
//! ended with `/`. So `foo.c` sorts before a directory `foo`, which sorts before
//! `foo0`.

use crate::artifacts::objects::codec::{read_record, write_record};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{IdTable, Link, ObjectKey, Packable, Resolvable, Resolver, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::cmp::Ordering;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    mode: EntryMode,
    name: Bytes,
    link: Link,
}

impl TreeEntry {
    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn oid(&self) -> &ObjectId {
        self.link.oid()
    }

    fn sort_key(&self) -> impl Iterator<Item = &u8> {
        self.name.iter().chain(self.mode.is_tree().then_some(&b'/'))
    }

    /// Canonical tree order
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(other.sort_key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
    /// Set when an entry was added since the last save
    modified: bool,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Tree {
            entries,
            modified: false,
        }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn find(&self, name: &[u8]) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Add an entry unless one with the same name already exists
    ///
    /// Returns whether the entry was added. An added entry forces the next
    /// save to rewrite this tree.
    pub fn add_entry(&mut self, entry: TreeEntry) -> bool {
        if self.find(entry.name()).is_some() {
            return false;
        }

        self.entries.push(entry);
        self.modified = true;
        true
    }

    pub fn sort_entries(&mut self) {
        self.entries.sort_by(TreeEntry::canonical_cmp);
    }

    /// Slots of the subtrees this tree points at
    pub fn child_trees(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.mode.is_tree())
            .filter_map(|entry| entry.link.target())
    }

    pub fn is_dirty(&self, ids: &IdTable) -> bool {
        self.modified || self.entries.iter().any(|entry| entry.link.is_stale(ids))
    }

    /// Copy the current hash of every resolved child into its entry
    ///
    /// Gitlinks point outside the store and keep their recorded hash.
    pub fn refresh_links(&mut self, owner: &ObjectId, ids: &IdTable) -> anyhow::Result<()> {
        for entry in self.entries.iter_mut().filter(|entry| !entry.mode.is_gitlink()) {
            entry.link.refresh(owner, ids)?;
        }
        Ok(())
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    pub fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{:0>6} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.mode.kind(),
                    entry.oid(),
                    entry.name_lossy()
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for entry in &self.entries {
            let mut header = entry.mode.as_str().into_bytes();
            header.push(b' ');
            header.extend_from_slice(&entry.name);
            write_record(&mut content, &header, b'\0')?;
            entry.oid().write_h40_to(&mut content)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tree {
    fn deserialize(payload: Bytes) -> anyhow::Result<Self> {
        let mut reader = Cursor::new(payload.as_ref());
        let mut entries = Vec::new();

        while let Some(record) = read_record(&mut reader, b'\0').context("unexpected EOF in entry")? {
            let split = record
                .iter()
                .position(|&byte| byte == b' ')
                .ok_or_else(|| RewriteError::malformed("tree", "entry without a mode"))?;

            let mode = std::str::from_utf8(&record[..split])
                .map_err(|_| RewriteError::malformed("tree", "non-ASCII entry mode"))?;
            let mode = EntryMode::from_octal_str(mode)?;
            let name = Bytes::copy_from_slice(&record[split + 1..]);

            let oid = ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            entries.push(TreeEntry::new(mode, name, Link::new(oid)));
        }

        Ok(Tree::new(entries))
    }
}

impl Resolvable for Tree {
    fn resolve(&mut self, owner: &ObjectId, resolver: &Resolver<'_>) -> Vec<RewriteError> {
        let mut missing = Vec::new();

        for entry in self.entries.iter_mut() {
            let expected = match entry.mode {
                EntryMode::Gitlink => continue,
                EntryMode::Directory => ObjectType::Tree,
                _ => ObjectType::Blob,
            };

            if !entry.link.resolve(resolver, Some(expected)) {
                missing.push(RewriteError::MissingObject {
                    owner: owner.clone(),
                    name: format!("{} {}", entry.mode.as_str(), entry.name_lossy()),
                    oid: entry.oid().clone(),
                });
            }
        }

        missing
    }
}
