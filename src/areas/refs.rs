//! Git references (branches and tags)
//!
//! References come from two places:
//! - `packed-refs`: a text table with a comment header and one
//!   `<hash> <refname>` line per ref. Lines starting with `^` record the
//!   peeled commit of the annotated tag on the line above.
//! - loose files under `refs/`, each holding a single hash. Symbolic refs
//!   (`ref: ...`) are left alone.
//!
//! After a save, every ref is re-pointed at its target's new hash and written
//! back where it came from. A ref that exists both loose and packed is
//! rewritten in both places.

use crate::areas::store::Store;
use crate::artifacts::branch::{Branch, PACKED_REFS_HEADER, RefSource};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RewriteError;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex pattern for one packed ref line
const PACKED_REF_REGEX: &str = r"^([0-9a-fA-F]{40}) (\S.*)$";

const PACKED_REFS_FILE: &str = "packed-refs";

/// Ordered set of refs, in load order
#[derive(Debug, Clone, Default)]
pub struct RefSet {
    /// First line of the packed table, if it was a comment
    header: Option<String>,
    /// Whether a packed table existed on disk
    packed: bool,
    branches: Vec<Branch>,
}

impl RefSet {
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branches_mut(&mut self) -> &mut [Branch] {
        &mut self.branches
    }

    pub fn push(&mut self, branch: Branch) {
        self.branches.push(branch);
    }

    pub fn header(&self) -> &str {
        self.header.as_deref().unwrap_or(PACKED_REFS_HEADER)
    }

    pub fn resolve(&mut self, store: &Store) {
        for branch in self.branches.iter_mut() {
            branch.resolve(store);
        }
    }

    /// Packed ref table text, including peeled lines for annotated tags
    pub fn packed_table(&self, store: &Store) -> String {
        let mut table = format!("{}\n", self.header());

        for branch in self.branches.iter().filter(|b| b.source() == &RefSource::Packed) {
            table.push_str(&format!("{} {}\n", branch.hash(), branch.name()));

            if branch.tag().is_some()
                && let Some(commit) = branch.peeled_commit(store)
            {
                table.push_str(&format!("^{}\n", store.id(commit)));
            }
        }

        table
    }
}

/// Reference storage of a git directory
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory
    path: Box<Path>,
}

impl Refs {
    pub fn packed_refs_path(&self) -> PathBuf {
        self.path.join(PACKED_REFS_FILE)
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    /// Read the packed table, then loose refs
    pub fn load(&self) -> anyhow::Result<RefSet> {
        let mut ref_set = RefSet::default();

        let packed_path = self.packed_refs_path();
        if packed_path.exists() {
            let content = std::fs::read_to_string(&packed_path)
                .context(format!("Unable to read {}", packed_path.display()))?;
            Self::parse_packed(&content, &mut ref_set)?;
        }

        for (name, hash) in self.list_loose_refs()? {
            ref_set.branches.push(Branch::new(name, hash, RefSource::Loose));
        }

        tracing::info!(count = ref_set.branches.len(), "loaded refs");
        Ok(ref_set)
    }

    fn parse_packed(content: &str, ref_set: &mut RefSet) -> anyhow::Result<()> {
        let line_regex = regex::Regex::new(PACKED_REF_REGEX)?;
        ref_set.packed = true;

        for (number, line) in content.lines().enumerate() {
            if line.starts_with('#') {
                if number == 0 {
                    ref_set.header = Some(line.to_string());
                }
                continue;
            }
            if line.starts_with('^') || line.trim().is_empty() {
                continue;
            }

            let captures = line_regex
                .captures(line)
                .ok_or_else(|| RewriteError::malformed(PACKED_REFS_FILE, format!("line {}: {line:?}", number + 1)))?;
            let hash = ObjectId::try_parse(captures[1].to_string())?;

            ref_set
                .branches
                .push(Branch::new(captures[2].to_string(), hash, RefSource::Packed));
        }

        Ok(())
    }

    fn list_loose_refs(&self) -> anyhow::Result<Vec<(String, ObjectId)>> {
        let refs_path = self.refs_path();
        if !refs_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&refs_path).sort_by_file_name() {
            let entry = entry.context(format!("Unable to list refs in {}", refs_path.display()))?;
            if !entry.file_type().is_file() || entry.path().extension().is_some_and(|ext| ext == "lock") {
                continue;
            }

            let content = std::fs::read_to_string(entry.path())
                .context(format!("Unable to read ref {}", entry.path().display()))?;
            let content = content.trim();
            if content.starts_with("ref:") {
                continue;
            }

            let name = entry
                .path()
                .strip_prefix(&*self.path)?
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            match ObjectId::try_parse(content.to_string()) {
                Ok(hash) => refs.push((name, hash)),
                Err(e) => tracing::warn!(%name, "skipping unreadable ref: {e}"),
            }
        }

        Ok(refs)
    }

    /// Write every ref back to where it was loaded from
    pub fn write(&self, ref_set: &RefSet, store: &Store) -> anyhow::Result<()> {
        let has_packed = ref_set
            .branches
            .iter()
            .any(|branch| branch.source() == &RefSource::Packed);
        if ref_set.packed || has_packed {
            self.write_packed(&ref_set.packed_table(store))?;
        }

        for branch in ref_set.branches.iter().filter(|b| b.source() == &RefSource::Loose) {
            self.write_loose(branch.name(), branch.hash())?;
        }

        Ok(())
    }

    fn write_packed(&self, table: &str) -> anyhow::Result<()> {
        let packed_path = self.packed_refs_path();
        let lock_path = self.path.join(format!("{PACKED_REFS_FILE}.lock"));

        // the lock file doubles as the temp file of an atomic replace
        let mut lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .with_context(|| format!("Unable to lock {}", packed_path.display()))?;

        let replaced = Self::fill_lock(&mut lock_file, table)
            .context(format!("Unable to write {}", lock_path.display()))
            .and_then(|()| {
                drop(lock_file);
                std::fs::rename(&lock_path, &packed_path)
                    .context(format!("Unable to replace {}", packed_path.display()))
            });
        // a stale lock would refuse every later run
        if replaced.is_err() {
            let _ = std::fs::remove_file(&lock_path);
        }

        replaced
    }

    fn fill_lock(lock_file: &mut std::fs::File, table: &str) -> anyhow::Result<()> {
        let mut lock = file_guard::lock(lock_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(table.as_bytes())?;
        Ok(())
    }

    fn write_loose(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()> {
        let ref_path = self.path.join(name);
        let lock_path = ref_path.with_file_name(format!(
            "{}.lock",
            ref_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ));

        std::fs::write(&lock_path, format!("{hash}\n"))
            .context(format!("Unable to write {}", lock_path.display()))?;
        if let Err(e) = std::fs::rename(&lock_path, &ref_path) {
            let _ = std::fs::remove_file(&lock_path);
            return Err(e).context(format!("Unable to update ref {}", ref_path.display()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "# pack-refs with: peeled fully-peeled sorted \n\
        ce013625030ba8dba906f756967f9e9ca394464a refs/heads/main\n\
        4b825dc642cb6eb9a060e54bf8d69288fbee4904 refs/tags/v1.0\n\
        ^e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n";

    #[test]
    fn parses_packed_refs_and_skips_peeled_lines() {
        let mut ref_set = RefSet::default();

        Refs::parse_packed(TABLE, &mut ref_set).unwrap();

        let names = ref_set.branches().iter().map(Branch::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["refs/heads/main", "refs/tags/v1.0"]);
        assert_eq!(ref_set.header(), "# pack-refs with: peeled fully-peeled sorted ");
        assert_eq!(
            ref_set.branches()[0].hash().as_ref(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }

    #[test]
    fn missing_header_falls_back_to_default() {
        let mut ref_set = RefSet::default();

        Refs::parse_packed("ce013625030ba8dba906f756967f9e9ca394464a refs/heads/main\n", &mut ref_set)
            .unwrap();

        assert_eq!(ref_set.header(), PACKED_REFS_HEADER);
    }

    #[test]
    fn malformed_lines_fail_fast() {
        let mut ref_set = RefSet::default();

        let error = Refs::parse_packed("not-a-hash refs/heads/main\n", &mut ref_set).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RewriteError>(),
            Some(RewriteError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn failed_packed_write_releases_the_lock() {
        let dir = assert_fs::TempDir::new().unwrap();
        let refs = Refs::new(dir.path().to_path_buf().into_boxed_path());
        // a non-empty directory in place of the table makes the final rename fail
        std::fs::create_dir_all(refs.packed_refs_path().join("blocker")).unwrap();

        assert!(refs.write_packed(TABLE).is_err());

        assert!(!dir.path().join("packed-refs.lock").exists());
        let error = refs.write_packed(TABLE).unwrap_err();
        assert!(!format!("{error:#}").contains("Unable to lock"));
    }
}
