//! Save pass
//!
//! Walks the history reachable from the ref set and rewrites every object
//! whose recorded links no longer match their targets' current hashes.
//!
//! - Commits are visited parents first (see [`save_order`]).
//! - Each commit saves its tree before itself; trees save their subtrees
//!   before themselves, so a parent always sees its children's final hashes.
//! - Refs are saved last: annotated tags are rewritten against their
//!   finalized target, then every ref takes its target's current hash.
//!
//! Every object is visited at most once per pass. Objects nobody changed
//! keep their hash and nothing is written for them.

use crate::areas::refs::RefSet;
use crate::areas::store::Store;
use crate::artifacts::branch::Branch;
use crate::artifacts::objects::object::{GitObject, IdTable, ObjectKey, Packable};
use crate::artifacts::rewrite::save_order::{collect_commits, save_order};
use crate::errors::RewriteError;
use std::collections::HashSet;

/// Deepest chain of nested trees and tags followed before giving up
pub const MAX_SAVE_DEPTH: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Reachable commits visited
    pub commits: usize,
    /// Objects whose hash changed
    pub objects_written: usize,
    /// Refs re-pointed at a new hash
    pub refs_updated: usize,
}

/// State of one save pass over a store
pub struct SavePass<'s> {
    store: &'s mut Store,
    /// Indexed by arena slot
    saved: Vec<bool>,
    in_progress: HashSet<ObjectKey>,
    report: SaveReport,
}

impl<'s> SavePass<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        let saved = vec![false; store.len()];

        SavePass {
            store,
            saved,
            in_progress: HashSet::new(),
            report: SaveReport::default(),
        }
    }

    pub fn report(&self) -> SaveReport {
        self.report
    }

    /// Save everything reachable from `ref_set`, then re-point its refs
    pub fn run(mut self, ref_set: &mut RefSet) -> anyhow::Result<SaveReport> {
        let commits = collect_commits(self.store, ref_set);
        let order = save_order(self.store, &commits)?;
        tracing::info!(commits = order.len(), "saving history");

        for &key in &order {
            self.save_object(key, 0)?;
        }
        self.report.commits = order.len();

        for branch in ref_set.branches_mut() {
            if self.save_branch(branch)? {
                self.report.refs_updated += 1;
            }
        }

        tracing::info!(
            commits = self.report.commits,
            objects_written = self.report.objects_written,
            refs_updated = self.report.refs_updated,
            "save pass complete"
        );
        Ok(self.report)
    }

    /// Save one object after everything it depends on
    ///
    /// Returns whether the object was rewritten. A second call within the
    /// same pass does nothing and returns `false`. Commit parents are not
    /// followed: callers save commits in [`save_order`].
    pub fn save_object(&mut self, key: ObjectKey, depth: usize) -> anyhow::Result<bool> {
        if depth > MAX_SAVE_DEPTH {
            return Err(RewriteError::CorruptGraph(format!(
                "{} is nested more than {MAX_SAVE_DEPTH} levels deep",
                self.store.id(key)
            ))
            .into());
        }
        if self.in_progress.contains(&key) {
            return Err(RewriteError::CorruptGraph(format!("{} references itself", self.store.id(key))).into());
        }
        if self.saved[key.0] {
            return Ok(false);
        }
        self.saved[key.0] = true;

        self.in_progress.insert(key);
        let result = self.save_dependencies(key, depth).and_then(|()| self.rewrite(key));
        self.in_progress.remove(&key);

        result
    }

    fn save_dependencies(&mut self, key: ObjectKey, depth: usize) -> anyhow::Result<()> {
        let dependencies = match self.store.object(key) {
            GitObject::Blob(_) => Vec::new(),
            GitObject::Tree(tree) => tree.child_trees().collect(),
            GitObject::Commit(commit) => commit.tree().target().into_iter().collect(),
            GitObject::Tag(tag) => tag.target().target().into_iter().collect(),
        };

        for dependency in dependencies {
            self.save_object(dependency, depth + 1)?;
        }

        Ok(())
    }

    /// Re-serialize and write `key` if any of its links went stale
    fn rewrite(&mut self, key: ObjectKey) -> anyhow::Result<bool> {
        let (objects, ids, _, database) = self.store.parts_mut();
        let ids: &IdTable = ids;
        let owner = ids.get(key).clone();

        let object = &mut objects[key.0];
        let object_type = object.object_type();
        let payload = match object {
            // a blob's identity is fixed when its content is replaced
            GitObject::Blob(_) => return Ok(false),
            GitObject::Tree(tree) => {
                tree.sort_entries();
                if !tree.is_dirty(ids) {
                    return Ok(false);
                }
                tree.refresh_links(&owner, ids)?;
                tree.clear_modified();
                tree.serialize()?
            }
            GitObject::Commit(commit) => {
                if !commit.is_dirty(ids) {
                    return Ok(false);
                }
                commit.refresh_links(&owner, ids)?;
                commit.serialize()?
            }
            GitObject::Tag(tag) => {
                if !tag.is_dirty(ids) {
                    return Ok(false);
                }
                tag.refresh_links(&owner, ids)?;
                tag.serialize()?
            }
        };

        let object_id = database.write_object(object_type, &payload)?;
        if object_id != owner {
            tracing::debug!(old = %owner, new = %object_id, kind = %object_type, "object rewritten");
            self.report.objects_written += 1;
        }
        self.store.assign_id(key, object_id);

        Ok(true)
    }

    /// Save an annotated tag's chain, then take the target's current hash
    ///
    /// Returns whether the ref moved. Branches are not objects: they are never
    /// dirty, only re-pointed.
    pub fn save_branch(&mut self, branch: &mut Branch) -> anyhow::Result<bool> {
        if let Some(tag) = branch.tag() {
            self.save_object(tag, 0)?;
        }

        let old = branch.hash().clone();
        let moved = branch.refresh(self.store.ids());
        if moved {
            tracing::debug!(name = branch.name(), %old, new = %branch.hash(), "ref updated");
        }

        Ok(moved)
    }
}

/// Run one save pass over `store`, re-pointing the refs of `ref_set`
pub fn save(store: &mut Store, ref_set: &mut RefSet) -> anyhow::Result<SaveReport> {
    SavePass::new(store).run(ref_set)
}
