use crate::areas::database::Database;
use crate::areas::lfs::LfsStorage;
use crate::areas::repository::Repository;
use crate::artifacts::lfs::policy::{ATTRIBUTES_FILE, LfsPolicy};
use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{GitObject, Link, ObjectKey};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::TreeEntry;
use crate::artifacts::rewrite::SaveReport;
use crate::artifacts::rewrite::save_order::collect_commits;
use anyhow::Context;
use bytes::Bytes;
use colored::Colorize;
use derive_new::new;
use std::collections::HashSet;
use tokio::task::JoinSet;

/// What the `lfs` command converts, and how
#[derive(Debug, Clone, Default, new)]
pub struct RewriteOptions {
    /// Extensions to convert; empty means the default list
    pub extensions: Vec<String>,
    /// Add a `.gitattributes` entry to every reachable root tree
    pub attributes: bool,
    /// Load and report only
    pub dry_run: bool,
}

impl RewriteOptions {
    pub fn policy(&self) -> LfsPolicy {
        if self.extensions.is_empty() {
            LfsPolicy::default()
        } else {
            LfsPolicy::new(&self.extensions)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LfsSummary {
    pub objects_loaded: usize,
    pub candidates: usize,
    pub converted: usize,
    /// Root trees that received a `.gitattributes` entry
    pub attributes_added: usize,
    pub save: SaveReport,
}

/// Outcome of converting one blob on a worker
struct Conversion {
    key: ObjectKey,
    pointer_id: ObjectId,
    pointer_size: u64,
}

impl Repository {
    pub async fn lfs(&mut self, options: &RewriteOptions) -> anyhow::Result<LfsSummary> {
        self.load().await?;

        let policy = options.policy();
        let candidates = policy.select(self.store());
        let mut summary = LfsSummary {
            objects_loaded: self.store().len(),
            candidates: candidates.len(),
            ..LfsSummary::default()
        };
        tracing::info!(candidates = candidates.len(), "selected blobs for conversion");

        if options.dry_run {
            self.print_summary(&summary, true)?;
            return Ok(summary);
        }

        let conversions = self.convert_blobs(&policy, candidates).await?;
        summary.converted = conversions.len();
        for conversion in conversions {
            self.store_mut()
                .reassign_blob(conversion.key, conversion.pointer_id, conversion.pointer_size)?;
        }

        if options.attributes {
            summary.attributes_added = self.add_attributes(&policy)?;
        }

        summary.save = self.save()?;
        self.print_summary(&summary, false)?;

        Ok(summary)
    }

    /// Convert every candidate concurrently; each blob is owned by one task
    async fn convert_blobs(&self, policy: &LfsPolicy, candidates: Vec<ObjectKey>) -> anyhow::Result<Vec<Conversion>> {
        let mut tasks = JoinSet::new();

        for key in candidates {
            let object_id = self.store().id(key).clone();
            let database = self.database().clone();
            let lfs = self.lfs_storage().clone();
            let policy = policy.clone();

            tasks.spawn_blocking(move || Self::convert_blob(&database, &lfs, &policy, key, object_id));
        }

        let mut conversions = Vec::new();
        while let Some(result) = tasks.join_next().await {
            if let Some(conversion) = result.context("Conversion task failed")?? {
                conversions.push(conversion);
            }
        }
        conversions.sort_by_key(|conversion| conversion.key);

        Ok(conversions)
    }

    fn convert_blob(
        database: &Database,
        lfs: &LfsStorage,
        policy: &LfsPolicy,
        key: ObjectKey,
        object_id: ObjectId,
    ) -> anyhow::Result<Option<Conversion>> {
        let content = database.load_blob_bytes(&object_id)?;
        let Some(pointer) = policy.convert(&content) else {
            tracing::debug!(%object_id, "already an lfs pointer");
            return Ok(None);
        };

        lfs.store(&pointer, &content)?;
        let pointer_bytes = pointer.to_bytes();
        let pointer_id = database.write_object(ObjectType::Blob, &pointer_bytes)?;
        tracing::debug!(%object_id, %pointer_id, size = pointer.size(), "blob converted");

        Ok(Some(Conversion {
            key,
            pointer_id,
            pointer_size: pointer_bytes.len() as u64,
        }))
    }

    /// Add the attributes file to the root tree of every reachable commit
    fn add_attributes(&mut self, policy: &LfsPolicy) -> anyhow::Result<usize> {
        let root_trees = collect_commits(self.store(), self.ref_set())
            .into_iter()
            .filter_map(|key| self.store().object(key).as_commit())
            .filter_map(|commit| commit.tree().target())
            .collect::<HashSet<_>>();
        if root_trees.is_empty() {
            return Ok(0);
        }

        let store = self.store_mut();
        let attributes = store.insert_blob(&policy.attributes())?;
        let attributes_id = store.id(attributes).clone();

        let mut added = 0;
        for tree_key in root_trees {
            let GitObject::Tree(tree) = store.object_mut(tree_key) else {
                continue;
            };
            let entry = TreeEntry::new(
                EntryMode::File(FileMode::Regular),
                Bytes::from_static(ATTRIBUTES_FILE.as_bytes()),
                Link::resolved(attributes_id.clone(), attributes),
            );
            if tree.add_entry(entry) {
                added += 1;
            }
        }
        tracing::info!(trees = added, "added {ATTRIBUTES_FILE}");

        Ok(added)
    }

    fn print_summary(&self, summary: &LfsSummary, dry_run: bool) -> anyhow::Result<()> {
        let mut writer = self.writer();

        writeln!(writer, "objects loaded:   {}", summary.objects_loaded)?;
        writeln!(writer, "lfs candidates:   {}", summary.candidates.to_string().yellow())?;
        if dry_run {
            writeln!(writer, "{}", "dry run: nothing was written".yellow())?;
            return Ok(());
        }

        writeln!(writer, "blobs converted:  {}", summary.converted.to_string().green())?;
        if summary.attributes_added > 0 {
            writeln!(writer, "attributes added: {}", summary.attributes_added)?;
        }
        writeln!(writer, "commits saved:    {}", summary.save.commits)?;
        writeln!(writer, "objects written:  {}", summary.save.objects_written.to_string().green())?;
        writeln!(writer, "refs updated:     {}", summary.save.refs_updated.to_string().green())?;

        Ok(())
    }
}
