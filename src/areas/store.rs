//! In-memory object store
//!
//! The store owns every object of the repository in a single arena. Objects
//! refer to each other through [`Link`](crate::artifacts::objects::object::Link)s
//! holding a recorded hash and the arena slot it resolved to, so the graph never
//! needs owning back-pointers.
//!
//! ## Lifecycle
//!
//! 1. `load`: decompress and parse every loose object (in parallel), insert
//!    them into the arena
//! 2. `resolve`: once the address space is complete, turn recorded hashes into
//!    slots; misses are recorded, not fatal
//! 3. blobs may be replaced by a mutation policy
//! 4. the save pass (see [`crate::artifacts::rewrite`]) rewrites ancestors

use crate::areas::database::Database;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::{GitObject, IdTable, ObjectIndex, ObjectKey, Resolvable, Resolver};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::errors::RewriteError;
use anyhow::Context;
use bytes::Bytes;

/// Number of loaded objects between two progress messages
const PROGRESS_INTERVAL: usize = 10_000;

#[derive(Debug)]
pub struct Store {
    database: Database,
    objects: Vec<GitObject>,
    ids: IdTable,
    index: ObjectIndex,
    missing: Vec<RewriteError>,
}

impl Store {
    /// Empty store backed by `database`
    pub fn new(database: Database) -> Self {
        Store {
            database,
            objects: Vec::new(),
            ids: IdTable::default(),
            index: ObjectIndex::new(),
            missing: Vec::new(),
        }
    }

    /// Load and resolve every loose object of `database`
    pub async fn load(database: Database) -> anyhow::Result<Self> {
        let object_ids = database.list_objects()?;
        let total = object_ids.len();
        tracing::info!(total, path = %database.objects_path().display(), "loading objects");

        let workers = std::thread::available_parallelism().map_or(4, |n| n.get());
        let chunk_size = total.div_ceil(workers).max(1);

        let handles = object_ids
            .chunks(chunk_size)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let database = database.clone();
                tokio::task::spawn_blocking(move || Self::parse_chunk(&database, chunk))
            })
            .collect::<Vec<_>>();

        // results are inserted in listing order so slots are reproducible
        let mut store = Store::new(database);
        for handle in handles {
            let parsed = handle.await.context("Object loader task failed")??;
            for (object_id, object) in parsed {
                store.insert(object_id, object);
                if store.len() % PROGRESS_INTERVAL == 0 {
                    tracing::info!("loaded {}/{} objects", store.len(), total);
                }
            }
        }
        tracing::info!("loaded {} objects", store.len());

        store.resolve();
        Ok(store)
    }

    fn parse_chunk(
        database: &Database,
        object_ids: Vec<ObjectId>,
    ) -> anyhow::Result<Vec<(ObjectId, GitObject)>> {
        object_ids
            .into_iter()
            .map(|object_id| {
                let (object_type, size, payload) = database.read_object_lazily(&object_id)?;
                let object = GitObject::parse(object_type, size, payload.unwrap_or_default())
                    .map_err(|e| match e.downcast::<RewriteError>() {
                        Ok(RewriteError::MalformedRecord { reason, .. }) => {
                            RewriteError::malformed(&object_id, reason).into()
                        }
                        Ok(other) => other.into(),
                        Err(e) => anyhow::Error::from(RewriteError::malformed(&object_id, e.to_string())),
                    })?;
                Ok((object_id, object))
            })
            .collect()
    }

    /// Resolve every object's links against the current table
    ///
    /// Must run only once every object has been inserted: a link to an object
    /// that is loaded later would otherwise be reported missing.
    pub fn resolve(&mut self) {
        tracing::info!("resolving links");
        let kinds = self.objects.iter().map(GitObject::object_type).collect::<Vec<_>>();
        let resolver = Resolver::new(&self.index, &kinds);

        self.missing.clear();
        for (slot, object) in self.objects.iter_mut().enumerate() {
            let owner = self.ids.get(ObjectKey(slot));
            let missing = object.resolve(owner, &resolver);

            if !missing.is_empty() {
                tracing::warn!(
                    owner = %owner,
                    kind = %kinds[slot],
                    count = missing.len(),
                    "object has unresolved references"
                );
            }
            for error in missing {
                if let RewriteError::MissingObject { name, oid, .. } = &error {
                    tracing::warn!(owner = %owner, entry = %name, %oid, "unknown reference");
                }
                self.missing.push(error);
            }
        }
    }

    /// Add an object, reusing the slot that currently holds `object_id`
    ///
    /// A superseded id only aliases its successor for lookups: inserting that
    /// content again gets a slot of its own.
    pub fn insert(&mut self, object_id: ObjectId, object: GitObject) -> ObjectKey {
        if let Some(&key) = self.index.get(&object_id)
            && self.ids.get(key) == &object_id
        {
            return key;
        }

        self.objects.push(object);
        let key = self.ids.push(object_id.clone());
        self.index.insert(object_id, key);
        key
    }

    /// Live object for a 40-digit hash; `None` for unknown or malformed hashes
    pub fn get_object(&self, hash: &str) -> Option<&GitObject> {
        self.key_of(hash).map(|key| self.object(key))
    }

    pub fn key_of(&self, hash: &str) -> Option<ObjectKey> {
        if hash.len() != OBJECT_ID_LENGTH {
            return None;
        }

        let object_id = ObjectId::try_parse(hash.to_string()).ok()?;
        self.index.get(&object_id).copied()
    }

    pub fn object(&self, key: ObjectKey) -> &GitObject {
        &self.objects[key.0]
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> &mut GitObject {
        &mut self.objects[key.0]
    }

    /// Current identity of the object in `key`
    pub fn id(&self, key: ObjectKey) -> &ObjectId {
        self.ids.get(key)
    }

    pub fn ids(&self) -> &IdTable {
        &self.ids
    }

    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + use<> {
        (0..self.objects.len()).map(ObjectKey)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// References that did not resolve during the last `resolve`
    pub fn missing(&self) -> &[RewriteError] {
        &self.missing
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn load_blob_bytes(&self, key: ObjectKey) -> anyhow::Result<Bytes> {
        self.database.load_blob_bytes(self.id(key))
    }

    pub fn write_object(&self, object_type: ObjectType, payload: &[u8]) -> anyhow::Result<ObjectId> {
        self.database.write_object(object_type, payload)
    }

    /// Replace a blob's content: write the new payload and take its identity
    pub fn replace_blob(&mut self, key: ObjectKey, payload: &[u8]) -> anyhow::Result<ObjectId> {
        let object_id = self.write_object(ObjectType::Blob, payload)?;
        self.reassign_blob(key, object_id.clone(), payload.len() as u64)?;
        Ok(object_id)
    }

    /// Point a blob slot at an already written blob object
    pub fn reassign_blob(&mut self, key: ObjectKey, object_id: ObjectId, size: u64) -> anyhow::Result<()> {
        match &mut self.objects[key.0] {
            GitObject::Blob(blob) => blob.set_size(size),
            other => {
                return Err(RewriteError::malformed(
                    self.ids.get(key),
                    format!("expected blob, found {}", other.object_type()),
                )
                .into());
            }
        }

        self.assign_id(key, object_id);
        Ok(())
    }

    /// Give a slot a new identity, keeping the old hash as an alias
    pub(crate) fn assign_id(&mut self, key: ObjectKey, object_id: ObjectId) {
        self.index.entry(object_id.clone()).or_insert(key);
        self.ids.set(key, object_id);
    }

    /// Split borrow for the save pass: objects, current ids, backing database
    pub(crate) fn parts_mut(&mut self) -> (&mut [GitObject], &mut IdTable, &mut ObjectIndex, &Database) {
        (&mut self.objects, &mut self.ids, &mut self.index, &self.database)
    }

    /// Insert a freshly written blob
    pub fn insert_blob(&mut self, payload: &[u8]) -> anyhow::Result<ObjectKey> {
        let object_id = self.write_object(ObjectType::Blob, payload)?;
        Ok(self.insert(object_id, GitObject::Blob(Blob::new(payload.len() as u64))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::objects::object::{Link, Packable};
    use crate::artifacts::objects::tree::{Tree, TreeEntry};
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn objects_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    fn database(dir: &TempDir) -> Database {
        Database::new(dir.path().to_path_buf().into_boxed_path())
    }

    fn tree_payload(entries: &[(&str, &ObjectId)]) -> Bytes {
        let entries = entries
            .iter()
            .map(|(name, oid)| {
                TreeEntry::new(
                    EntryMode::File(FileMode::Regular),
                    Bytes::copy_from_slice(name.as_bytes()),
                    Link::new((*oid).clone()),
                )
            })
            .collect();
        Tree::new(entries).serialize().unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn loads_and_resolves_forward_references(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let blob = database.write_object(ObjectType::Blob, b"hello").unwrap();
        let tree = database
            .write_object(ObjectType::Tree, &tree_payload(&[("a.txt", &blob)]))
            .unwrap();

        let store = Store::load(database).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.missing().is_empty());
        let tree = store.get_object(tree.as_ref()).and_then(GitObject::as_tree).unwrap();
        let target = tree.entries()[0].link().target().unwrap();
        assert_eq!(store.id(target), &blob);
        assert_eq!(store.load_blob_bytes(target).unwrap(), Bytes::from_static(b"hello"));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_references_are_recorded_not_fatal(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let absent = ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567".to_string())
            .unwrap();
        let tree = database
            .write_object(ObjectType::Tree, &tree_payload(&[("gone.txt", &absent)]))
            .unwrap();

        let store = Store::load(database).await.unwrap();

        assert_eq!(store.missing().len(), 1);
        assert!(matches!(
            &store.missing()[0],
            RewriteError::MissingObject { owner, oid, .. } if owner == &tree && oid == &absent
        ));
        let tree = store.get_object(tree.as_ref()).and_then(GitObject::as_tree).unwrap();
        assert_eq!(tree.entries()[0].link().target(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_object_types_abort_the_load(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567".to_string())
            .unwrap();
        let path = objects_dir.path().join(oid.to_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, b"ofs-delta 0\0").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let error = Store::load(database).await.unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RewriteError>(),
            Some(RewriteError::UnsupportedFormat(_))
        ));
    }

    #[rstest]
    fn get_object_rejects_malformed_hashes(objects_dir: TempDir) {
        let mut store = Store::new(database(&objects_dir));
        let key = store.insert_blob(b"x").unwrap();
        let oid = store.id(key).clone();

        assert!(store.get_object(oid.as_ref()).is_some());
        assert!(store.get_object(&oid.as_ref()[..39]).is_none());
        assert!(store.get_object("").is_none());
    }

    #[rstest]
    fn replaced_blobs_keep_their_old_hash_as_alias(objects_dir: TempDir) {
        let mut store = Store::new(database(&objects_dir));
        let key = store.insert_blob(b"hello").unwrap();
        let old = store.id(key).clone();

        let new = store.replace_blob(key, b"pointer").unwrap();

        assert_ne!(new, old);
        assert_eq!(store.id(key), &new);
        assert_eq!(store.key_of(old.as_ref()), Some(key));
        assert_eq!(store.key_of(new.as_ref()), Some(key));
        assert_eq!(store.load_blob_bytes(key).unwrap(), Bytes::from_static(b"pointer"));
    }

    #[rstest]
    fn identical_inserts_share_a_slot(objects_dir: TempDir) {
        let mut store = Store::new(database(&objects_dir));

        let first = store.insert_blob(b"same").unwrap();
        let second = store.insert_blob(b"same").unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    fn replaced_content_gets_a_fresh_slot(objects_dir: TempDir) {
        let mut store = Store::new(database(&objects_dir));
        let original = store.insert_blob(b"original").unwrap();
        let original_id = store.id(original).clone();
        let replacement_id = store.replace_blob(original, b"replacement").unwrap();

        let again = store.insert_blob(b"original").unwrap();

        assert_ne!(again, original);
        assert_eq!(store.id(again), &original_id);
        assert_eq!(store.id(original), &replacement_id);
        assert_eq!(store.key_of(replacement_id.as_ref()), Some(original));
        assert_eq!(store.len(), 2);
    }
}
