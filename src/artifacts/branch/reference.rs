use crate::areas::store::Store;
use crate::artifacts::branch::MAX_PEEL_DEPTH;
use crate::artifacts::objects::object::{GitObject, IdTable, ObjectKey};
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;

/// Where a ref was read from, and so where it is written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSource {
    /// A line of the `packed-refs` table
    Packed,
    /// A file under `refs/`
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    Commit(ObjectKey),
    Tag(ObjectKey),
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Branch {
    name: String,
    hash: ObjectId,
    source: RefSource,
    #[new(default)]
    target: Option<RefTarget>,
}

impl Branch {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &ObjectId {
        &self.hash
    }

    pub fn source(&self) -> &RefSource {
        &self.source
    }

    pub fn target(&self) -> Option<RefTarget> {
        self.target
    }

    pub fn commit(&self) -> Option<ObjectKey> {
        match self.target {
            Some(RefTarget::Commit(key)) => Some(key),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<ObjectKey> {
        match self.target {
            Some(RefTarget::Tag(key)) => Some(key),
            _ => None,
        }
    }

    /// Classify the target hash as a commit or an annotated tag
    ///
    /// Any other outcome (absent, tree, blob) leaves the ref unresolved.
    pub fn resolve(&mut self, store: &Store) {
        self.target = store.key_of(self.hash.as_ref()).and_then(|key| match store.object(key) {
            GitObject::Commit(_) => Some(RefTarget::Commit(key)),
            GitObject::Tag(_) => Some(RefTarget::Tag(key)),
            _ => None,
        });

        if self.target.is_none() {
            tracing::warn!(name = %self.name, hash = %self.hash, "ref does not point at a known commit or tag");
        }
    }

    /// Commit reached by following tags from this ref
    pub fn peeled_commit(&self, store: &Store) -> Option<ObjectKey> {
        let mut key = match self.target? {
            RefTarget::Commit(key) => return Some(key),
            RefTarget::Tag(key) => key,
        };

        for _ in 0..MAX_PEEL_DEPTH {
            match store.object(key) {
                GitObject::Commit(_) => return Some(key),
                GitObject::Tag(tag) => key = tag.target().target()?,
                _ => return None,
            }
        }

        None
    }

    /// Take the target's current hash
    ///
    /// Returns whether the ref moved. Unresolved refs keep their hash.
    pub fn refresh(&mut self, ids: &IdTable) -> bool {
        let key = match self.target {
            Some(RefTarget::Commit(key) | RefTarget::Tag(key)) => key,
            None => return false,
        };

        let hash = ids.get(key);
        if hash == &self.hash {
            return false;
        }

        self.hash = hash.clone();
        true
    }
}
