use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RewriteError;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;
use std::collections::HashMap;

/// Serialize an object into its canonical payload (without the loose header)
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Parse an object from its payload (the loose header has already been read)
pub trait Unpackable {
    fn deserialize(payload: Bytes) -> Result<Self>
    where
        Self: Sized;
}

/// Second phase of construction: turn recorded hashes into arena slots
pub trait Resolvable {
    /// Resolve every outgoing link, returning one diagnostic per miss
    fn resolve(&mut self, owner: &ObjectId, resolver: &Resolver<'_>) -> Vec<RewriteError>;
}

/// Slot of an object in the store's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(pub(crate) usize);

impl ObjectKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Hash → arena slot lookup table
pub type ObjectIndex = HashMap<ObjectId, ObjectKey>;

/// Current identity of every arena slot, indexed by [`ObjectKey`]
///
/// Kept apart from the objects themselves so a save can update one object's
/// links while reading the ids of the objects it points at.
#[derive(Debug, Default, Clone)]
pub struct IdTable(Vec<ObjectId>);

impl IdTable {
    pub fn get(&self, key: ObjectKey) -> &ObjectId {
        &self.0[key.0]
    }

    pub(crate) fn set(&mut self, key: ObjectKey, id: ObjectId) {
        self.0[key.0] = id;
    }

    pub(crate) fn push(&mut self, id: ObjectId) -> ObjectKey {
        self.0.push(id);
        ObjectKey(self.0.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Looks recorded hashes up in a fully loaded store
#[derive(new)]
pub struct Resolver<'r> {
    index: &'r ObjectIndex,
    kinds: &'r [ObjectType],
}

impl Resolver<'_> {
    /// Slot of `oid`, if present and (when given) of the expected kind
    pub fn lookup(&self, oid: &ObjectId, expected: Option<ObjectType>) -> Option<ObjectKey> {
        let key = *self.index.get(oid)?;
        match expected {
            Some(expected) if self.kinds[key.0] != expected => None,
            _ => Some(key),
        }
    }
}

/// Reference from one object to another
///
/// `oid` is the hash recorded in the owner's payload; `target` is the arena
/// slot it resolved to, if any. The link is stale when the target's current
/// hash no longer matches the recorded one.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Link {
    oid: ObjectId,
    #[new(default)]
    target: Option<ObjectKey>,
}

impl Link {
    pub fn resolved(oid: ObjectId, target: ObjectKey) -> Self {
        Link {
            oid,
            target: Some(target),
        }
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn target(&self) -> Option<ObjectKey> {
        self.target
    }

    pub fn resolve(&mut self, resolver: &Resolver<'_>, expected: Option<ObjectType>) -> bool {
        self.target = resolver.lookup(&self.oid, expected);
        self.target.is_some()
    }

    pub fn is_stale(&self, ids: &IdTable) -> bool {
        self.target.is_some_and(|target| ids.get(target) != &self.oid)
    }

    /// Record the target's current hash
    ///
    /// Fails when the link never resolved: saving it would silently keep a
    /// dangling hash.
    pub fn refresh(&mut self, owner: &ObjectId, ids: &IdTable) -> Result<()> {
        let target = self.target.ok_or_else(|| RewriteError::SaveDependencyMissing {
            owner: owner.clone(),
            oid: self.oid.clone(),
        })?;
        self.oid = ids.get(target).clone();
        Ok(())
    }
}

/// The closed set of object kinds held by the store
#[derive(Debug, Clone)]
pub enum GitObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl GitObject {
    pub fn parse(object_type: ObjectType, size: u64, payload: Bytes) -> Result<Self> {
        Ok(match object_type {
            ObjectType::Blob => GitObject::Blob(Blob::new(size)),
            ObjectType::Tree => GitObject::Tree(Tree::deserialize(payload)?),
            ObjectType::Commit => GitObject::Commit(Commit::deserialize(payload)?),
            ObjectType::Tag => GitObject::Tag(Tag::deserialize(payload)?),
        })
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            GitObject::Blob(_) => ObjectType::Blob,
            GitObject::Tree(_) => ObjectType::Tree,
            GitObject::Commit(_) => ObjectType::Commit,
            GitObject::Tag(_) => ObjectType::Tag,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            GitObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            GitObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            GitObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }
}

impl Resolvable for GitObject {
    fn resolve(&mut self, owner: &ObjectId, resolver: &Resolver<'_>) -> Vec<RewriteError> {
        match self {
            GitObject::Blob(_) => Vec::new(),
            GitObject::Tree(tree) => tree.resolve(owner, resolver),
            GitObject::Commit(commit) => commit.resolve(owner, resolver),
            GitObject::Tag(tag) => tag.resolve(owner, resolver),
        }
    }
}
