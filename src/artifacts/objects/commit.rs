//! Git commit object
//!
//! Commits tie a tree snapshot to its history. The store keeps everything a
//! rewrite must reproduce byte for byte:
//! - the tree and parent links (rewritten when their targets change)
//! - the author and committer lines, verbatim
//! - everything after the committer line (extra headers, the blank
//!   separator, the message), verbatim
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::codec::split_line;
use crate::artifacts::objects::object::{IdTable, Link, ObjectKey, Packable, Resolvable, Resolver, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RewriteError;
use bytes::Bytes;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: Link,
    /// Empty for root commits
    parents: Vec<Link>,
    author: Bytes,
    committer: Bytes,
    /// Bytes following the committer line's newline; `None` if the payload
    /// ended on the committer line itself
    tail: Option<Bytes>,
}

impl Commit {
    pub fn new(tree: Link, parents: Vec<Link>, author: Bytes, committer: Bytes, message: &str) -> Self {
        Commit {
            tree,
            parents,
            author,
            committer,
            tail: Some(Bytes::from(format!("\n{message}"))),
        }
    }

    pub fn tree(&self) -> &Link {
        &self.tree
    }

    pub fn parents(&self) -> &[Link] {
        &self.parents
    }

    /// Slots of the resolved parents, in recorded order
    pub fn parent_keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.parents.iter().filter_map(Link::target)
    }

    pub fn author(&self) -> &[u8] {
        &self.author
    }

    pub fn committer(&self) -> &[u8] {
        &self.committer
    }

    /// Message body, after the blank line that ends the headers
    pub fn message(&self) -> String {
        let tail = self.tail.as_deref().unwrap_or_default();
        let body = tail
            .windows(2)
            .position(|window| window == b"\n\n")
            .map(|end| &tail[end + 2..])
            .unwrap_or_else(|| tail.strip_prefix(b"\n").unwrap_or(tail));

        String::from_utf8_lossy(body).into_owned()
    }

    pub fn is_dirty(&self, ids: &IdTable) -> bool {
        self.tree.is_stale(ids) || self.parents.iter().any(|parent| parent.is_stale(ids))
    }

    pub fn refresh_links(&mut self, owner: &ObjectId, ids: &IdTable) -> anyhow::Result<()> {
        self.tree.refresh(owner, ids)?;
        for parent in self.parents.iter_mut() {
            parent.refresh(owner, ids)?;
        }
        Ok(())
    }
}

fn header_value<'a>(line: &'a [u8], key: &str) -> Option<&'a [u8]> {
    line.strip_prefix(key.as_bytes())?.strip_prefix(b" ")
}

fn parse_oid(value: &[u8], field: &str) -> anyhow::Result<ObjectId> {
    let value = String::from_utf8(value.to_vec())
        .map_err(|_| RewriteError::malformed("commit", format!("non-ASCII {field} id")))?;
    ObjectId::try_parse(value)
        .map_err(|e| RewriteError::malformed("commit", format!("invalid {field} id: {e}")).into())
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        writeln!(content, "tree {}", self.tree.oid())?;
        for parent in &self.parents {
            writeln!(content, "parent {}", parent.oid())?;
        }
        content.write_all(b"author ")?;
        content.write_all(&self.author)?;
        content.write_all(b"\ncommitter ")?;
        content.write_all(&self.committer)?;
        if let Some(tail) = &self.tail {
            content.write_all(b"\n")?;
            content.write_all(tail)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Commit {
    fn deserialize(payload: Bytes) -> anyhow::Result<Self> {
        let missing = |what: &str| RewriteError::malformed("commit", format!("missing {what} line"));

        let (line, mut rest) = split_line(&payload);
        let tree = header_value(line, "tree").ok_or_else(|| missing("tree"))?;
        let tree = Link::new(parse_oid(tree, "tree")?);

        let mut parents = Vec::new();
        let mut line = rest.ok_or_else(|| missing("author"))?;
        loop {
            let (current, next) = split_line(line);
            match header_value(current, "parent") {
                Some(parent) => {
                    parents.push(Link::new(parse_oid(parent, "parent")?));
                    line = next.ok_or_else(|| missing("author"))?;
                }
                None => break,
            }
        }

        let (current, next) = split_line(line);
        let author = header_value(current, "author").ok_or_else(|| missing("author"))?;
        let author = Bytes::copy_from_slice(author);

        let (current, next) = split_line(next.ok_or_else(|| missing("committer"))?);
        let committer = header_value(current, "committer").ok_or_else(|| missing("committer"))?;
        let committer = Bytes::copy_from_slice(committer);
        rest = next;

        Ok(Commit {
            tree,
            parents,
            author,
            committer,
            tail: rest.map(Bytes::copy_from_slice),
        })
    }
}

impl Resolvable for Commit {
    fn resolve(&mut self, owner: &ObjectId, resolver: &Resolver<'_>) -> Vec<RewriteError> {
        let mut missing = Vec::new();

        if !self.tree.resolve(resolver, Some(ObjectType::Tree)) {
            missing.push(RewriteError::MissingObject {
                owner: owner.clone(),
                name: "tree".to_string(),
                oid: self.tree.oid().clone(),
            });
        }

        for parent in self.parents.iter_mut() {
            if !parent.resolve(resolver, Some(ObjectType::Commit)) {
                missing.push(RewriteError::MissingObject {
                    owner: owner.clone(),
                    name: "parent".to_string(),
                    oid: parent.oid().clone(),
                });
            }
        }

        missing
    }
}
