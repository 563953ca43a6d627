//! Git annotated tag object
//!
//! ## Format
//!
//! ```text
//! tag <size>\0
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message, possibly followed by a signature>
//! ```
//!
//! The message body is carried through rewrites unchanged.

use crate::artifacts::objects::codec::split_line;
use crate::artifacts::objects::object::{IdTable, Link, Packable, Resolvable, Resolver, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RewriteError;
use bytes::Bytes;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    target: Link,
    target_type: String,
    name: Bytes,
    tagger: Option<Bytes>,
    /// Bytes after the blank line ending the headers, if there was one
    body: Option<Bytes>,
}

impl Tag {
    pub fn target(&self) -> &Link {
        &self.target
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn tagger(&self) -> Option<&[u8]> {
        self.tagger.as_deref()
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(self.body.as_deref().unwrap_or_default()).into_owned()
    }

    pub fn is_dirty(&self, ids: &IdTable) -> bool {
        self.target.is_stale(ids)
    }

    pub fn refresh_links(&mut self, owner: &ObjectId, ids: &IdTable) -> anyhow::Result<()> {
        self.target.refresh(owner, ids)
    }
}

impl Packable for Tag {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        writeln!(content, "object {}", self.target.oid())?;
        writeln!(content, "type {}", self.target_type)?;
        content.write_all(b"tag ")?;
        content.write_all(&self.name)?;
        content.write_all(b"\n")?;
        if let Some(tagger) = &self.tagger {
            content.write_all(b"tagger ")?;
            content.write_all(tagger)?;
            content.write_all(b"\n")?;
        }
        if let Some(body) = &self.body {
            content.write_all(b"\n")?;
            content.write_all(body)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tag {
    fn deserialize(payload: Bytes) -> anyhow::Result<Self> {
        let mut target = None;
        let mut target_type = None;
        let mut name = None;
        let mut tagger = None;
        let mut body = None;

        let mut rest = Some(payload.as_ref());
        while let Some(remaining) = rest {
            let (line, next) = split_line(remaining);
            rest = next;

            if line.is_empty() {
                body = next.map(Bytes::copy_from_slice);
                break;
            }

            let (key, value) = match line.iter().position(|&byte| byte == b' ') {
                Some(split) => (&line[..split], &line[split + 1..]),
                None => (line, &b""[..]),
            };

            match key {
                b"object" => {
                    let oid = String::from_utf8(value.to_vec())
                        .map_err(|_| RewriteError::malformed("tag", "non-ASCII object id"))?;
                    target = Some(ObjectId::try_parse(oid).map_err(|e| {
                        RewriteError::malformed("tag", format!("invalid object id: {e}"))
                    })?);
                }
                b"type" => target_type = Some(String::from_utf8_lossy(value).into_owned()),
                b"tag" => name = Some(Bytes::copy_from_slice(value)),
                b"tagger" => tagger = Some(Bytes::copy_from_slice(value)),
                other => {
                    return Err(RewriteError::malformed(
                        "tag",
                        format!("unexpected header {:?}", String::from_utf8_lossy(other)),
                    )
                    .into());
                }
            }
        }

        let missing = |what: &str| RewriteError::malformed("tag", format!("missing {what} line"));

        Ok(Tag {
            target: Link::new(target.ok_or_else(|| missing("object"))?),
            target_type: target_type.ok_or_else(|| missing("type"))?,
            name: name.ok_or_else(|| missing("tag"))?,
            tagger,
            body,
        })
    }
}

impl Resolvable for Tag {
    fn resolve(&mut self, owner: &ObjectId, resolver: &Resolver<'_>) -> Vec<RewriteError> {
        let expected = ObjectType::try_from(self.target_type.as_str()).ok();

        if self.target.resolve(resolver, expected) {
            return Vec::new();
        }

        vec![RewriteError::MissingObject {
            owner: owner.clone(),
            name: format!("{} {}", self.target_type, self.name()),
            oid: self.target.oid().clone(),
        }]
    }
}
