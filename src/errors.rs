//! Error taxonomy for loading and rewriting a repository
//!
//! Most functions in this crate return `anyhow::Result`. The variants below are
//! raised for conditions callers may want to tell apart, and can be recovered
//! from an `anyhow::Error` with `downcast_ref::<RewriteError>()`.

use crate::artifacts::objects::object_id::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// A reference points at an object that is not in the store.
    ///
    /// Load never fails with this variant; it is recorded as a diagnostic and
    /// the link stays unresolved.
    #[error("missing object {oid} referenced by {owner} ({name})")]
    MissingObject {
        owner: ObjectId,
        name: String,
        oid: ObjectId,
    },

    /// Unknown object type, or an unsupported pack index magic/version.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A record could not be parsed.
    #[error("malformed record in {oid}: {reason}")]
    MalformedRecord { oid: String, reason: String },

    /// An object being saved needs a link whose target was never resolved.
    #[error("cannot save {owner}: dependency {oid} is missing from the store")]
    SaveDependencyMissing { owner: ObjectId, oid: ObjectId },

    /// The reference graph has a cycle or exceeds the nesting limit.
    #[error("corrupt object graph: {0}")]
    CorruptGraph(String),
}

impl RewriteError {
    pub fn malformed(oid: impl ToString, reason: impl Into<String>) -> Self {
        RewriteError::MalformedRecord {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }
}
