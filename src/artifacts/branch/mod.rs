//! Named references (branches and tags)
//!
//! A [`Branch`] names a target hash. After resolution it knows whether that
//! hash is a commit (lightweight ref) or an annotated tag. Branches are not
//! content-addressed: after a save they are re-pointed at their target's new
//! hash and written back to the ref table.

pub mod reference;

pub use reference::{Branch, RefSource, RefTarget};

/// Header written to a packed ref table that had none
pub const PACKED_REFS_HEADER: &str = "# pack-refs with: peeled fully-peeled";

/// Maximum number of tags followed when peeling a ref
pub const MAX_PEEL_DEPTH: usize = 32;
