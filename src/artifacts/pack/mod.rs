//! Pack files
//!
//! Only the index is understood; pack contents are never decoded.

pub mod pack_index;

pub use pack_index::{PackIndex, PackIndexEntry};
