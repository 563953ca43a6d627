//! Git data structures and algorithms
//!
//! - `branch`: Ref records and peeling
//! - `lfs`: LFS pointer format and the conversion policy
//! - `objects`: Git object types (blob, tree, commit, tag), ids and codec
//! - `pack`: Pack index reader
//! - `rewrite`: Save ordering and the save pass

pub mod branch;
pub mod lfs;
pub mod objects;
pub mod pack;
pub mod rewrite;
