//! Git object types and operations
//!
//! Every object is identified by the SHA-1 of its framed payload. There are
//! four kinds:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (tree, parents, author, message)
//! - **Tag**: Annotated reference to another object
//!
//! Objects are built in two phases: parsed from bytes with their links holding
//! only recorded hashes, then resolved against the full store so each link
//! knows the arena slot of its target.

pub mod blob;
pub mod codec;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tag;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes
pub const RAW_OBJECT_ID_LENGTH: usize = 20;
