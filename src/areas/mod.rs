//! Core repository components
//!
//! This module contains the stateful parts of a repository, the ones that
//! touch the filesystem:
//!
//! - `database`: Loose object storage (read, hash, write)
//! - `store`: In-memory arena holding every loaded object
//! - `refs`: Packed and loose references
//! - `lfs`: Large file storage for converted blobs
//! - `repository`: Bundles the above; drives load and save

pub mod database;
pub mod lfs;
pub mod refs;
pub mod repository;
pub mod store;
