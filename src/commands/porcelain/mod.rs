//! Porcelain commands (user-facing operations)
//!
//! ## Commands
//!
//! - `lfs`: Move large blobs to LFS storage and rewrite the history above them
//! - `verify`: Load the repository and report unresolved references

pub mod lfs;
pub mod verify;

pub use lfs::{LfsSummary, RewriteOptions};
