//! Command implementations
//!
//! Commands are split the way git splits them:
//!
//! - `plumbing`: Low-level commands that inspect single objects (cat-file, ls-tree, show-index)
//! - `porcelain`: User-facing commands that load and rewrite the whole repository (lfs, verify)

pub mod plumbing;
pub mod porcelain;
