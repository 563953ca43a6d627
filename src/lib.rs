//! In-memory git object store with a history rewrite engine
//!
//! A repository is loaded whole into an arena of objects, blobs are replaced
//! by a mutation policy (the bundled one moves large files to LFS), and a
//! save pass rewrites every tree, commit and tag above the replaced blobs
//! before re-pointing the refs.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
