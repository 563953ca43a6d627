//! Plumbing commands (low-level object inspection)
//!
//! These read objects straight from disk and never load the whole store.
//!
//! ## Commands
//!
//! - `cat-file`: Print one object
//! - `ls-tree`: List the contents of a tree object
//! - `show-index`: Dump a pack index

pub mod cat_file;
pub mod ls_tree;
pub mod show_index;

pub use show_index::show_index;
