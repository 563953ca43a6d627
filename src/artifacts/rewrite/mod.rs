//! History rewriting
//!
//! - `save_order`: which commits are reachable, and in which order to save them
//! - `engine`: the save pass that propagates changed hashes up to the refs

pub mod engine;
pub mod save_order;

pub use engine::{SavePass, SaveReport, save};
