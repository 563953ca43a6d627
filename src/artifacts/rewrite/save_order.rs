//! Commit save ordering
//!
//! A commit's payload embeds its parents' hashes, so a parent must be saved
//! before any of its children. This module computes that order for every
//! commit reachable from the ref set.
//!
//! ## Algorithm Overview
//!
//! ### Phase 1: Discovery
//!
//! Depth-first walk from every resolved ref, in load order. Annotated tags
//! are peeled to their commit. Each commit gets a discovery number the first
//! time it is reached; first parents are explored before later ones.
//!
//! ### Phase 2: Layered extraction
//!
//! Kahn's algorithm, one layer at a time:
//! - layer 0 holds every commit with no parent inside the set
//! - layer N+1 holds every commit whose last remaining parent sits in layer N
//!
//! Within a layer, commits keep their discovery order, which makes the
//! output reproducible for a given repository and ref set. A layer that comes
//! up empty while commits remain means the history contains a cycle.

use crate::areas::refs::RefSet;
use crate::areas::store::Store;
use crate::artifacts::objects::object::{GitObject, ObjectKey};
use crate::errors::RewriteError;
use std::collections::{HashMap, HashSet};

/// Every commit reachable from `ref_set`, in discovery order
pub fn collect_commits(store: &Store, ref_set: &RefSet) -> Vec<ObjectKey> {
    let mut seen = HashSet::new();
    let mut discovered = Vec::new();

    for branch in ref_set.branches() {
        let Some(start) = branch.peeled_commit(store) else {
            continue;
        };

        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }

            let GitObject::Commit(commit) = store.object(key) else {
                continue;
            };
            discovered.push(key);

            // reversed so the first parent is popped first
            let parents = commit.parent_keys().collect::<Vec<_>>();
            stack.extend(parents.into_iter().rev().filter(|parent| !seen.contains(parent)));
        }
    }

    discovered
}

/// Order `commits` so every parent precedes all of its children
///
/// Parents outside `commits` are ignored. Fails with `CorruptGraph` if the
/// parent edges form a cycle.
pub fn save_order(store: &Store, commits: &[ObjectKey]) -> anyhow::Result<Vec<ObjectKey>> {
    let discovery = commits
        .iter()
        .enumerate()
        .map(|(position, key)| (*key, position))
        .collect::<HashMap<_, _>>();

    let mut pending_parents = HashMap::with_capacity(commits.len());
    let mut children: HashMap<ObjectKey, Vec<ObjectKey>> = HashMap::new();

    for &key in commits {
        let parents = match store.object(key) {
            GitObject::Commit(commit) => commit
                .parent_keys()
                .filter(|parent| discovery.contains_key(parent))
                .collect::<HashSet<_>>(),
            _ => HashSet::new(),
        };

        for &parent in &parents {
            children.entry(parent).or_default().push(key);
        }
        pending_parents.insert(key, parents.len());
    }

    let mut layer = commits
        .iter()
        .copied()
        .filter(|key| pending_parents[key] == 0)
        .collect::<Vec<_>>();
    let mut order = Vec::with_capacity(commits.len());

    while !layer.is_empty() {
        let mut next = Vec::new();

        for &key in &layer {
            for &child in children.get(&key).map(Vec::as_slice).unwrap_or_default() {
                let remaining = pending_parents.entry(child).or_default();
                *remaining -= 1;
                if *remaining == 0 {
                    next.push(child);
                }
            }
        }

        order.append(&mut layer);
        next.sort_by_key(|key| discovery[key]);
        layer = next;
    }

    if order.len() != commits.len() {
        return Err(RewriteError::CorruptGraph(format!(
            "{} commits form a parent cycle",
            commits.len() - order.len()
        ))
        .into());
    }

    Ok(order)
}
