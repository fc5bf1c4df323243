//! Ancestry queries over the commit DAG.

use crate::commit::Commit;
use crate::hash::Hash;
use crate::store::ObjectStore;
use std::collections::{HashMap, VecDeque};

/// Parents of a commit, treating missing or unparseable commits as roots.
///
/// Walks must tolerate partial corruption: a dangling or mangled object
/// ends that branch of the traversal instead of aborting it, and cannot
/// produce a false positive.
fn parents_of(store: &ObjectStore, hash: &Hash) -> Vec<Hash> {
    match Commit::load(store, hash) {
        Ok(commit) => commit.parents,
        Err(_) => Vec::new(),
    }
}

/// True iff `ancestor` equals `descendant` or is reachable from it through
/// parent edges.
pub fn is_ancestor(store: &ObjectStore, ancestor: &Hash, descendant: &Hash) -> bool {
    if ancestor == descendant {
        return true;
    }

    let mut queue = VecDeque::new();
    let mut visited = std::collections::HashSet::new();
    queue.push_back(*descendant);
    visited.insert(*descendant);

    while let Some(current) = queue.pop_front() {
        for parent in parents_of(store, &current) {
            if parent == *ancestor {
                return true;
            }
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    false
}

/// BFS from `start`, recording each reachable commit's depth and the order
/// of first encounter.
fn bfs_depths(store: &ObjectStore, start: &Hash) -> (HashMap<Hash, u32>, Vec<Hash>) {
    let mut depths = HashMap::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    depths.insert(*start, 0);
    order.push(*start);
    queue.push_back(*start);

    while let Some(current) = queue.pop_front() {
        let depth = depths[&current];
        for parent in parents_of(store, &current) {
            if !depths.contains_key(&parent) {
                depths.insert(parent, depth + 1);
                order.push(parent);
                queue.push_back(parent);
            }
        }
    }

    (depths, order)
}

/// Find a merge base for `x` and `y`: the common ancestor minimizing the
/// sum of BFS depths from both tips, tie-broken by first encounter in the
/// walk from `y`.
///
/// Plain first-match BFS can pick a needlessly distant base in criss-cross
/// histories; minimizing the combined depth keeps the base close to both
/// tips while staying O(V+E).
pub fn find_lca(store: &ObjectStore, x: &Hash, y: &Hash) -> Option<Hash> {
    if x == y {
        return Some(*x);
    }

    let (from_x, _) = bfs_depths(store, x);
    let (from_y, order_y) = bfs_depths(store, y);

    let mut best: Option<(u32, Hash)> = None;
    for candidate in order_y {
        if let Some(&dx) = from_x.get(&candidate) {
            let sum = dx + from_y[&candidate];
            if best.is_none_or(|(b, _)| sum < b) {
                best = Some((sum, candidate));
            }
        }
    }

    best.map(|(_, hash)| hash)
}
