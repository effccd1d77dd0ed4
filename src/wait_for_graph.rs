//! Wait-for graph with DFS cycle detection (spec §4.3).
//!
//! Grounded on the teacher's `transaction::wait_for_graph::WaitForGraph`,
//! extended to report the discovered cycle (for logging) and to clean up
//! both directions of an edge when a transaction ends, since spec §4.3 says
//! edges "persist... for the duration of the transaction; they are cleared
//! on transaction end" — which must include edges other transactions hold
//! pointing at the one that just ended.

use crate::transaction_id::TransactionId;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct WaitForGraph {
    // edge `from -> to` means `from` is blocked waiting on a lock held by `to`.
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        WaitForGraph {
            edges: HashMap::new(),
        }
    }

    pub fn add_edge(&mut self, from: TransactionId, to: TransactionId) {
        if from == to {
            return;
        }
        self.edges.entry(from).or_insert_with(HashSet::new).insert(to);
    }

    /// Remove every edge `from -> *` for the given transaction. Called once
    /// a `get_page` retry succeeds and the requester is no longer waiting on
    /// anyone.
    pub fn remove_waiter(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
    }

    /// Remove every edge mentioning `tid`, in either direction. Called when a
    /// transaction ends (commit or abort).
    pub fn remove_transaction(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
        for waiters in self.edges.values_mut() {
            waiters.remove(&tid);
        }
    }

    /// DFS cycle search starting from every node; returns the cycle (as the
    /// sequence of transactions that form it) if one exists.
    pub fn find_cycle(&self) -> Option<Vec<TransactionId>> {
        let mut visited = HashSet::new();
        for &start in self.edges.keys() {
            if visited.contains(&start) {
                continue;
            }
            let mut stack = Vec::new();
            let mut on_stack = HashSet::new();
            if let Some(cycle) = self.dfs(start, &mut visited, &mut stack, &mut on_stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs(
        &self,
        node: TransactionId,
        visited: &mut HashSet<TransactionId>,
        stack: &mut Vec<TransactionId>,
        on_stack: &mut HashSet<TransactionId>,
    ) -> Option<Vec<TransactionId>> {
        visited.insert(node);
        stack.push(node);
        on_stack.insert(node);

        if let Some(neighbors) = self.edges.get(&node) {
            for &next in neighbors {
                if on_stack.contains(&next) {
                    let start = stack.iter().position(|&t| t == next).unwrap();
                    return Some(stack[start..].to_vec());
                }
                if !visited.contains(&next) {
                    if let Some(cycle) = self.dfs(next, visited, stack, on_stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        on_stack.remove(&node);
        None
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}
