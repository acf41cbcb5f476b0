use std::collections::{HashMap, HashSet};

use crate::transaction::tx::TransactionID;

/// Who-waits-for-whom, used purely to detect deadlock cycles among
/// transactions blocked on page/tree latches; this is not part of the
/// core (the lock manager is an out-of-scope collaborator per §1) but
/// a timeout-only latch wait is a poor substitute for real deadlock
/// detection in a crate meant to be exercised under the `S3`
/// random-workload property, so it is carried as ambient
/// infrastructure the same way the teacher repo carries it.
#[derive(Default)]
pub struct WaitForGraph {
    edges: HashMap<TransactionID, HashSet<TransactionID>>,
}

impl WaitForGraph {
    pub fn new() -> WaitForGraph {
        WaitForGraph {
            edges: HashMap::new(),
        }
    }

    pub fn add_edge(&mut self, from: TransactionID, to: TransactionID) {
        if from == to {
            return;
        }
        self.edges.entry(from).or_insert_with(HashSet::new).insert(to);
    }

    pub fn remove_node(&mut self, tx: TransactionID) {
        self.edges.remove(&tx);
        for set in self.edges.values_mut() {
            set.remove(&tx);
        }
    }

    /// DFS cycle detection starting from `start`: `true` means
    /// granting `start`'s pending wait would deadlock.
    pub fn find_cycle(&self, start: TransactionID) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if let Some(neighbors) = self.edges.get(&node) {
                for &next in neighbors {
                    if next == start {
                        return true;
                    }
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_detection() {
        let mut g = WaitForGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        assert!(!g.find_cycle(1));
        g.add_edge(3, 1);
        assert!(g.find_cycle(1));
    }
}
