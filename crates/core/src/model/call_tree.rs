use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::profile::{CallFrame, NodeRecord};

/// A node of the call tree. Links are arena indices into [`CallTree::nodes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNode {
    pub id: u64,
    pub call_frame: CallFrame,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Exclusive time in microseconds, filled by sample aggregation.
    pub self_time: f64,
    /// Number of collapsed visits.
    pub hit_count: u64,
    /// Self time plus the self time of every descendant.
    pub total_time: f64,
}

/// Call tree over a profile's nodes, stored as an arena.
///
/// Every node has at most one parent. Child ids that do not name a node, or
/// name a node that already has a parent, are dropped at build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallTree {
    pub nodes: Vec<ProfileNode>,
    pub roots: Vec<usize>,
    index: HashMap<u64, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    Entered,
    Done,
}

impl CallTree {
    pub fn build(records: &[NodeRecord]) -> Self {
        let mut nodes: Vec<ProfileNode> = records
            .iter()
            .map(|r| ProfileNode {
                id: r.id,
                call_frame: r.call_frame.clone(),
                parent: None,
                children: Vec::new(),
                self_time: 0.0,
                hit_count: 0,
                total_time: 0.0,
            })
            .collect();

        let mut index = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            index.entry(record.id).or_insert(idx);
        }

        for (idx, record) in records.iter().enumerate() {
            for child_id in &record.children {
                if let Some(&child) = index.get(child_id) {
                    link(&mut nodes, idx, child);
                }
            }
        }
        for (idx, record) in records.iter().enumerate() {
            if let Some(parent) = record.parent.and_then(|pid| index.get(&pid).copied()) {
                link(&mut nodes, parent, idx);
            }
        }

        let roots = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(idx, _)| idx)
            .collect();

        Self {
            nodes,
            roots,
            index,
        }
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: u64) -> Option<&ProfileNode> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: u64) -> Option<&mut ProfileNode> {
        self.index_of(id).map(|idx| &mut self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of all self times.
    pub fn total_self_time(&self) -> f64 {
        self.nodes.iter().map(|n| n.self_time).sum()
    }

    /// Fill `total_time` for every node with an iterative post-order walk.
    ///
    /// Each subtree is summed exactly once; no recursion, so arbitrarily deep
    /// stacks are fine. A malformed cycle is cut where it closes.
    pub fn compute_total_times(&mut self) {
        let mut state = vec![Visit::Pending; self.nodes.len()];
        let mut stack: Vec<(usize, bool)> = Vec::new();

        for start in 0..self.nodes.len() {
            if state[start] != Visit::Pending {
                continue;
            }
            stack.push((start, false));

            while let Some((idx, children_done)) = stack.pop() {
                if children_done {
                    let children_total: f64 = self.nodes[idx]
                        .children
                        .iter()
                        .filter(|&&c| state[c] == Visit::Done)
                        .map(|&c| self.nodes[c].total_time)
                        .sum();
                    let node = &mut self.nodes[idx];
                    node.total_time = node.self_time + children_total;
                    state[idx] = Visit::Done;
                    continue;
                }
                if state[idx] != Visit::Pending {
                    continue;
                }
                state[idx] = Visit::Entered;
                stack.push((idx, true));
                stack.extend(
                    self.nodes[idx]
                        .children
                        .iter()
                        .filter(|&&c| state[c] == Visit::Pending)
                        .map(|&c| (c, false)),
                );
            }
        }
    }
}

fn link(nodes: &mut [ProfileNode], parent: usize, child: usize) {
    if parent == child || nodes[child].parent.is_some() {
        return;
    }
    nodes[child].parent = Some(parent);
    nodes[parent].children.push(child);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, name: &str, children: &[u64]) -> NodeRecord {
        NodeRecord {
            id,
            call_frame: CallFrame {
                function_name: name.to_string(),
                ..CallFrame::default()
            },
            children: children.to_vec(),
            parent: None,
        }
    }

    #[test]
    fn links_children_and_finds_roots() {
        let tree = CallTree::build(&[
            record(1, "(root)", &[2]),
            record(2, "main", &[3, 4, 99]),
            record(3, "foo", &[]),
            record(4, "bar", &[]),
        ]);
        assert_eq!(tree.roots, vec![0]);
        assert_eq!(tree.nodes[1].children, vec![2, 3]);
        assert_eq!(tree.node(3).unwrap().parent, Some(1));
        assert_eq!(tree.nodes[1].parent, Some(0));
        assert!(tree.node(99).is_none());
    }

    #[test]
    fn parent_ids_link_when_children_are_absent() {
        let mut leaf = record(2, "leaf", &[]);
        leaf.parent = Some(1);
        let tree = CallTree::build(&[record(1, "(root)", &[]), leaf]);
        assert_eq!(tree.nodes[0].children, vec![1]);
        assert_eq!(tree.roots, vec![0]);
    }

    #[test]
    fn second_parent_is_ignored() {
        let tree = CallTree::build(&[
            record(1, "a", &[3]),
            record(2, "b", &[3]),
            record(3, "c", &[]),
        ]);
        assert_eq!(tree.node(3).unwrap().parent, Some(0));
        assert!(tree.nodes[1].children.is_empty());
    }

    #[test]
    fn total_time_sums_subtrees() {
        let mut tree = CallTree::build(&[
            record(1, "(root)", &[2, 5]),
            record(2, "main", &[3, 4]),
            record(3, "foo", &[]),
            record(4, "bar", &[]),
            record(5, "idle", &[]),
        ]);
        for (id, t) in [(1, 5.0), (2, 10.0), (3, 20.0), (4, 40.0), (5, 80.0)] {
            tree.node_mut(id).unwrap().self_time = t;
        }
        tree.compute_total_times();

        assert_eq!(tree.node(2).unwrap().total_time, 70.0);
        assert_eq!(tree.node(1).unwrap().total_time, tree.total_self_time());
        assert!(tree.nodes.iter().all(|n| n.total_time >= n.self_time));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 200_000u64;
        let records: Vec<NodeRecord> = (0..depth)
            .map(|id| {
                let children = if id + 1 < depth { vec![id + 1] } else { vec![] };
                record(id, "f", &children)
            })
            .collect();
        let mut tree = CallTree::build(&records);
        for node in &mut tree.nodes {
            node.self_time = 1.0;
        }
        tree.compute_total_times();
        assert_eq!(tree.nodes[0].total_time, depth as f64);
    }

    #[test]
    fn cycle_terminates() {
        let mut tree = CallTree::build(&[record(1, "a", &[2]), record(2, "b", &[1])]);
        tree.compute_total_times();
        assert!(tree.nodes.iter().all(|n| n.total_time >= n.self_time));
    }
}
