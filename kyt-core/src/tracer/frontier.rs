//! Priority frontier: a binary heap keyed `(depth asc, priority desc,
//! insertion-order asc)` (spec.md §4.3, §9) so the traversal order is fully
//! deterministic across runs with identical inputs.

use super::state::TraceNode;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct HeapEntry {
    node: TraceNode,
    insertion_order: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.node.depth == other.node.depth
            && self.node.priority == other.node.priority
            && self.insertion_order == other.insertion_order
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert depth so the smallest pops first,
        // keep priority as-is so the largest pops first, invert insertion
        // order so the earliest-pushed of a tie pops first.
        other
            .node
            .depth
            .cmp(&self.node.depth)
            .then_with(|| self.node.priority.cmp(&other.node.priority))
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}

#[derive(Default)]
pub struct Frontier {
    heap: BinaryHeap<HeapEntry>,
    next_insertion: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: TraceNode) {
        let insertion_order = self.next_insertion;
        self.next_insertion += 1;
        self.heap.push(HeapEntry {
            node,
            insertion_order,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pops up to `batch_cap` nodes sharing the current minimum depth.
    /// Visited-address dedup happens in the caller, which has access to the
    /// shared `TraceState` (spec.md §4.3 main loop step 1).
    pub fn pop_layer(&mut self, batch_cap: usize) -> Vec<TraceNode> {
        let mut batch = Vec::new();
        let layer_depth = match self.heap.peek() {
            Some(entry) => entry.node.depth,
            None => return batch,
        };
        while batch.len() < batch_cap {
            match self.heap.peek() {
                Some(entry) if entry.node.depth == layer_depth => {
                    let entry = self.heap.pop().expect("just peeked");
                    batch.push(entry.node);
                }
                _ => break,
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(depth: u32, priority: i64, address: &str) -> TraceNode {
        TraceNode {
            tx_id: "tx".into(),
            address: address.into(),
            depth,
            parent_tx: None,
            priority,
            path: vec![address.to_lowercase()],
        }
    }

    #[test]
    fn pops_smallest_depth_first() {
        let mut frontier = Frontier::new();
        frontier.push(node(2, 0, "b"));
        frontier.push(node(0, 0, "a"));
        let batch = frontier.pop_layer(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].address, "a");
    }

    #[test]
    fn within_a_layer_higher_priority_pops_first() {
        let mut frontier = Frontier::new();
        frontier.push(node(0, 0, "low"));
        frontier.push(node(0, 10, "high"));
        let batch = frontier.pop_layer(10);
        assert_eq!(batch[0].address, "high");
        assert_eq!(batch[1].address, "low");
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut frontier = Frontier::new();
        frontier.push(node(0, 0, "first"));
        frontier.push(node(0, 0, "second"));
        let batch = frontier.pop_layer(10);
        assert_eq!(batch[0].address, "first");
        assert_eq!(batch[1].address, "second");
    }

    #[test]
    fn batch_cap_limits_pop_within_one_layer() {
        let mut frontier = Frontier::new();
        for i in 0..5 {
            frontier.push(node(0, 0, &format!("addr{i}")));
        }
        let batch = frontier.pop_layer(3);
        assert_eq!(batch.len(), 3);
        assert_eq!(frontier.pop_layer(10).len(), 2);
    }

    #[test]
    fn does_not_pop_past_the_current_layer() {
        let mut frontier = Frontier::new();
        frontier.push(node(0, 0, "a"));
        frontier.push(node(1, 0, "b"));
        let batch = frontier.pop_layer(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].address, "a");
    }
}
