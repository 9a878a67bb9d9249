use std::collections::BTreeSet;

use knapsack_choice::{Item, ItemId, NodeSpec, SearchGraph};
use proptest::prelude::*;

/// Reachable states, following the same expansion rule as the graph: a state
/// with at most one remaining item stops. A state is its committed sequence,
/// stably sorted by content, so only the relative order of identical items
/// tells two states apart.
fn reachable_states(pairs: &[(u64, u64)], capacity: u64) -> usize {
    let n = pairs.len();
    let mut seen = BTreeSet::new();
    let mut stack = vec![Vec::<usize>::new()];
    while let Some(path) = stack.pop() {
        if !seen.insert(path.clone()) {
            continue;
        }
        let used: u64 = path.iter().map(|&i| pairs[i].1).sum();
        if n - path.len() <= 1 {
            continue;
        }
        for i in (0..n).filter(|i| !path.contains(i)) {
            if used + pairs[i].1 <= capacity {
                let mut next = path.clone();
                next.push(i);
                next.sort_by_key(|&j| pairs[j]);
                stack.push(next);
            }
        }
    }
    seen.len()
}

fn build(pairs: &[(u64, u64)], capacity: u64) -> (SearchGraph, Vec<ItemId>) {
    let mut graph = SearchGraph::new();
    let items = Item::from_pairs(pairs).unwrap();
    let ids = items.iter().map(Item::id).collect();
    graph.build_root(items, capacity).unwrap();
    (graph, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_node_per_reachable_state(
        pairs in prop::collection::vec((0u64..20, 1u64..10), 0..=7),
        capacity in 0u64..40,
    ) {
        let (graph, _) = build(&pairs, capacity);
        prop_assert_eq!(graph.len(), reachable_states(&pairs, capacity));
    }

    #[test]
    fn rebuilding_the_root_adds_nothing(
        pairs in prop::collection::vec((0u64..20, 1u64..10), 0..=6),
        capacity in 0u64..30,
    ) {
        let (mut graph, ids) = build(&pairs, capacity);
        let before = graph.len();
        graph.create_or_get(NodeSpec::root(ids, capacity)).unwrap();
        prop_assert_eq!(graph.len(), before);
    }
}

#[test]
fn identical_items_split_by_order_distinct_items_merge() {
    // Two copies of (5, 2) and one (12, 8): {a, b} and {b, a} merge, while
    // {a, c} and {c, a} stay apart.
    let (graph, _) = build(&[(5, 2), (12, 8), (5, 2)], 19);
    assert_eq!(graph.len(), 8);
    assert_eq!(reachable_states(&[(5, 2), (12, 8), (5, 2)], 19), 8);
    let (graph_distinct, _) = build(&[(5, 2), (12, 8), (6, 2)], 19);
    assert_eq!(graph_distinct.len(), 7);
}

#[test]
fn every_child_is_registered_once() {
    let (graph, _) = build(&[(3, 1), (4, 1), (5, 1), (6, 1)], 3);
    let mut seen = BTreeSet::new();
    for node in graph.registry().iter() {
        assert!(seen.insert(node.id()));
        for &(_, child) in node.children() {
            assert!(graph.node(child).is_ok());
        }
    }
    assert_eq!(seen.len(), graph.len());
}

#[test]
fn identical_roots_merge_and_distinct_roots_stay_apart() {
    let pairs = [(3, 1), (4, 2), (5, 3)];
    let mut graph = SearchGraph::new();
    let first = graph.build_root(Item::from_pairs(&pairs).unwrap(), 4).unwrap();
    let before = graph.len();

    // Same content, fresh item instances: the root is found by content.
    let again = graph.build_root(Item::from_pairs(&pairs).unwrap(), 4).unwrap();
    assert_eq!(first, again);
    assert_eq!(graph.len(), before);

    let other = graph.build_root(Item::from_pairs(&pairs).unwrap(), 5).unwrap();
    assert_ne!(first, other);
    for node in graph.registry().iter() {
        match node.root() {
            Some(root) => assert!(root == first || root == other),
            None => assert!(node.id() == first || node.id() == other),
        }
    }
}
