//! Tests for the two-visit DFS traversal-order resolver (spec §4.5).

use auction_graph::{Graph, NodeState, Point, Visit};
use path_auction::{PathSync, TraversalOrderResolver};
use pretty_assertions::assert_eq;

#[test]
fn independent_agents_all_appear_once() {
    let mut g = Graph::new();
    let a0 = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
    let a1 = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();
    let b0 = g.insert_node(Point::new(0.0, 1.0, 0.0), NodeState::Default, false).unwrap();
    let b1 = g.insert_node(Point::new(1.0, 1.0, 0.0), NodeState::Default, false).unwrap();

    let mut path_sync = PathSync::new();
    path_sync.update_path("0", vec![Visit::new(a0, 0.0, 1.0), Visit::new(a1, 1.0, 0.0)], 1).unwrap();
    path_sync.update_path("1", vec![Visit::new(b0, 0.0, 1.0), Visit::new(b1, 1.0, 0.0)], 1).unwrap();

    let order = TraversalOrderResolver::resolve(&path_sync, 2);
    assert_eq!(order.len(), 2);
    assert!(order.contains(&0));
    assert!(order.contains(&1));
}

#[test]
fn trivial_paths_are_excluded() {
    let mut g = Graph::new();
    let a0 = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();

    let mut path_sync = PathSync::new();
    path_sync.update_path("0", vec![Visit::new(a0, 0.0, 0.0)], 1).unwrap();

    let order = TraversalOrderResolver::resolve(&path_sync, 1);
    assert!(order.is_empty());
}

#[test]
fn contended_node_resolves_without_looping_forever() {
    // Two agents hold bids at the same node at different prices; the
    // resolver must still terminate and emit every non-trivial path exactly
    // once.
    let mut g = Graph::new();
    let shared = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
    let far = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();

    let mut path_sync = PathSync::new();
    path_sync.update_path("1", vec![Visit::new(shared.clone(), 0.0, 0.0)], 1).unwrap();
    path_sync
        .update_path("0", vec![Visit::new(shared, 1.0, 1.0), Visit::new(far, 2.0, 0.0)], 1)
        .unwrap();

    let order = TraversalOrderResolver::resolve(&path_sync, 2);
    assert_eq!(order.iter().filter(|&&x| x == 0).count(), 1);
    assert!(order.contains(&0));
}

#[test]
fn no_duplicates_in_output() {
    let mut g = Graph::new();
    let nodes: Vec<_> = (0..6)
        .map(|i| g.insert_node(Point::new(i as f32, 0.0, 0.0), NodeState::Default, false).unwrap())
        .collect();
    for w in nodes.windows(2) {
        g.connect(&w[0], &w[1]);
    }

    let mut path_sync = PathSync::new();
    path_sync
        .update_path("0", vec![Visit::new(nodes[0].clone(), 0.0, 2.0), Visit::new(nodes[1].clone(), 1.0, 1.0)], 1)
        .unwrap();
    path_sync
        .update_path("1", vec![Visit::new(nodes[2].clone(), 0.0, 2.0), Visit::new(nodes[3].clone(), 1.0, 1.0)], 1)
        .unwrap();
    path_sync
        .update_path("2", vec![Visit::new(nodes[4].clone(), 0.0, 2.0), Visit::new(nodes[5].clone(), 1.0, 1.0)], 1)
        .unwrap();

    let order = TraversalOrderResolver::resolve(&path_sync, 3);
    let mut seen = std::collections::HashSet::new();
    for id in &order {
        assert!(seen.insert(*id), "duplicate id {id} in traversal order");
    }
}
