use std::collections::HashMap;

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::node::{Node, NodePtr, NodeState};
use crate::point::Point;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("a node already exists at this position")]
    PositionOccupied,
}

type PositionKey = (OrderedFloat<f32>, OrderedFloat<f32>, OrderedFloat<f32>);

fn key(p: &Point) -> PositionKey {
    (OrderedFloat(p.x), OrderedFloat(p.y), OrderedFloat(p.z))
}

/// Arena owner of every [`Node`] for the lifetime of a solve call.
///
/// Planners never mutate the graph itself (only each node's own `auction`
/// field, through the `Arc<Node>` handles they hold) — insertion and wiring
/// happen once, up front, during map setup.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<NodePtr>,
    by_position: HashMap<PositionKey, NodePtr>,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.by_position.clear();
        self.next_id = 0;
    }

    /// Insert a new node at `point`. Errors if a node already occupies that
    /// exact position (call [`Graph::find_node`] and reuse the handle for
    /// elevator columns instead of inserting a duplicate).
    pub fn insert_node(
        &mut self,
        point: Point,
        state: NodeState,
        elevator: bool,
    ) -> Result<NodePtr, GraphError> {
        let k = key(&point);
        if self.by_position.contains_key(&k) {
            return Err(GraphError::PositionOccupied);
        }
        let id = self.next_id;
        self.next_id += 1;
        let node: NodePtr = std::sync::Arc::new(Node::new(id, point, state, elevator));
        self.nodes.push(node.clone());
        self.by_position.insert(k, node.clone());
        Ok(node)
    }

    /// Wire an undirected edge between two nodes already in the graph.
    pub fn connect(&self, a: &NodePtr, b: &NodePtr) {
        a.push_edge(b.clone());
        b.push_edge(a.clone());
    }

    pub fn find_node(&self, point: Point) -> Option<NodePtr> {
        self.by_position.get(&key(&point)).cloned()
    }

    pub fn get_nodes(&self) -> &[NodePtr] {
        &self.nodes
    }

    /// A fresh, bid-free graph with the same node positions/states and
    /// adjacency as `self`. Used by `warehouse-router`'s robot phase to
    /// build a scratch graph for a chunk's auction without carrying over
    /// bids from the bin phase or earlier chunks, and without depending on
    /// whatever generator config originally produced `self` (a map loaded
    /// from a saved document has no such config).
    pub fn clone_topology(&self) -> Graph {
        let mut out = Graph::new();
        let mut by_old_id = HashMap::with_capacity(self.nodes.len());
        for n in &self.nodes {
            let fresh = out
                .insert_node(n.position, n.state, n.elevator)
                .expect("source graph already guarantees unique positions");
            by_old_id.insert(n.id, fresh);
        }
        for n in &self.nodes {
            let here = &by_old_id[&n.id];
            for neighbor in n.edges() {
                if neighbor.id > n.id {
                    out.connect(here, &by_old_id[&neighbor.id]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find_roundtrip() {
        let mut g = Graph::new();
        let p = Point::new(1.0, 2.0, 0.0);
        let n = g.insert_node(p, NodeState::Default, false).unwrap();
        assert_eq!(g.find_node(p).unwrap().id, n.id);
        assert!(g.find_node(Point::new(9.0, 9.0, 0.0)).is_none());
    }

    #[test]
    fn duplicate_position_rejected() {
        let mut g = Graph::new();
        let p = Point::new(0.0, 0.0, 0.0);
        g.insert_node(p, NodeState::Default, false).unwrap();
        assert_eq!(
            g.insert_node(p, NodeState::Default, false).unwrap_err(),
            GraphError::PositionOccupied
        );
    }

    #[test]
    fn clone_topology_is_bid_free_and_matches_adjacency() {
        let mut g = Graph::new();
        let a = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let b = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let c = g.insert_node(Point::new(2.0, 0.0, 0.0), NodeState::NoParking, false).unwrap();
        g.connect(&a, &b);
        g.connect(&b, &c);
        a.auction.write().unwrap().place_bid(1.0, "agent");

        let clone = g.clone_topology();
        assert_eq!(clone.get_nodes().len(), 3);
        let clone_a = clone.find_node(Point::new(0.0, 0.0, 0.0)).unwrap();
        let clone_b = clone.find_node(Point::new(1.0, 0.0, 0.0)).unwrap();
        assert!(clone_a.auction.read().unwrap().is_empty());
        assert_eq!(clone_a.edges().len(), 1);
        assert_eq!(clone_b.edges().len(), 2);
        assert_eq!(clone.find_node(Point::new(2.0, 0.0, 0.0)).unwrap().state, NodeState::NoParking);
    }

    #[test]
    fn connect_is_undirected() {
        let mut g = Graph::new();
        let a = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let b = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        g.connect(&a, &b);
        assert_eq!(a.edges().len(), 1);
        assert_eq!(b.edges().len(), 1);
        assert_eq!(a.edges()[0].id, b.id);
    }
}
