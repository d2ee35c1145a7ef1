use std::sync::{Arc, RwLock};

use crate::auction::Auction;
use crate::point::Point;

/// Shared handle to a node. Cloning is cheap (reference count bump); agent
/// identity never flows back through this handle, only through the string
/// `bidder` ids recorded in a node's [`Auction`].
pub type NodePtr = Arc<Node>;

/// Parking restriction at a cell, used both by map generation (elevator
/// cells are `NoStopping`) and by [`crate::Graph`] consumers that reject
/// unparkable destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeState {
    Default = 0,
    NoParking = 1,
    NoStopping = 2,
}

/// A single graph cell.
///
/// `edges` and `auction` use interior mutability because nodes are built
/// incrementally (edges are wired after every node exists) and shared
/// across planner threads (the auction book is mutated only while the
/// caller holds the coarser `MultiPathPlanner` write lock, but the borrow
/// checker still needs a lock type here since many `Arc<Node>` clones are
/// live at once).
pub struct Node {
    pub id: u64,
    pub position: Point,
    pub state: NodeState,
    /// Marks an elevator cell (the original's `custom_data` flag).
    pub elevator: bool,
    edges: RwLock<Vec<NodePtr>>,
    pub auction: RwLock<Auction>,
}

impl Node {
    pub(crate) fn new(id: u64, position: Point, state: NodeState, elevator: bool) -> Self {
        Self {
            id,
            position,
            state,
            elevator,
            edges: RwLock::new(Vec::new()),
            auction: RwLock::new(Auction::new()),
        }
    }

    pub(crate) fn push_edge(&self, neighbor: NodePtr) {
        self.edges.write().expect("node edge lock poisoned").push(neighbor);
    }

    /// Neighboring nodes reachable by a single hop.
    pub fn edges(&self) -> Vec<NodePtr> {
        self.edges.read().expect("node edge lock poisoned").clone()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("state", &self.state)
            .field("elevator", &self.elevator)
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
