use crate::node::NodePtr;

/// One stop along a path: the node, the price bid (committed or tentative)
/// at that node, and the heuristic cost estimate remaining from there.
#[derive(Debug, Clone)]
pub struct Visit {
    pub node: NodePtr,
    pub price: f32,
    pub cost_estimate: f32,
}

impl Visit {
    pub fn new(node: NodePtr, price: f32, cost_estimate: f32) -> Self {
        Self { node, price, cost_estimate }
    }
}

/// An ordered sequence of visits. The front is the agent's current source;
/// the back is its destination (or a fallback divert point). A path with
/// fewer than two visits means no motion is planned.
pub type Path = Vec<Visit>;

/// Index of the first [`Visit`] in `path` whose node matches `node`, if any.
pub fn find_node_index(path: &Path, node: &NodePtr) -> Option<usize> {
    path.iter().position(|v| v.node.id == node.id)
}
