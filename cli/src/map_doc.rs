//! JSON schema for saving/loading a generated map and bin requests (spec
//! §6 "Map/request JSON schema"), so `generate-map` and `solve` can be run
//! as separate, reproducible CLI invocations.

use std::collections::HashMap;

use auction_graph::{Graph, NodePtr, NodeState, Point};
use serde::{Deserialize, Serialize};
use warehouse_router::bin_router::BinRequest;
use warehouse_router::MapGen;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: u64,
    pub position: [f32; 3],
    pub state: u8,
    pub elevator: bool,
    /// Neighbor ids greater than `id`; the other direction is implied
    /// (the graph is undirected) and reconstructed on load.
    pub edges: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    pub nodes: Vec<NodeDocument>,
    pub bins: Vec<[f32; 3]>,
    pub bots: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDocument {
    pub bin_id: usize,
    pub col: usize,
    pub row: usize,
    pub floor: usize,
}

impl From<RequestDocument> for BinRequest {
    fn from(r: RequestDocument) -> Self {
        BinRequest { bin_id: r.bin_id, col: r.col, row: r.row, floor: r.floor }
    }
}

fn state_to_u8(state: NodeState) -> u8 {
    match state {
        NodeState::Default => 0,
        NodeState::NoParking => 1,
        NodeState::NoStopping => 2,
    }
}

fn u8_to_state(v: u8) -> Result<NodeState, String> {
    match v {
        0 => Ok(NodeState::Default),
        1 => Ok(NodeState::NoParking),
        2 => Ok(NodeState::NoStopping),
        other => Err(format!("unknown node state discriminant {other}")),
    }
}

fn position_of(p: Point) -> [f32; 3] {
    [p.x, p.y, p.z]
}

/// Serialize a generated map: every node (with only its "greater-id"
/// neighbors, so each undirected edge appears once), plus bin/bot
/// positions.
pub fn to_document(map: &MapGen) -> MapDocument {
    let nodes = map
        .graph
        .get_nodes()
        .iter()
        .map(|n| NodeDocument {
            id: n.id,
            position: position_of(n.position),
            state: state_to_u8(n.state),
            elevator: n.elevator,
            edges: n.edges().iter().map(|e| e.id).filter(|&eid| eid > n.id).collect(),
        })
        .collect();

    MapDocument {
        nodes,
        bins: map.bins.iter().map(|n| position_of(n.position)).collect(),
        bots: map.bots.iter().map(|n| position_of(n.position)).collect(),
    }
}

/// Reconstruct a [`MapGen`] from a loaded [`MapDocument`]. Nodes must be
/// listed in ascending `id` order (exactly how [`to_document`] writes
/// them) since ids are reassigned sequentially on insertion.
pub fn from_document(doc: &MapDocument) -> Result<MapGen, String> {
    let mut graph = Graph::new();
    let mut by_doc_id: HashMap<u64, NodePtr> = HashMap::new();

    for doc_node in &doc.nodes {
        let state = u8_to_state(doc_node.state)?;
        let [x, y, z] = doc_node.position;
        let node = graph
            .insert_node(Point::new(x, y, z), state, doc_node.elevator)
            .map_err(|e| format!("duplicate node position in map document: {e}"))?;
        by_doc_id.insert(doc_node.id, node);
    }

    for doc_node in &doc.nodes {
        let here = by_doc_id
            .get(&doc_node.id)
            .ok_or_else(|| format!("node {} missing after insertion", doc_node.id))?
            .clone();
        for &neighbor_id in &doc_node.edges {
            let neighbor = by_doc_id
                .get(&neighbor_id)
                .ok_or_else(|| format!("edge references unknown node {neighbor_id}"))?
                .clone();
            graph.connect(&here, &neighbor);
        }
    }

    let elevators = doc
        .nodes
        .iter()
        .filter(|n| n.elevator)
        .map(|n| by_doc_id.get(&n.id).expect("inserted above").clone())
        .collect();

    let find = |pos: [f32; 3]| -> Result<NodePtr, String> {
        let [x, y, z] = pos;
        graph
            .find_node(Point::new(x, y, z))
            .ok_or_else(|| format!("no node at bin/bot position ({x}, {y}, {z})"))
    };
    let bins = doc.bins.iter().map(|&p| find(p)).collect::<Result<Vec<_>, _>>()?;
    let bots = doc.bots.iter().map(|&p| find(p)).collect::<Result<Vec<_>, _>>()?;

    Ok(MapGen { graph, elevators, bins, bots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse_router::map_gen::Config as MapGenConfig;

    #[test]
    fn round_trips_through_json() {
        let config = MapGenConfig { rows: 3, cols: 3, floors: 2, n_bins: 2, n_bots: 2, elevators: vec![(1, 1)], seed: 11 };
        let map = MapGen::new(&config);
        let doc = to_document(&map);

        let json = serde_json::to_string(&doc).unwrap();
        let parsed: MapDocument = serde_json::from_str(&json).unwrap();
        let rebuilt = from_document(&parsed).unwrap();

        assert_eq!(rebuilt.graph.get_nodes().len(), map.graph.get_nodes().len());
        assert_eq!(rebuilt.bins.len(), map.bins.len());
        assert_eq!(rebuilt.elevators.len(), map.elevators.len());
        for n in rebuilt.graph.get_nodes() {
            assert_eq!(n.edges().len(), map.graph.get_nodes()[n.id as usize].edges().len());
        }
    }
}
