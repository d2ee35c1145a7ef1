use auction_graph::{Graph, NodePtr, NodeState, Point};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Configuration for a generated warehouse grid.
#[derive(Debug, Clone)]
pub struct Config {
    pub rows: usize,
    pub cols: usize,
    pub floors: usize,
    pub n_bins: usize,
    pub n_bots: usize,
    /// `(col, row)` positions carrying an elevator column.
    pub elevators: Vec<(usize, usize)>,
    /// The original generator draws from OS entropy; we require a seed so
    /// the same config always yields the same map, which downstream tests
    /// (and the determinism law in spec §8) depend on.
    pub seed: u64,
}

/// A generated 3D grid graph plus the bin and bot positions sampled onto it.
///
/// Elevator columns collapse to a single physical node (shared across every
/// floor, pinned at `z == 0`, flagged [`NodeState::NoStopping`]) so a robot
/// crossing floors always passes through the same contended cell.
pub struct MapGen {
    pub graph: Graph,
    pub elevators: Vec<NodePtr>,
    pub bins: Vec<NodePtr>,
    pub bots: Vec<NodePtr>,
}

impl MapGen {
    pub fn new(config: &Config) -> Self {
        let mut graph = Graph::new();
        let mut elevators = Vec::new();

        let has_elevator = |col: usize, row: usize| config.elevators.contains(&(col, row));
        let idx = |col: usize, row: usize, flr: usize| col + row * config.cols + flr * config.cols * config.rows;

        let mut nodes: Vec<NodePtr> = Vec::with_capacity(config.rows * config.cols * config.floors);
        for flr in 0..config.floors {
            for row in 0..config.rows {
                for col in 0..config.cols {
                    let node = if has_elevator(col, row) {
                        if flr == 0 {
                            let n = graph
                                .insert_node(Point::new(col as f32, row as f32, 0.0), NodeState::NoStopping, true)
                                .expect("grid positions are unique by construction");
                            elevators.push(n.clone());
                            n
                        } else {
                            nodes[idx(col, row, 0)].clone()
                        }
                    } else {
                        graph
                            .insert_node(Point::new(col as f32, row as f32, flr as f32), NodeState::Default, false)
                            .expect("grid positions are unique by construction")
                    };
                    nodes.push(node);
                }
            }
        }

        for flr in 0..config.floors {
            for row in 0..config.rows {
                for col in 0..config.cols {
                    let here = nodes[idx(col, row, flr)].clone();
                    if col > 0 {
                        graph.connect(&here, &nodes[idx(col - 1, row, flr)]);
                    }
                    if row > 0 {
                        graph.connect(&here, &nodes[idx(col, row - 1, flr)]);
                    }
                }
            }
        }

        // Elevator nodes were wired and sampled already at their first
        // occurrence; drop the later-floor aliases so each physical node
        // appears once in the pool eligible for bin/bot placement.
        let mut seen = std::collections::HashSet::new();
        nodes.retain(|n| seen.insert(n.id));
        nodes.retain(|n| n.state != NodeState::NoStopping);

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        nodes.shuffle(&mut rng);

        let n_bins = config.n_bins.min(nodes.len());
        let n_bots = config.n_bots.min(nodes.len() - n_bins);

        let bots = nodes.split_off(nodes.len() - n_bots);
        nodes.truncate(n_bins);

        Self { graph, elevators, bins: nodes, bots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_expected_node_count_minus_elevator_aliases() {
        let config = Config { rows: 3, cols: 3, floors: 2, n_bins: 0, n_bots: 0, elevators: vec![(0, 0)], seed: 1 };
        let map = MapGen::new(&config);
        // 3*3*2 = 18 grid cells, minus 1 because the elevator column's
        // second floor reuses the first floor's node instead of inserting
        // a new one.
        assert_eq!(map.graph.get_nodes().len(), 17);
        assert_eq!(map.elevators.len(), 1);
        assert_eq!(map.elevators[0].position.z, 0.0);
    }

    #[test]
    fn same_seed_yields_same_bin_bot_placement() {
        let config = Config { rows: 4, cols: 4, floors: 1, n_bins: 3, n_bots: 2, elevators: vec![], seed: 42 };
        let a = MapGen::new(&config);
        let b = MapGen::new(&config);
        let a_positions: Vec<_> = a.bins.iter().map(|n| (n.position.x, n.position.y)).collect();
        let b_positions: Vec<_> = b.bins.iter().map(|n| (n.position.x, n.position.y)).collect();
        assert_eq!(a_positions, b_positions);
    }

    #[test]
    fn bins_and_bots_are_disjoint() {
        let config = Config { rows: 4, cols: 4, floors: 1, n_bins: 5, n_bots: 5, elevators: vec![], seed: 7 };
        let map = MapGen::new(&config);
        assert_eq!(map.bins.len(), 5);
        assert_eq!(map.bots.len(), 5);
        for bin in &map.bins {
            assert!(!map.bots.iter().any(|b| b.id == bin.id));
        }
    }
}
