//! Coordinator-level tests: sequential/parallel convergence and the
//! determinism law from spec §8 ("sequential runs are bytewise identical").

use std::sync::Arc;

use auction_graph::{Graph, NodeState, NodePtr, Point};
use path_auction::{Config, MultiPathPlanner, MultiPlannerConfig, PathSearchError, PlanArgs, Request, TravelTimeFn};
use pretty_assertions::assert_eq;

fn unit_time() -> TravelTimeFn {
    Arc::new(|_prev, _cur, _next| 1.0)
}

fn grid(n: usize) -> (Graph, Vec<NodePtr>) {
    let mut g = Graph::new();
    let mut nodes = Vec::new();
    for i in 0..n {
        for j in 0..n {
            nodes.push(g.insert_node(Point::new(i as f32, j as f32, 0.0), NodeState::Default, false).unwrap());
        }
    }
    for i in 0..n {
        for j in 0..n {
            let here = &nodes[i * n + j];
            if i + 1 < n {
                g.connect(here, &nodes[(i + 1) * n + j]);
            }
            if j + 1 < n {
                g.connect(here, &nodes[i * n + j + 1]);
            }
        }
    }
    (g, nodes)
}

fn request(id: &str, src: NodePtr, dst: NodePtr) -> Request {
    Request {
        dst: vec![dst],
        duration: f32::MAX,
        search_config: Config::new(id, 1.0, unit_time()),
        plan_args: PlanArgs { src: vec![src], iterations: 200, fallback_cost: f32::MAX },
    }
}

#[test]
fn single_agent_converges_gracefully() {
    let (_g, nodes) = grid(4);
    let requests = vec![request("0", nodes[0].clone(), nodes[15].clone())];
    let mut mpp = MultiPathPlanner::new();
    let config = MultiPlannerConfig { rounds: 5, n_threads: 1, allow_indefinite_block: true };
    let err = mpp.plan(&config, &requests);
    assert_eq!(err, PathSearchError::Success);
    let path = mpp.path_sync().path_for("0").unwrap();
    assert_eq!(path.first().unwrap().node.id, nodes[0].id);
    assert_eq!(path.last().unwrap().node.id, nodes[15].id);
}

#[test]
fn two_agents_with_crossing_goals_converge_without_deadlock() {
    let (_g, nodes) = grid(4);
    let requests = vec![
        request("0", nodes[0].clone(), nodes[15].clone()),
        request("1", nodes[15].clone(), nodes[0].clone()),
    ];
    let mut mpp = MultiPathPlanner::new();
    let config = MultiPlannerConfig { rounds: 20, n_threads: 1, allow_indefinite_block: true };
    let err = mpp.plan(&config, &requests);
    assert_eq!(err, PathSearchError::Success);
}

#[test]
fn sequential_runs_are_deterministic() {
    let (_g1, nodes1) = grid(4);
    let requests1 = vec![
        request("0", nodes1[0].clone(), nodes1[15].clone()),
        request("1", nodes1[15].clone(), nodes1[0].clone()),
    ];
    let mut mpp1 = MultiPathPlanner::new();
    let config = MultiPlannerConfig { rounds: 20, n_threads: 1, allow_indefinite_block: true };
    mpp1.plan(&config, &requests1);

    let (_g2, nodes2) = grid(4);
    let requests2 = vec![
        request("0", nodes2[0].clone(), nodes2[15].clone()),
        request("1", nodes2[15].clone(), nodes2[0].clone()),
    ];
    let mut mpp2 = MultiPathPlanner::new();
    mpp2.plan(&config, &requests2);

    let p1 = mpp1.path_sync().path_for("0").unwrap();
    let p2 = mpp2.path_sync().path_for("0").unwrap();
    assert_eq!(p1.len(), p2.len());
    for (a, b) in p1.iter().zip(p2.iter()) {
        assert_eq!(a.node.position.x, b.node.position.x);
        assert_eq!(a.node.position.y, b.node.position.y);
        assert_eq!(a.price, b.price);
    }
}

#[test]
fn parallel_matches_sequential_on_independent_agents() {
    let (_g1, nodes1) = grid(4);
    let requests1 = vec![request("0", nodes1[0].clone(), nodes1[15].clone())];
    let mut mpp1 = MultiPathPlanner::new();
    mpp1.plan(&MultiPlannerConfig { rounds: 5, n_threads: 1, allow_indefinite_block: true }, &requests1);

    let (_g2, nodes2) = grid(4);
    let requests2 = vec![request("0", nodes2[0].clone(), nodes2[15].clone())];
    let mut mpp2 = MultiPathPlanner::new();
    mpp2.plan(&MultiPlannerConfig { rounds: 5, n_threads: 4, allow_indefinite_block: true }, &requests2);

    let p1 = mpp1.path_sync().path_for("0").unwrap();
    let p2 = mpp2.path_sync().path_for("0").unwrap();
    assert_eq!(p1.len(), p2.len());
}

#[test]
fn residue_class_stepping_handles_non_dividing_thread_count() {
    // 5 agents across 3 threads: residue classes {0,3}, {1,4}, {2} — the
    // uneven class must not starve or deadlock.
    let (_g, nodes) = grid(4);
    let corners = [nodes[0].clone(), nodes[3].clone(), nodes[12].clone(), nodes[15].clone(), nodes[5].clone()];
    let requests: Vec<Request> = (0..5)
        .map(|i| request(&i.to_string(), corners[i].clone(), corners[(i + 1) % 5].clone()))
        .collect();
    let mut mpp = MultiPathPlanner::new();
    let config = MultiPlannerConfig { rounds: 30, n_threads: 3, allow_indefinite_block: true };
    let err = mpp.plan(&config, &requests);
    assert!(err == PathSearchError::Success || err == PathSearchError::IterationsReached);
    assert_eq!(mpp.results().len(), 5);
}
