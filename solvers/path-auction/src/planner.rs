use auction_graph::{NodePtr, Path, Visit};

use crate::error::PathSearchError;
use crate::search::PathSearch;

/// Arguments controlling one `plan`/`replan` call.
#[derive(Clone)]
pub struct PlanArgs {
    pub src: Vec<NodePtr>,
    pub iterations: usize,
    pub fallback_cost: f32,
}

/// Wraps a [`PathSearch`] together with the path it currently owns.
pub struct PathPlanner {
    path_search: PathSearch,
    path: Path,
}

impl PathPlanner {
    pub fn new(path_search: PathSearch) -> Self {
        Self { path_search, path: Vec::new() }
    }

    pub fn path_search(&self) -> &PathSearch {
        &self.path_search
    }

    pub fn path_search_mut(&mut self) -> &mut PathSearch {
        &mut self.path_search
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path_search.agent_id()
    }

    /// Set destinations, seed the path at the best candidate source, and run
    /// one `iterate` batch.
    pub fn plan(
        &mut self,
        args: &PlanArgs,
        dst: Vec<NodePtr>,
        duration: f32,
    ) -> PathSearchError {
        if let Err(e) = self.path_search.set_destinations(dst, duration) {
            return e;
        }
        let source = self.path_search.select_source(&args.src);
        self.path = vec![source];
        self.path_search.iterate(&mut self.path, args.iterations, args.fallback_cost)
    }

    /// Re-seed from a (possibly new) source and extend the existing path.
    pub fn replan(&mut self, args: &PlanArgs) -> PathSearchError {
        let src_visit = if args.src.len() > 1 {
            self.path_search.select_source(&args.src)
        } else {
            Visit::new(args.src[0].clone(), 0.0, 0.0)
        };

        let found = self.path.iter().position(|v| v.node.id == src_visit.node.id);
        match found {
            Some(idx) => {
                self.path.drain(0..idx);
            }
            None => {
                self.path = vec![src_visit];
            }
        }

        let mut err = self.path_search.iterate(&mut self.path, args.iterations, args.fallback_cost);
        if err > PathSearchError::FallbackDiverted {
            self.path_search.reset_cost_estimates();
            err = self.path_search.iterate(&mut self.path, args.iterations, args.fallback_cost);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Config;
    use auction_graph::{Graph, NodeState, Point};
    use std::sync::Arc;

    fn unit_time() -> crate::search::TravelTimeFn {
        Arc::new(|_prev, _cur, _next| 1.0)
    }

    #[test]
    fn replan_front_matches_selected_source() {
        let mut g = Graph::new();
        let a = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let b = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let c = g.insert_node(Point::new(2.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        g.connect(&a, &b);
        g.connect(&b, &c);

        let mut planner = PathPlanner::new(PathSearch::new(Config::new("a", 1.0, unit_time())));
        let args = PlanArgs { src: vec![a.clone()], iterations: 20, fallback_cost: f32::MAX };
        planner.plan(&args, vec![c.clone()], f32::MAX);
        assert_eq!(planner.path().first().unwrap().node.id, a.id);
        assert_eq!(planner.path().last().unwrap().node.id, c.id);

        // Replan from the midpoint: front must be exactly the selected source.
        let replan_args = PlanArgs { src: vec![b.clone()], iterations: 20, fallback_cost: f32::MAX };
        planner.replan(&replan_args);
        assert_eq!(planner.path().first().unwrap().node.id, b.id);
    }
}
