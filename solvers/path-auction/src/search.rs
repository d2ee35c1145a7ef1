use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use auction_graph::{NodePtr, NodeState, Path, Visit};

use crate::error::PathSearchError;

/// `travel_time(prev, cur, next)` — cost of the hop from `cur` to `next`,
/// optionally aware of where the path came from (`prev`). Modeled as a
/// boxed closure so callers (map generators, tests) can supply anything
/// from a flat unit-cost grid to the elevator-aware cost in
/// `warehouse-router`.
pub type TravelTimeFn = Arc<dyn Fn(Option<&NodePtr>, &NodePtr, &NodePtr) -> f32 + Send + Sync>;

#[derive(Clone)]
pub struct Config {
    pub agent_id: String,
    pub price_increment: f32,
    pub travel_time: TravelTimeFn,
}

impl Config {
    pub fn new(agent_id: impl Into<String>, price_increment: f32, travel_time: TravelTimeFn) -> Self {
        Self { agent_id: agent_id.into(), price_increment, travel_time }
    }
}

/// Single-agent auction-aware shortest path search.
///
/// Owns a destination set, a duration cap, and a cost-estimate cache keyed
/// by node id (the "resetCostEstimates" heuristic cache from spec.md §4.1).
pub struct PathSearch {
    config: Config,
    destinations: Vec<NodePtr>,
    duration: f32,
    cost_cache: HashMap<u64, f32>,
}

#[derive(Clone)]
struct Frontier {
    node: NodePtr,
    came_from: Option<NodePtr>,
    g_cost: f32,
    f_cost: f32,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost
    }
}
impl Eq for Frontier {}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse: BinaryHeap is a max-heap, we want lowest f_cost first.
        other.f_cost.partial_cmp(&self.f_cost).unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl PathSearch {
    pub fn new(config: Config) -> Self {
        Self { config, destinations: Vec::new(), duration: f32::MAX, cost_cache: HashMap::new() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// Install the goal set. Empty destination sets are rejected: a bin or
    /// robot with nothing to reach can't be scheduled.
    pub fn set_destinations(
        &mut self,
        dst: Vec<NodePtr>,
        duration: f32,
    ) -> Result<(), PathSearchError> {
        if dst.is_empty() {
            return Err(PathSearchError::NoDestinations);
        }
        self.destinations = dst;
        self.duration = duration;
        Ok(())
    }

    pub fn destinations(&self) -> &[NodePtr] {
        &self.destinations
    }

    /// Heuristic distance from `node` to the nearest destination.
    fn heuristic(&self, node: &NodePtr) -> f32 {
        self.destinations
            .iter()
            .map(|d| node.position.manhattan_2d(&d.position) + (node.position.z - d.position.z).abs())
            .fold(f32::MAX, f32::min)
    }

    fn cached_heuristic(&mut self, node: &NodePtr) -> f32 {
        if let Some(&v) = self.cost_cache.get(&node.id) {
            return v;
        }
        let h = self.heuristic(node);
        self.cost_cache.insert(node.id, h);
        h
    }

    /// Choose the best start among `candidates` — the one with the lowest
    /// cached cost estimate to the destination set.
    pub fn select_source(&mut self, candidates: &[NodePtr]) -> Visit {
        let mut best: Option<(NodePtr, f32)> = None;
        for c in candidates {
            let h = self.cached_heuristic(c);
            if best.as_ref().map(|(_, bh)| h < *bh).unwrap_or(true) {
                best = Some((c.clone(), h));
            }
        }
        let (node, h) = best.expect("select_source requires at least one candidate");
        Visit::new(node, 0.0, h)
    }

    pub fn reset_cost_estimates(&mut self) {
        self.cost_cache.clear();
    }

    fn is_destination(&self, node: &NodePtr) -> bool {
        self.destinations.iter().any(|d| d.id == node.id)
    }

    /// Contention penalty for entering `node` at `arrival_price`: if
    /// another agent already holds the lowest bid below our arrival price,
    /// we pay one extra `price_increment` per contested hop. This steers
    /// the search around busy cells without hard-blocking them — the
    /// auction settles final priority via `PathSync::update_path`.
    fn contention_cost(&self, node: &NodePtr, arrival_price: f32) -> f32 {
        let auction = node.auction.read().expect("auction lock poisoned");
        match auction.lowest() {
            Some((price, bid)) if bid.bidder != self.config.agent_id && price < arrival_price => {
                self.config.price_increment
            }
            _ => 0.0,
        }
    }

    /// Refine `path` in place with up to `iterations` expansion steps.
    ///
    /// On success the path runs from its existing front to a destination
    /// node and `Success` is returned. If the budget runs out first, the
    /// best partial frontier within `fallback_cost` becomes the new path
    /// tail (`FallbackDiverted`); if even that isn't available the path is
    /// left untouched at the source and `IterationsReached` is returned.
    pub fn iterate(
        &mut self,
        path: &mut Path,
        iterations: usize,
        fallback_cost: f32,
    ) -> PathSearchError {
        if self.destinations.is_empty() {
            return PathSearchError::NoDestinations;
        }
        let Some(source) = path.first().map(|v| v.node.clone()) else {
            return PathSearchError::InvalidConfig("iterate called with an empty path");
        };

        if self.is_destination(&source) {
            path.truncate(1);
            return PathSearchError::Success;
        }

        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<u64, f32> = HashMap::new();
        let mut came_from: HashMap<u64, (NodePtr, NodePtr)> = HashMap::new();

        best_g.insert(source.id, 0.0);
        open.push(Frontier {
            node: source.clone(),
            came_from: None,
            g_cost: 0.0,
            f_cost: self.cached_heuristic(&source),
        });

        let mut best_partial: Option<(NodePtr, f32)> = Some((source.clone(), 0.0));
        let mut budget = iterations.max(1);

        while let (Some(current), true) = (open.pop(), budget > 0) {
            budget -= 1;
            if current.g_cost
                > best_g.get(&current.node.id).copied().unwrap_or(f32::MAX) + f32::EPSILON
            {
                continue;
            }

            if best_partial
                .as_ref()
                .map(|(_, g)| current.g_cost <= *g || current.g_cost <= fallback_cost)
                .unwrap_or(true)
                && current.g_cost <= fallback_cost
            {
                best_partial = Some((current.node.clone(), current.g_cost));
            }

            if self.is_destination(&current.node) {
                return self.commit_path(path, &came_from, &current.node, current.g_cost);
            }

            let prev_ref = current.came_from.as_ref();
            for neighbor in current.node.edges() {
                let hop = (self.config.travel_time)(prev_ref, &current.node, &neighbor);
                let arrival = current.g_cost + hop;
                let contention = self.contention_cost(&neighbor, arrival);
                let tentative = arrival + contention;
                if tentative < best_g.get(&neighbor.id).copied().unwrap_or(f32::MAX) {
                    best_g.insert(neighbor.id, tentative);
                    came_from.insert(neighbor.id, (current.node.clone(), neighbor.clone()));
                    let h = self.cached_heuristic(&neighbor);
                    open.push(Frontier {
                        node: neighbor.clone(),
                        came_from: Some(current.node.clone()),
                        g_cost: tentative,
                        f_cost: tentative + h,
                    });
                }
            }
        }

        // Budget exhausted (or graph exhausted) without reaching a
        // destination. Fall back to the best frontier within cost.
        match best_partial {
            Some((node, cost)) if node.id != source.id && cost <= fallback_cost => {
                self.commit_path(path, &came_from, &node, cost);
                PathSearchError::FallbackDiverted
            }
            _ => {
                path.truncate(1);
                PathSearchError::IterationsReached
            }
        }
    }

    /// Reconstruct the winning route from `came_from`, place this agent's
    /// bid at each visited node's arrival price, and overwrite `path`.
    fn commit_path(
        &self,
        path: &mut Path,
        came_from: &HashMap<u64, (NodePtr, NodePtr)>,
        end: &NodePtr,
        end_cost: f32,
    ) -> PathSearchError {
        let mut nodes = vec![end.clone()];
        let mut cur = end.clone();
        while let Some((prev, _)) = came_from.get(&cur.id) {
            nodes.push(prev.clone());
            cur = prev.clone();
        }
        nodes.reverse();

        // Recompute per-node arrival price along the reconstructed route
        // (cheap: same travel_time calls, now in forward order) so every
        // intermediate visit gets a real price, not just the endpoint.
        let mut visits = Vec::with_capacity(nodes.len());
        let mut acc = 0.0f32;
        let mut prev_node: Option<NodePtr> = None;
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                let hop = (self.config.travel_time)(prev_node.as_ref(), &nodes[i - 1], node);
                acc += hop;
            }
            let h = self.heuristic(node);
            visits.push(Visit::new(node.clone(), acc, h));
            prev_node = if i == 0 { None } else { Some(nodes[i - 1].clone()) };
        }
        if let Some(last) = visits.last_mut() {
            last.price = end_cost;
        }

        for v in &visits {
            let mut auction = v.node.auction.write().expect("auction lock poisoned");
            auction.place_bid(v.price, self.config.agent_id.clone());
        }

        *path = visits;
        PathSearchError::Success
    }
}
