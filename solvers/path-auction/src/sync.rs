use std::collections::HashMap;

use auction_graph::Path;

use crate::error::PathSyncError;

/// Outcome of [`PathSync::check_wait_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus {
    pub error: PathSyncError,
    /// Index up to which the path advances before being blocked.
    /// `== path.len()` means unobstructed.
    pub blocked_progress: usize,
}

struct AgentEntry {
    path: Path,
    path_id: u64,
}

/// Shared store of the latest path per agent, plus cross-agent wait-status
/// queries used both by `MultiPathPlanner`'s satisfaction predicate and by
/// `TraversalOrderResolver`.
#[derive(Default)]
pub struct PathSync {
    agents: HashMap<String, AgentEntry>,
}

impl PathSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_paths(&mut self) {
        self.agents.clear();
    }

    pub fn path_for(&self, agent_id: &str) -> Option<&Path> {
        self.agents.get(agent_id).map(|e| &e.path)
    }

    /// Atomically replace `agent_id`'s stored path: bids are released from
    /// nodes no longer visited and placed on every newly visited node
    /// (idempotent where `PathSearch::iterate` already bid there). Rejects
    /// a stale `new_path_id` that doesn't strictly advance the agent's
    /// previous `path_id`.
    pub fn update_path(
        &mut self,
        agent_id: &str,
        path: Path,
        new_path_id: u64,
    ) -> Result<(), PathSyncError> {
        if let Some(existing) = self.agents.get(agent_id) {
            if new_path_id <= existing.path_id {
                return Err(PathSyncError::PathIdStale);
            }
        }

        let new_ids: std::collections::HashSet<u64> = path.iter().map(|v| v.node.id).collect();
        if let Some(existing) = self.agents.get(agent_id) {
            for visit in &existing.path {
                if !new_ids.contains(&visit.node.id) {
                    visit.node.auction.write().expect("auction lock poisoned").remove_bidder(agent_id);
                }
            }
        }
        for visit in &path {
            let mut auction = visit.node.auction.write().expect("auction lock poisoned");
            if auction.find(visit.price).map(|b| b.bidder.as_str()) != Some(agent_id) {
                auction.place_bid(visit.price, agent_id);
            }
        }

        self.agents.insert(agent_id.to_string(), AgentEntry { path, path_id: new_path_id });
        Ok(())
    }

    /// Evaluate collision-freedom and progress for `agent_id`'s current
    /// path against every other agent's current bids.
    pub fn check_wait_status(&self, agent_id: &str) -> WaitStatus {
        let Some(entry) = self.agents.get(agent_id) else {
            return WaitStatus { error: PathSyncError::AgentNotFound, blocked_progress: 0 };
        };
        let path = &entry.path;
        if path.is_empty() {
            return WaitStatus { error: PathSyncError::AgentNotFound, blocked_progress: 0 };
        }

        {
            let auction = path[0].node.auction.read().expect("auction lock poisoned");
            if let Some((_, lowest)) = auction.lowest() {
                if lowest.bidder != agent_id {
                    return WaitStatus { error: PathSyncError::SourceNodeOutbid, blocked_progress: 0 };
                }
            }
        }

        if path.len() == 1 {
            let auction = path[0].node.auction.read().expect("auction lock poisoned");
            let error = if auction.len() > 1 {
                PathSyncError::RemainingDurationInfinite
            } else {
                PathSyncError::Success
            };
            return WaitStatus { error, blocked_progress: path.len() };
        }

        for (i, visit) in path.iter().enumerate().skip(1) {
            let auction = visit.node.auction.read().expect("auction lock poisoned");
            let contested = auction
                .bids()
                .any(|(price, bid)| bid.bidder != agent_id && price < visit.price);
            if contested {
                return WaitStatus { error: PathSyncError::Success, blocked_progress: i };
            }
        }

        WaitStatus { error: PathSyncError::Success, blocked_progress: path.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_graph::{Graph, NodeState, Point, Visit};

    fn two_nodes() -> (Graph, auction_graph::NodePtr, auction_graph::NodePtr) {
        let mut g = Graph::new();
        let a = g.insert_node(Point::new(0.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        let b = g.insert_node(Point::new(1.0, 0.0, 0.0), NodeState::Default, false).unwrap();
        g.connect(&a, &b);
        (g, a, b)
    }

    #[test]
    fn update_then_status_is_success() {
        let (_g, a, b) = two_nodes();
        let mut sync = PathSync::new();
        let path = vec![Visit::new(a.clone(), 0.0, 1.0), Visit::new(b.clone(), 1.0, 0.0)];
        sync.update_path("agent-0", path, 1).unwrap();
        let status = sync.check_wait_status("agent-0");
        assert_eq!(status.error, PathSyncError::Success);
        assert_eq!(status.blocked_progress, 2);
    }

    #[test]
    fn stale_path_id_rejected() {
        let (_g, a, _b) = two_nodes();
        let mut sync = PathSync::new();
        let path = vec![Visit::new(a.clone(), 0.0, 0.0)];
        sync.update_path("agent-0", path.clone(), 5).unwrap();
        assert_eq!(sync.update_path("agent-0", path, 5).unwrap_err(), PathSyncError::PathIdStale);
    }

    #[test]
    fn camping_with_contention_is_remaining_duration_infinite() {
        let (_g, a, _b) = two_nodes();
        let mut sync = PathSync::new();
        sync.update_path("agent-0", vec![Visit::new(a.clone(), 0.0, 0.0)], 1).unwrap();
        // A second agent also wants node `a`, bidding above agent-0's price.
        a.auction.write().unwrap().place_bid(5.0, "agent-1");
        let status = sync.check_wait_status("agent-0");
        assert_eq!(status.error, PathSyncError::RemainingDurationInfinite);
        assert_eq!(status.blocked_progress, 1);
    }

    #[test]
    fn missing_agent_is_agent_not_found() {
        let sync = PathSync::new();
        let status = sync.check_wait_status("ghost");
        assert_eq!(status.error, PathSyncError::AgentNotFound);
    }
}
