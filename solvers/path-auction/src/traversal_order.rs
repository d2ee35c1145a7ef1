use crate::sync::PathSync;

/// Linearizes bin-move dependencies from a settled [`PathSync`] into an
/// order safe to execute one bin at a time: an agent only appears once
/// every agent blocking it has already appeared.
///
/// Iterative DFS with a two-visit scheme (spec §4.5): an id is pushed to the
/// stack, and only emitted to the output the *second* time it's popped to
/// the top with `visit_count == 1` — by then every dependency it pushed on
/// its first visit has been fully resolved (itself revisited twice, or
/// trivial).
pub struct TraversalOrderResolver;

impl TraversalOrderResolver {
    /// `agent_ids` must be the full set of agent ids known to `path_sync`,
    /// addressed as `0..agent_ids` (bin ids are small dense integers).
    pub fn resolve(path_sync: &PathSync, agent_count: usize) -> Vec<usize> {
        if agent_count == 0 {
            return Vec::new();
        }

        let mut visit_count = vec![0u8; agent_count];
        let mut stack: Vec<usize> = Vec::with_capacity(agent_count * 2);
        // Descending order so id 0 is processed first by pop (stack is LIFO).
        for id in (0..agent_count).rev() {
            stack.push(id);
        }

        let mut output = Vec::new();

        while let Some(&i) = stack.last() {
            let agent_id = i.to_string();
            let path_len = path_sync.path_for(&agent_id).map(|p| p.len()).unwrap_or(0);

            if visit_count[i] > 0 {
                stack.pop();
            } else {
                let status = path_sync.check_wait_status(&agent_id);
                if status.blocked_progress < path_len {
                    if let Some(path) = path_sync.path_for(&agent_id) {
                        for visit in path.iter().rev() {
                            let higher = visit
                                .node
                                .auction
                                .read()
                                .expect("auction lock poisoned")
                                .higher_bid(visit.price)
                                .map(|(_, bid)| bid.bidder.clone());
                            if let Some(bidder) = higher {
                                if let Ok(d) = bidder.parse::<usize>() {
                                    if d < agent_count && visit_count[d] == 0 {
                                        stack.push(d);
                                    }
                                }
                            }
                        }
                    }
                }
            }

            // Fires on the *second* time `i` reaches the top (visit_count
            // was left at 1 by the first pass), regardless of whether this
            // pass popped it or pushed fresh dependencies on top of it.
            if visit_count[i] == 1 && path_len > 1 {
                output.push(i);
            }
            visit_count[i] = visit_count[i].saturating_add(1);
        }

        output
    }
}
