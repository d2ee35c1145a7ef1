use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

use auction_graph::{NodePtr, NodeState};

use crate::error::{PathSearchError, PathSyncError};
use crate::planner::{PathPlanner, PlanArgs};
use crate::search::{self, PathSearch};
use crate::sync::PathSync;

/// One agent's planning request for a `MultiPathPlanner::plan` call.
#[derive(Clone)]
pub struct Request {
    pub dst: Vec<NodePtr>,
    pub duration: f32,
    pub search_config: search::Config,
    pub plan_args: PlanArgs,
}

/// Per-agent outcome of the most recent round.
#[derive(Debug, Clone, Copy)]
pub struct PlanResult {
    pub search_error: PathSearchError,
    pub sync_error: PathSyncError,
}

impl Default for PlanResult {
    fn default() -> Self {
        Self { search_error: PathSearchError::Success, sync_error: PathSyncError::Success }
    }
}

#[derive(Debug, Clone)]
pub struct MultiPlannerConfig {
    pub rounds: usize,
    pub n_threads: usize,
    pub allow_indefinite_block: bool,
}

impl Default for MultiPlannerConfig {
    fn default() -> Self {
        Self { rounds: 1, n_threads: 1, allow_indefinite_block: true }
    }
}

/// Orchestrates rounds of replans across N agents against a shared
/// [`PathSync`], optionally parallelized across worker threads.
#[derive(Default)]
pub struct MultiPathPlanner {
    path_sync: PathSync,
    results: Vec<PlanResult>,
}

impl MultiPathPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_sync(&self) -> &PathSync {
        &self.path_sync
    }

    pub fn results(&self) -> &[PlanResult] {
        &self.results
    }

    /// Run the coordinator to completion: set up one `PathPlanner` per
    /// request, then iterate rounds (sequentially, or across
    /// `config.n_threads` worker threads) until every agent is
    /// satisfactory, a fatal error occurs, or the round budget runs out.
    pub fn plan(&mut self, config: &MultiPlannerConfig, requests: &[Request]) -> PathSearchError {
        self.path_sync.clear_paths();
        self.results = vec![PlanResult::default(); requests.len()];
        let n = requests.len();
        if n == 0 {
            return PathSearchError::Success;
        }

        let mut planners: Vec<PathPlanner> = requests
            .iter()
            .map(|r| PathPlanner::new(PathSearch::new(r.search_config.clone())))
            .collect();

        for (i, (planner, req)) in planners.iter_mut().zip(requests.iter()).enumerate() {
            if let Err(e) = planner.path_search_mut().set_destinations(req.dst.clone(), req.duration) {
                self.results[i].search_error = e;
                return e;
            }
        }

        let n_threads = config.n_threads.min(n);
        if n_threads >= 2 {
            self.plan_parallel(config, requests, planners, n_threads)
        } else {
            self.plan_sequential(config, requests, &mut planners)
        }
    }

    fn plan_sequential(
        &mut self,
        config: &MultiPlannerConfig,
        requests: &[Request],
        planners: &mut [PathPlanner],
    ) -> PathSearchError {
        let n = requests.len();
        let mut path_id_counter = 0u64;

        for _round in 0..config.rounds {
            for i in 0..n {
                self.results[i] = PlanResult::default();
                let err = planners[i].replan(&requests[i].plan_args);
                self.results[i].search_error = err;
                if err.is_fatal() {
                    tracing::warn!(agent = %requests[i].search_config.agent_id, ?err, "fatal search error, aborting plan");
                    return err;
                }

                path_id_counter += 1;
                if let Err(e) =
                    self.path_sync.update_path(&requests[i].search_config.agent_id, planners[i].path().clone(), path_id_counter)
                {
                    self.results[i].sync_error = e;
                    tracing::warn!(agent = %requests[i].search_config.agent_id, ?e, "fatal sync error, aborting plan");
                    return PathSearchError::InvalidConfig("path sync update failed");
                }

                if evaluate_satisfaction(
                    requests,
                    planners,
                    &mut self.results,
                    &self.path_sync,
                    config.allow_indefinite_block,
                    false,
                ) {
                    tracing::debug!(round = _round, "all agents satisfactory, terminating gracefully");
                    return PathSearchError::Success;
                }
            }
        }
        tracing::debug!(rounds = config.rounds, "round budget exhausted without graceful termination");
        PathSearchError::IterationsReached
    }

    fn plan_parallel(
        &mut self,
        config: &MultiPlannerConfig,
        requests: &[Request],
        planners: Vec<PathPlanner>,
        n_threads: usize,
    ) -> PathSearchError {
        let n = requests.len();
        let planner_slots: Vec<RwLock<PathPlanner>> = planners.into_iter().map(RwLock::new).collect();
        let path_sync_lock = RwLock::new(std::mem::take(&mut self.path_sync));
        let results_lock = RwLock::new(std::mem::take(&mut self.results));
        let countdown = AtomicI64::new((config.rounds * n) as i64);
        let graceful = AtomicBool::new(false);

        std::thread::scope(|scope| {
            for t in 0..n_threads {
                let planner_slots = &planner_slots;
                let path_sync_lock = &path_sync_lock;
                let results_lock = &results_lock;
                let countdown = &countdown;
                let graceful = &graceful;
                scope.spawn(move || {
                    worker_loop(
                        t,
                        n_threads,
                        n,
                        requests,
                        planner_slots,
                        path_sync_lock,
                        results_lock,
                        countdown,
                        graceful,
                        config.allow_indefinite_block,
                    );
                });
            }
        });

        self.path_sync = path_sync_lock.into_inner().expect("path sync lock poisoned");
        self.results = results_lock.into_inner().expect("results lock poisoned");

        let final_countdown = countdown.load(Ordering::SeqCst);
        if final_countdown < 0 {
            PathSearchError::from_code((-final_countdown) as i32)
        } else if graceful.load(Ordering::SeqCst) {
            PathSearchError::Success
        } else {
            PathSearchError::IterationsReached
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    thread_index: usize,
    n_threads: usize,
    n: usize,
    requests: &[Request],
    planners: &[RwLock<PathPlanner>],
    path_sync_lock: &RwLock<PathSync>,
    results_lock: &RwLock<Vec<PlanResult>>,
    countdown: &AtomicI64,
    graceful: &AtomicBool,
    allow_indefinite_block: bool,
) {
    let mut idx = thread_index;
    let mut local_path_id: u64 = 0;

    loop {
        // Shared (read) section: replanning only requires read access to
        // the global PathSync snapshot, but we serialize against a
        // concurrent exclusive update to keep the snapshot coherent.
        let search_error = {
            let _read_guard = path_sync_lock.read().expect("path sync lock poisoned");
            if countdown.load(Ordering::SeqCst) <= 0 {
                return;
            }
            let mut planner = planners[idx].write().expect("planner lock poisoned");
            planner.replan(&requests[idx].plan_args)
        };

        // Exclusive section: all PathSync mutation and satisfaction checks
        // happen here, serialized against every other worker.
        {
            let mut path_sync = path_sync_lock.write().expect("path sync lock poisoned");
            if countdown.load(Ordering::SeqCst) <= 0 {
                return;
            }
            countdown.fetch_sub(1, Ordering::SeqCst);
            results_lock.write().expect("results lock poisoned")[idx] =
                PlanResult { search_error, sync_error: PathSyncError::Success };

            if search_error.is_fatal() {
                tracing::warn!(agent = %requests[idx].search_config.agent_id, ?search_error, "fatal search error in worker");
                countdown.store(-(search_error.code() as i64), Ordering::SeqCst);
                return;
            }

            local_path_id += 1;
            let agent_id = &requests[idx].search_config.agent_id;
            let path = planners[idx].read().expect("planner lock poisoned").path().clone();
            if let Err(e) = path_sync.update_path(agent_id, path, local_path_id) {
                results_lock.write().expect("results lock poisoned")[idx].sync_error = e;
                tracing::warn!(agent = %agent_id, ?e, "fatal sync error in worker");
                countdown.store(-(PathSearchError::InvalidConfig("path sync update failed").code() as i64), Ordering::SeqCst);
                return;
            }

            let mut all_ok = true;
            for k in 0..n {
                let mut planner_k = planners[k].write().expect("planner lock poisoned");
                let result_k = results_lock.read().expect("results lock poisoned")[k];
                if stale_fallback_trigger(&planner_k, &result_k, &requests[k], true) {
                    planner_k.path_search_mut().reset_cost_estimates();
                    all_ok = false;
                    break;
                }
                drop(planner_k);

                let status = path_sync.check_wait_status(&requests[k].search_config.agent_id);
                results_lock.write().expect("results lock poisoned")[k].sync_error = status.error;
                let ok = status.error == PathSyncError::Success
                    || (status.error == PathSyncError::RemainingDurationInfinite && allow_indefinite_block);
                if !ok {
                    all_ok = false;
                    break;
                }
            }

            if all_ok {
                graceful.store(true, Ordering::SeqCst);
                countdown.store(0, Ordering::SeqCst);
                return;
            }
        }

        idx += n_threads;
        if idx >= n {
            idx %= n_threads;
        }
    }
}

/// The stale-fallback clause from spec §4.4: a planner holding a diverted
/// fallback path is "stale" when it is itself the second-highest-priority
/// bidder (second-lowest price) at some intermediate parkable node. The
/// `parallel_gate` flag adds the parallel-only precondition that the clause
/// is skipped entirely for an agent that wants nothing (`dst` empty) or
/// whose current path front already matches its first requested
/// destination — such an agent can't be "stale" in the sense this clause
/// guards against.
fn stale_fallback_trigger(
    planner: &PathPlanner,
    result: &PlanResult,
    request: &Request,
    parallel_gate: bool,
) -> bool {
    if parallel_gate {
        let skip = request.dst.is_empty()
            || planner.path().first().map(|v| v.node.id) == request.dst.first().map(|d| d.id);
        if skip {
            return false;
        }
    }
    if result.search_error != PathSearchError::FallbackDiverted {
        return false;
    }
    let path = planner.path();
    if path.len() < 2 {
        return false;
    }
    path[..path.len() - 1].iter().any(|v| {
        v.node.state < NodeState::NoParking
            && v.node
                .auction
                .read()
                .expect("auction lock poisoned")
                .second_lowest()
                .map(|(_, bid)| bid.bidder == planner.id())
                .unwrap_or(false)
    })
}

/// Sequential satisfaction predicate: true iff every planner is either
/// satisfactory or has just had its stale fallback reset (in which case the
/// whole predicate is false for this round, same as the original
/// `std::all_of` short-circuit).
fn evaluate_satisfaction(
    requests: &[Request],
    planners: &mut [PathPlanner],
    results: &mut [PlanResult],
    path_sync: &PathSync,
    allow_indefinite_block: bool,
    parallel_gate: bool,
) -> bool {
    for k in 0..planners.len() {
        if stale_fallback_trigger(&planners[k], &results[k], &requests[k], parallel_gate) {
            planners[k].path_search_mut().reset_cost_estimates();
            return false;
        }
        let status = path_sync.check_wait_status(&requests[k].search_config.agent_id);
        results[k].sync_error = status.error;
        let ok = status.error == PathSyncError::Success
            || (status.error == PathSyncError::RemainingDurationInfinite && allow_indefinite_block);
        if !ok {
            return false;
        }
    }
    true
}

