//! Two-phase bin/robot routing solve (spec §4.6).
//!
//! `BinRouter::solve` first routes every bin to its requested cell (or
//! leaves it in place for a self-request), then walks the resulting
//! traversal order `|bots|` bins at a time, routing robots to pick each
//! chunk up on a clean scratch copy of the graph and reconciling bin/bot
//! positions between chunks.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use auction_graph::{NodePtr, NodeState, Point};
use path_auction::{
    Config as SearchConfig, MultiPathPlanner, MultiPlannerConfig, PathSearchError, PathSyncError,
    PlanArgs, Request, TraversalOrderResolver, TravelTimeFn,
};
use thiserror::Error;

use crate::csv_writer::{CsvWriterError, RouteWriter};
use crate::map_gen::{self, MapGen};

#[derive(Debug, Error)]
pub enum BinRouterError {
    /// Covers both the initial `FILE_OPEN_FAIL` from spec §6 and any I/O
    /// failure mid-write; the original treats the output file as a single
    /// point of failure rather than distinguishing open from write errors.
    #[error("route output file error")]
    FileOpenFail(#[from] CsvWriterError),
    #[error("request bin_id {bin_id} is out of range (have {n_bins} bins)")]
    RequestBinIdOutOfRange { bin_id: usize, n_bins: usize },
    #[error("no node at the requested bin position")]
    RequestBinNodeNotFound,
    #[error("requested bin node is not parkable")]
    RequestBinNodeNotParkable,
    #[error("bin-phase planning failed to produce usable paths for every bin")]
    GenerateBinPathsFail,
    #[error("robot-phase planning failed to produce usable paths for every robot")]
    GenerateRobotPathsFail,
}

/// One requested bin relocation (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct BinRequest {
    pub bin_id: usize,
    pub col: usize,
    pub row: usize,
    pub floor: usize,
}

#[derive(Clone)]
pub struct BinRouterConfig {
    pub elevator_duration: f32,
    pub fallback_cost: f32,
    pub blocking_fallback_cost: f32,
    pub iterations: usize,
    pub price_increment: f32,
    pub planner_config: MultiPlannerConfig,
    pub map_gen_config: map_gen::Config,
}

/// Offline two-phase solver: bin paths, then chunked robot paths.
pub struct BinRouter {
    config: BinRouterConfig,
    map: MapGen,
}

impl BinRouter {
    pub fn new(config: BinRouterConfig) -> Self {
        let map = MapGen::new(&config.map_gen_config);
        Self { config, map }
    }

    /// Build a router over an already-constructed map (e.g. one loaded
    /// from a saved map document) instead of generating one from
    /// `config.map_gen_config`.
    pub fn from_map(config: BinRouterConfig, map: MapGen) -> Self {
        Self { config, map }
    }

    pub fn map(&self) -> &MapGen {
        &self.map
    }

    /// Travel-time closure from spec §4.6.1: base cost is one adjacency
    /// hop (or Manhattan distance when there's no `prev` to anchor a real
    /// hop), plus `elevator_duration` whenever the hop crosses floors
    /// outside a contiguous elevator pair.
    fn custom_travel_time(elevator_duration: f32) -> TravelTimeFn {
        Arc::new(move |prev: Option<&NodePtr>, cur: &NodePtr, next: &NodePtr| {
            let base = if prev.is_some() { 1.0 } else { cur.position.manhattan_2d(&next.position) };
            let crosses_floor_outside_elevator =
                cur.elevator || !(next.elevator || cur.position.z == next.position.z);
            if crosses_floor_outside_elevator {
                base + elevator_duration
            } else {
                base
            }
        })
    }

    pub fn solve(&mut self, requests: &[BinRequest], save_file: &FsPath) -> Result<(), BinRouterError> {
        let n_bins = self.map.bins.len();
        let mut dst_vec: Vec<NodePtr> = self.map.bins.clone();

        for req in requests {
            if req.bin_id >= n_bins {
                return Err(BinRouterError::RequestBinIdOutOfRange { bin_id: req.bin_id, n_bins });
            }
            let point = Point::new(req.col as f32, req.row as f32, req.floor as f32);
            let node = self.map.graph.find_node(point).ok_or(BinRouterError::RequestBinNodeNotFound)?;
            if node.state >= NodeState::NoParking {
                return Err(BinRouterError::RequestBinNodeNotParkable);
            }
            dst_vec[req.bin_id] = node;
        }

        let mut writer = RouteWriter::create(save_file)?;

        let bin_mpp = self.generate_bin_paths(&dst_vec)?;

        writer.write_entities(0, &self.map.elevators, &self.map.bins, &self.map.bots)?;
        for i in 0..n_bins {
            if let Some(path) = bin_mpp.path_sync().path_for(&i.to_string()) {
                if path.len() > 1 {
                    writer.write_path(0, i as u64, path, false)?;
                }
            }
        }

        let order = TraversalOrderResolver::resolve(bin_mpp.path_sync(), n_bins);

        let mut stage = 0usize;
        let mut cur = 0usize;
        while cur < order.len() {
            writer.write_entities(stage, &self.map.elevators, &self.map.bins, &self.map.bots)?;

            let chunk_end = (cur + self.map.bots.len().max(1)).min(order.len());
            let chunk = &order[cur..chunk_end];
            self.generate_robot_paths(&bin_mpp, chunk, &mut writer, stage)?;
            cur = chunk_end;

            stage += 1;
        }

        writer.flush()?;
        Ok(())
    }

    /// Bin phase: one `Request` per bin, planned in a single
    /// `MultiPathPlanner::plan` call against the real graph.
    fn generate_bin_paths(&self, dst_vec: &[NodePtr]) -> Result<MultiPathPlanner, BinRouterError> {
        let travel_time = Self::custom_travel_time(self.config.elevator_duration);

        let requests: Vec<Request> = self
            .map
            .bins
            .iter()
            .zip(dst_vec.iter())
            .enumerate()
            .map(|(i, (src, dst))| {
                let self_request = dst.id == src.id;
                let fallback_cost =
                    if self_request { self.config.blocking_fallback_cost } else { self.config.fallback_cost };
                Request {
                    dst: vec![dst.clone()],
                    duration: f32::MAX,
                    search_config: SearchConfig::new(i.to_string(), self.config.price_increment, travel_time.clone()),
                    plan_args: PlanArgs {
                        src: vec![src.clone()],
                        iterations: self.config.iterations,
                        fallback_cost,
                    },
                }
            })
            .collect();

        let mut mpp = MultiPathPlanner::new();
        mpp.plan(&self.config.planner_config, &requests);

        for (i, result) in mpp.results().iter().enumerate() {
            let self_request = dst_vec[i].id == self.map.bins[i].id;
            let path_len = mpp.path_sync().path_for(&i.to_string()).map(|p| p.len()).unwrap_or(0);
            if self_request && path_len < 2 {
                continue;
            }
            if result.search_error > PathSearchError::FallbackDiverted || result.sync_error != PathSyncError::Success {
                tracing::warn!(bin = i, search_error = ?result.search_error, sync_error = ?result.sync_error, "bin-phase planning failed");
                return Err(BinRouterError::GenerateBinPathsFail);
            }
        }

        tracing::info!(n_bins = requests.len(), "bin-phase paths generated");
        Ok(mpp)
    }

    /// One robot-phase chunk: up to `|bots|` bins from `chunk`, planned
    /// fresh against a clean scratch copy of the graph topology so the
    /// auction books of earlier chunks don't bleed into this one.
    fn generate_robot_paths(
        &mut self,
        bin_mpp: &MultiPathPlanner,
        chunk: &[usize],
        writer: &mut RouteWriter,
        stage: usize,
    ) -> Result<(), BinRouterError> {
        let scratch_graph = self.map.graph.clone_topology();

        let mut dst_map: HashMap<u64, (usize, NodePtr)> = HashMap::new();
        let mut pickup_candidates: Vec<NodePtr> = Vec::with_capacity(chunk.len());

        for &bin_id in chunk {
            let bin_path = bin_mpp
                .path_sync()
                .path_for(&bin_id.to_string())
                .ok_or(BinRouterError::GenerateRobotPathsFail)?;
            let start = bin_path.first().ok_or(BinRouterError::GenerateRobotPathsFail)?;
            let candidate = scratch_graph
                .find_node(start.node.position)
                .ok_or(BinRouterError::GenerateRobotPathsFail)?;
            let real_dst = bin_path.last().expect("non-empty path").node.clone();
            dst_map.insert(candidate.id, (bin_id, real_dst));
            pickup_candidates.push(candidate);
        }

        let travel_time = Self::custom_travel_time(self.config.elevator_duration);
        let n_bots = self.map.bots.len();
        let fewer_targets_than_bots = pickup_candidates.len() < n_bots;

        let requests: Vec<Request> = self
            .map
            .bots
            .iter()
            .enumerate()
            .map(|(r, bot)| {
                let src = scratch_graph
                    .find_node(bot.position)
                    .expect("scratch graph shares topology with the real graph");
                let (fallback_cost, price_increment) = if fewer_targets_than_bots {
                    (self.config.fallback_cost / 5.0, self.config.price_increment * 10.0)
                } else {
                    (self.config.fallback_cost, self.config.price_increment)
                };
                Request {
                    dst: pickup_candidates.clone(),
                    duration: f32::MAX,
                    search_config: SearchConfig::new(r.to_string(), price_increment, travel_time.clone()),
                    plan_args: PlanArgs { src: vec![src], iterations: self.config.iterations, fallback_cost },
                }
            })
            .collect();

        let mut mpp = MultiPathPlanner::new();
        mpp.plan(&self.config.planner_config, &requests);

        for (r, result) in mpp.results().iter().enumerate() {
            if result.search_error > PathSearchError::FallbackDiverted || result.sync_error != PathSyncError::Success {
                tracing::warn!(robot = r, search_error = ?result.search_error, sync_error = ?result.sync_error, "robot-phase planning failed");
                return Err(BinRouterError::GenerateRobotPathsFail);
            }
        }

        for &bin_id in chunk {
            if let Some(path) = bin_mpp.path_sync().path_for(&bin_id.to_string()) {
                if path.len() > 1 {
                    writer.write_path(stage, (n_bots + bin_id) as u64, path, false)?;
                }
            }
        }

        for r in 0..n_bots {
            let result = mpp.results()[r];
            let path = mpp.path_sync().path_for(&r.to_string()).cloned().unwrap_or_default();
            if path.len() > 1 {
                writer.write_path(stage, r as u64, &path, true)?;
            }

            match result.search_error {
                PathSearchError::Success => {
                    let end = path.last().expect("successful path is non-empty").node.clone();
                    if let Some((bin_id, real_dst)) = dst_map.get(&end.id) {
                        self.map.bots[r] = real_dst.clone();
                        self.map.bins[*bin_id] = real_dst.clone();
                    }
                }
                PathSearchError::FallbackDiverted => {
                    if let Some(end) = path.last() {
                        if let Some(real_node) = self.map.graph.find_node(end.node.position) {
                            self.map.bots[r] = real_node;
                        }
                    }
                }
                _ => {}
            }
        }

        tracing::info!(chunk_size = chunk.len(), stage, "robot-phase chunk resolved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(rows: usize, cols: usize, floors: usize, n_bins: usize, n_bots: usize) -> BinRouterConfig {
        BinRouterConfig {
            elevator_duration: 5.0,
            fallback_cost: 50.0,
            blocking_fallback_cost: 0.0,
            iterations: 500,
            price_increment: 1.0,
            planner_config: MultiPlannerConfig { rounds: 20, n_threads: 1, allow_indefinite_block: true },
            map_gen_config: map_gen::Config {
                rows,
                cols,
                floors,
                n_bins,
                n_bots,
                elevators: vec![],
                seed: 7,
            },
        }
    }

    #[test]
    fn out_of_range_bin_id_is_rejected() {
        let config = base_config(2, 2, 1, 1, 1);
        let mut router = BinRouter::new(config);
        let dir = tempfile::tempdir().unwrap();
        let err = router
            .solve(&[BinRequest { bin_id: 99, col: 0, row: 0, floor: 0 }], &dir.path().join("routes.csv"))
            .unwrap_err();
        assert!(matches!(err, BinRouterError::RequestBinIdOutOfRange { bin_id: 99, .. }));
    }

    #[test]
    fn unparkable_target_is_rejected() {
        let mut config = base_config(2, 2, 1, 1, 1);
        config.map_gen_config.elevators = vec![(0, 0)];
        let mut router = BinRouter::new(config);
        let dir = tempfile::tempdir().unwrap();
        let err = router
            .solve(&[BinRequest { bin_id: 0, col: 0, row: 0, floor: 0 }], &dir.path().join("routes.csv"))
            .unwrap_err();
        assert!(matches!(err, BinRouterError::RequestBinNodeNotParkable));
    }

    #[test]
    fn trivial_self_request_leaves_bin_in_place() {
        let config = base_config(2, 2, 1, 1, 1);
        let mut router = BinRouter::new(config);
        let bin_pos = router.map().bins[0].position;
        let dir = tempfile::tempdir().unwrap();
        let point = bin_pos;
        router
            .solve(
                &[BinRequest { bin_id: 0, col: point.x as usize, row: point.y as usize, floor: point.z as usize }],
                &dir.path().join("routes.csv"),
            )
            .unwrap();
        assert_eq!(router.map().bins[0].position, bin_pos);
    }

    #[test]
    fn single_move_delivers_bin_to_requested_cell() {
        let config = base_config(4, 4, 1, 1, 1);
        let mut router = BinRouter::new(config);
        let dir = tempfile::tempdir().unwrap();
        router
            .solve(&[BinRequest { bin_id: 0, col: 3, row: 3, floor: 0 }], &dir.path().join("routes.csv"))
            .unwrap();
        assert_eq!(router.map().bins[0].position, Point::new(3.0, 3.0, 0.0));
    }
}
