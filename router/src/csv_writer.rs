//! CSV route output (spec §6, §10): `stage, type, id, x, y, z, t`, CRLF
//! terminated, matching the header the original `tests/test.cpp::save_map`
//! wrote ahead of every solve.

use std::fs::File;
use std::path::Path;

use auction_graph::{NodePtr, Path as AgentPath};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvWriterError {
    #[error("failed to open route output file: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed writing route output: {0}")]
    Write(#[source] csv::Error),
}

/// Entity/path row discriminant (spec §6).
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum RowType {
    Elevator = 0,
    Bin = 1,
    Robot = 2,
    Path = 3,
}

/// Streams entity and path rows for one `BinRouter::solve` call.
pub struct RouteWriter {
    inner: csv::Writer<File>,
}

impl RouteWriter {
    /// Open `path` for writing and emit the header row.
    pub fn create(path: &Path) -> Result<Self, CsvWriterError> {
        let file = File::create(path).map_err(CsvWriterError::Open)?;
        let mut inner = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        inner
            .write_record(["stage", "type", "id", "x", "y", "z", "t"])
            .map_err(CsvWriterError::Write)?;
        Ok(Self { inner })
    }

    fn write_row(&mut self, stage: usize, row_type: RowType, id: u64, x: f32, y: f32, z: f32, t: f32) -> Result<(), CsvWriterError> {
        self.inner
            .write_record(&[
                stage.to_string(),
                (row_type as u8).to_string(),
                id.to_string(),
                x.to_string(),
                y.to_string(),
                z.to_string(),
                t.to_string(),
            ])
            .map_err(CsvWriterError::Write)
    }

    /// Entity rows for the elevators (static), and the current bin/bot
    /// positions, all with `t = 0`.
    pub fn write_entities(
        &mut self,
        stage: usize,
        elevators: &[NodePtr],
        bins: &[NodePtr],
        bots: &[NodePtr],
    ) -> Result<(), CsvWriterError> {
        for (id, node) in elevators.iter().enumerate() {
            self.write_row(stage, RowType::Elevator, id as u64, node.position.x, node.position.y, node.position.z, 0.0)?;
        }
        for (id, node) in bins.iter().enumerate() {
            self.write_row(stage, RowType::Bin, id as u64, node.position.x, node.position.y, node.position.z, 0.0)?;
        }
        for (id, node) in bots.iter().enumerate() {
            self.write_row(stage, RowType::Robot, id as u64, node.position.x, node.position.y, node.position.z, 0.0)?;
        }
        Ok(())
    }

    /// One agent's planned path as PATH rows. `under = true` marks a robot
    /// path (negative `t`); bin paths are emitted with `under = false`.
    ///
    /// `t = sign * (0.25 + rank)` where `rank` is the zero-based distance
    /// from this visit's bid to the end of the node's bid book (lower
    /// price, i.e. higher priority, gives a higher rank index). Elevator
    /// visits emit two rows — the z of the floor being left, then the z of
    /// the floor being entered — since the elevator cell is one physical
    /// node shared across floors.
    pub fn write_path(&mut self, stage: usize, id: u64, path: &AgentPath, under: bool) -> Result<(), CsvWriterError> {
        let sign = if under { -1.0 } else { 1.0 };
        for (i, visit) in path.iter().enumerate() {
            let rank = {
                let auction = visit.node.auction.read().expect("auction lock poisoned");
                let len = auction.len();
                auction
                    .bids()
                    .position(|(p, _)| p == visit.price)
                    .map(|idx| (len - 1 - idx) as f32)
                    .unwrap_or(0.0)
            };
            let t = sign * (0.25 + rank);

            if visit.node.elevator {
                let entry_z = if i > 0 { path[i - 1].node.position.z } else { visit.node.position.z };
                let exit_z = if i + 1 < path.len() { path[i + 1].node.position.z } else { visit.node.position.z };
                self.write_row(stage, RowType::Path, id, visit.node.position.x, visit.node.position.y, entry_z, t)?;
                self.write_row(stage, RowType::Path, id, visit.node.position.x, visit.node.position.y, exit_z, t)?;
            } else {
                self.write_row(stage, RowType::Path, id, visit.node.position.x, visit.node.position.y, visit.node.position.z, t)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CsvWriterError> {
        self.inner.flush().map_err(|e| CsvWriterError::Write(e.into()))
    }
}
