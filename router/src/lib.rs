//! Warehouse map generation and the two-phase bin/robot routing solve.
//!
//! [`map_gen`] builds a seeded 3D grid graph with elevator columns and
//! samples bin/bot placements onto it. [`bin_router`] drives `path-auction`
//! twice per call to [`bin_router::BinRouter::solve`] — once to route bins
//! to their requested cells, once (chunked, `|bots|` at a time) to route
//! robots to pick them up — and writes the resulting CSV of entities and
//! paths via [`csv_writer`].

pub mod bin_router;
pub mod csv_writer;
pub mod map_gen;

pub use bin_router::{BinRequest, BinRouter, BinRouterConfig, BinRouterError};
pub use map_gen::MapGen;
