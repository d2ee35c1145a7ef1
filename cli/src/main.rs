//! `warehouse-cli`: generate a seeded warehouse map, then solve a batch of
//! bin-relocation requests against it, offline, writing a CSV route log.
//!
//! Mirrors `backend/src/main.rs`'s shape (tracing_subscriber + dotenvy +
//! anyhow-returning `main`) without the web server: this is a one-shot
//! batch tool, not a long-running service.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warehouse_cli::config::Config;
use warehouse_cli::error::CliError;
use warehouse_cli::map_doc::{self, MapDocument, RequestDocument};
use warehouse_router::bin_router::{BinRequest, BinRouter, BinRouterConfig};
use warehouse_router::map_gen;

#[derive(Parser)]
#[command(name = "warehouse-cli", about = "Offline warehouse bin-routing solver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a seeded warehouse grid and write it as a map document.
    GenerateMap {
        #[arg(long)]
        rows: usize,
        #[arg(long)]
        cols: usize,
        #[arg(long, default_value_t = 1)]
        floors: usize,
        /// `col,row` pairs carrying an elevator column; may repeat.
        #[arg(long = "elevator", value_parser = parse_col_row)]
        elevators: Vec<(usize, usize)>,
        #[arg(long = "bins")]
        n_bins: usize,
        #[arg(long = "bots")]
        n_bots: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Solve a batch of bin-relocation requests against a generated map.
    Solve {
        #[arg(long)]
        map: PathBuf,
        #[arg(long)]
        requests: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        elevator_duration: Option<f32>,
        #[arg(long)]
        fallback_cost: Option<f32>,
        #[arg(long)]
        blocking_fallback_cost: Option<f32>,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        rounds: Option<usize>,
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn parse_col_row(s: &str) -> Result<(usize, usize), String> {
    let (col, row) = s.split_once(',').ok_or_else(|| format!("expected COL,ROW, got {s}"))?;
    Ok((
        col.parse().map_err(|e| format!("invalid column in {s}: {e}"))?,
        row.parse().map_err(|e| format!("invalid row in {s}: {e}"))?,
    ))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warehouse_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::info!(?config, "loaded configuration");

    let cli = Cli::parse();
    match cli.command {
        Command::GenerateMap { rows, cols, floors, elevators, n_bins, n_bots, seed, output } => {
            run_generate_map(rows, cols, floors, elevators, n_bins, n_bots, seed, &output)
        }
        Command::Solve { map, requests, out, elevator_duration, fallback_cost, blocking_fallback_cost, iterations, rounds, threads } => {
            run_solve(&config, &map, &requests, &out, elevator_duration, fallback_cost, blocking_fallback_cost, iterations, rounds, threads)
        }
    }
}

fn run_generate_map(
    rows: usize,
    cols: usize,
    floors: usize,
    elevators: Vec<(usize, usize)>,
    n_bins: usize,
    n_bots: usize,
    seed: u64,
    output: &std::path::Path,
) -> anyhow::Result<()> {
    let gen_config = map_gen::Config { rows, cols, floors, n_bins, n_bots, elevators, seed };
    tracing::info!(rows, cols, floors, n_bins, n_bots, seed, "generating map");
    let map = map_gen::MapGen::new(&gen_config);

    let doc = map_doc::to_document(&map);
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(output, json).map_err(|source| CliError::WriteFile { path: output.display().to_string(), source })?;
    tracing::info!(path = %output.display(), nodes = map.graph.get_nodes().len(), "map written");
    Ok(())
}

fn load_map(path: &std::path::Path) -> Result<MapDocument, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseJson { path: path.display().to_string(), source })
}

fn load_requests(path: &std::path::Path) -> Result<Vec<RequestDocument>, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseJson { path: path.display().to_string(), source })
}

#[allow(clippy::too_many_arguments)]
fn run_solve(
    config: &Config,
    map_path: &std::path::Path,
    requests_path: &std::path::Path,
    out_path: &std::path::Path,
    elevator_duration: Option<f32>,
    fallback_cost: Option<f32>,
    blocking_fallback_cost: Option<f32>,
    iterations: Option<usize>,
    rounds: Option<usize>,
    threads: Option<usize>,
) -> anyhow::Result<()> {
    let doc = load_map(map_path)?;
    let map = map_doc::from_document(&doc).map_err(CliError::InvalidMap)?;
    tracing::info!(path = %map_path.display(), nodes = map.graph.get_nodes().len(), "map loaded");

    let request_docs = load_requests(requests_path)?;
    let requests: Vec<BinRequest> = request_docs.into_iter().map(BinRequest::from).collect();

    let router_config = BinRouterConfig {
        elevator_duration: elevator_duration.unwrap_or(config.elevator_duration),
        fallback_cost: fallback_cost.unwrap_or(config.fallback_cost),
        blocking_fallback_cost: blocking_fallback_cost.unwrap_or(config.blocking_fallback_cost),
        iterations: iterations.unwrap_or(config.iterations),
        price_increment: config.price_increment,
        planner_config: path_auction::MultiPlannerConfig {
            rounds: rounds.unwrap_or(config.rounds),
            n_threads: threads.unwrap_or(config.threads),
            allow_indefinite_block: true,
        },
        map_gen_config: map_gen::Config { rows: 0, cols: 0, floors: 0, n_bins: 0, n_bots: 0, elevators: vec![], seed: 0 },
    };

    let mut router = BinRouter::from_map(router_config, map);

    tracing::info!(n_requests = requests.len(), out = %out_path.display(), "solving");
    router.solve(&requests, out_path).map_err(CliError::from)?;
    tracing::info!("solve finished successfully");
    Ok(())
}
