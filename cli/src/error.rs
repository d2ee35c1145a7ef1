use thiserror::Error;

/// User-facing error for the `warehouse-cli` binary. Library crates
/// (`auction-graph`, `path-auction`, `warehouse-router`) carry their own
/// `thiserror` taxonomies; this wraps them for the one place that prints to
/// a terminal instead of propagating further.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    ReadFile { path: String, #[source] source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    WriteFile { path: String, #[source] source: std::io::Error },

    #[error("failed to parse {path} as JSON: {source}")]
    ParseJson { path: String, #[source] source: serde_json::Error },

    #[error("invalid map document: {0}")]
    InvalidMap(String),

    #[error(transparent)]
    BinRouter(#[from] warehouse_router::BinRouterError),
}
