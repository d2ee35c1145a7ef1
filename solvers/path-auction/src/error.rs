use thiserror::Error;

/// Outcome of a [`crate::search::PathSearch::iterate`] (or anything that
/// wraps it). The discriminants encode a total order that the rest of the
/// crate branches on directly (`err > FALLBACK_DIVERTED`, `err >
/// ITERATIONS_REACHED`) — anything above [`PathSearchError::IterationsReached`]
/// is fatal for the owning agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum PathSearchError {
    #[error("search succeeded")]
    Success,
    #[error("no winning path found; diverted to a fallback")]
    FallbackDiverted,
    #[error("iteration budget exhausted with no usable path")]
    IterationsReached,
    #[error("destination set is empty")]
    NoDestinations,
    #[error("source node is unreachable from the graph")]
    SourceUnreachable,
    #[error("path search misconfigured: {0}")]
    InvalidConfig(&'static str),
}

impl PathSearchError {
    /// Integer code matching the documented total order, used to carry a
    /// fatal error through `MultiPathPlanner`'s `countdown` field.
    pub fn code(self) -> i32 {
        match self {
            PathSearchError::Success => 0,
            PathSearchError::FallbackDiverted => 1,
            PathSearchError::IterationsReached => 2,
            PathSearchError::NoDestinations => 3,
            PathSearchError::SourceUnreachable => 4,
            PathSearchError::InvalidConfig(_) => 5,
        }
    }

    /// Reconstruct an error from a carried integer code. Used only to
    /// decode `-countdown` back into a `PathSearchError` for the caller of
    /// `MultiPathPlanner::plan`; unrecognized fatal codes collapse to
    /// `InvalidConfig` rather than panicking, since the exact fatal variant
    /// was already logged at the point it occurred.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PathSearchError::Success,
            1 => PathSearchError::FallbackDiverted,
            2 => PathSearchError::IterationsReached,
            3 => PathSearchError::NoDestinations,
            4 => PathSearchError::SourceUnreachable,
            _ => PathSearchError::InvalidConfig("unrecognized fatal code"),
        }
    }

    pub fn is_fatal(self) -> bool {
        self > PathSearchError::IterationsReached
    }
}

/// Outcome of a [`crate::sync::PathSync`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathSyncError {
    #[error("path is collision-free and makes progress")]
    Success,
    #[error("path is valid but blocked indefinitely by contending agents")]
    RemainingDurationInfinite,
    #[error("another agent now holds the source node")]
    SourceNodeOutbid,
    #[error("stale path_id; caller raced another update")]
    PathIdStale,
    #[error("no such agent in the path sync")]
    AgentNotFound,
}
