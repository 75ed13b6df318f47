#![forbid(unsafe_code)]

use std::fmt;

use crate::bindable::BindableId;
use crate::wave::PropagationStats;

/// Failure of a propagation wave. Only raised under
/// [`CycleGuard::SourceOnly`](crate::CycleGuard::SourceOnly).
///
/// The wave still ran to completion for every step within the limit: values
/// were written and listeners fired along the way. The error reports that the
/// link graph was deeper (or more cyclic) than the configuration allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationError {
    /// One or more steps would have exceeded `max_depth` and were skipped.
    DepthLimitExceeded {
        origin: BindableId,
        limit: usize,
        stats: PropagationStats,
    },
}

impl PropagationError {
    /// Statistics of the truncated wave.
    #[must_use]
    pub const fn stats(&self) -> &PropagationStats {
        match self {
            Self::DepthLimitExceeded { stats, .. } => stats,
        }
    }
}

impl fmt::Display for PropagationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthLimitExceeded {
                origin,
                limit,
                stats,
            } => write!(
                f,
                "propagation from {origin} exceeded depth limit {limit} ({} steps skipped)",
                stats.truncated_steps
            ),
        }
    }
}

impl std::error::Error for PropagationError {}
